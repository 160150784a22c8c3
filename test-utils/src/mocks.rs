//! Wiremock helpers for the authentication endpoints.

use crate::fixtures;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Mount a successful key-based `GET Auth` expected `calls` times.
pub async fn mount_key_auth(server: &MockServer, calls: u64) {
    Mock::given(method("GET"))
        .and(path("/Auth"))
        .and(header(
            "Authorization",
            fixtures::ps_auth_header(fixtures::API_KEY, fixtures::RUN_AS).as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(calls)
        .mount(server)
        .await;
}

/// Mount a successful OAuth token grant followed by application sign-in.
pub async fn mount_oauth(server: &MockServer, access_token: &str, expires_in: u64, calls: u64) {
    Mock::given(method("POST"))
        .and(path("/Auth/Connect/Token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(fixtures::oauth_token(access_token, expires_in)),
        )
        .expect(calls)
        .mount(server)
        .await;

    mount_sign_app_in(server, access_token, 200, calls).await;
}

/// Mount `POST Auth/SignAppIn` for a bearer token.
pub async fn mount_sign_app_in(server: &MockServer, access_token: &str, status: u16, calls: u64) {
    let bearer = format!("Bearer {access_token}");
    Mock::given(method("POST"))
        .and(path("/Auth/SignAppIn"))
        .and(header("Authorization", bearer.as_str()))
        .respond_with(ResponseTemplate::new(status).set_body_string(r#"{"UserId": 12, "UserName": "app"}"#))
        .expect(calls)
        .mount(server)
        .await;
}
