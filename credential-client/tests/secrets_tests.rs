//! Secrets safe lookups against a mock server.

use credential_client::{ClientConfig, CredentialClient};
use secrecy::ExposeSecret;
use serde_json::json;
use test_utils::fixtures::{self, CLIENT_ID, CLIENT_SECRET};
use test_utils::mocks;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET_ID: &str = "b8d0c6f2-5a1e-4f3b-9c2d-7e6f5a4b3c2d";

async fn oauth_server() -> MockServer {
    let server = MockServer::start().await;
    mocks::mount_oauth(&server, "bearer-xyz", 3600, 1).await;
    server
}

fn client(server: &MockServer) -> CredentialClient {
    CredentialClient::new(ClientConfig::new(server.uri()).with_oauth(CLIENT_ID, CLIENT_SECRET)).unwrap()
}

#[tokio::test]
async fn test_get_secret_by_id() {
    let server = oauth_server().await;
    Mock::given(method("GET"))
        .and(path(format!("/Secrets-Safe/Secrets/{SECRET_ID}")))
        .and(header("Authorization", "Bearer bearer-xyz"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(fixtures::secret(SECRET_ID, "reporting-db", "r3p0rt!")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let secret = client(&server).get_secret_by_id(SECRET_ID).await.unwrap().unwrap();

    assert_eq!(secret.id, SECRET_ID);
    assert_eq!(secret.title, "reporting-db");
    assert_eq!(
        secret.password.as_ref().map(|p| p.expose_secret().to_string()),
        Some("r3p0rt!".to_string())
    );
    assert_eq!(secret.owner_id, 2);
    assert_eq!(secret.owners.len(), 1);
    assert_eq!(secret.urls[0].url, "https://reports.example.com");
    assert!(!format!("{secret:?}").contains("r3p0rt!"));
}

#[tokio::test]
async fn test_missing_secret_is_none() {
    let server = oauth_server().await;
    Mock::given(method("GET"))
        .and(path("/Secrets-Safe/Secrets/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&server)
        .await;

    assert!(client(&server).get_secret_by_id("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_secret_server_error_is_api_error() {
    let server = oauth_server().await;
    Mock::given(method("GET"))
        .and(path(format!("/Secrets-Safe/Secrets/{SECRET_ID}")))
        .respond_with(ResponseTemplate::new(500).set_body_string("vault sealed"))
        .mount(&server)
        .await;

    let err = client(&server).get_secret_by_id(SECRET_ID).await.unwrap_err();

    assert!(err.is_api());
    assert_eq!(err.status(), Some(500));
    assert!(err.is_retryable());
    assert!(err.to_string().contains("vault sealed"));
}

#[tokio::test]
async fn test_malformed_secret_id_rejected() {
    let server = MockServer::start().await;
    let client = client(&server);

    assert!(client.get_secret_by_id("").await.unwrap_err().is_invalid_input());
    assert!(client.get_secret_by_id("../Auth").await.unwrap_err().is_invalid_input());
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_get_secret_by_title() {
    let server = oauth_server().await;
    Mock::given(method("GET"))
        .and(path("/Secrets-Safe/Secrets"))
        .and(query_param("Title", "reporting db"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            fixtures::secret(SECRET_ID, "reporting db", "first"),
            fixtures::secret("other", "reporting db", "second")
        ])))
        .mount(&server)
        .await;

    let secret = client(&server).get_secret_by_title("reporting db").await.unwrap().unwrap();

    assert_eq!(secret.id, SECRET_ID);
}

#[tokio::test]
async fn test_secret_by_title_without_match() {
    let server = oauth_server().await;
    Mock::given(method("GET"))
        .and(path("/Secrets-Safe/Secrets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert!(client(&server).get_secret_by_title("nothing").await.unwrap().is_none());
}
