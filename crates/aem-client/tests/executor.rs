//! Request executor behaviour against a mock AEM instance.

use std::time::Duration;

use aem_client::{AemClient, Error, Payload, RequestDescriptor};
use aem_config::{AuthConfig, AuthMode};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn basic_auth() -> AuthConfig {
    AuthConfig {
        mode: Some(AuthMode::Basic),
        username: Some("admin".to_string()),
        password: Some("admin".to_string()),
        ..Default::default()
    }
}

fn client_for(server: &MockServer) -> AemClient {
    AemClient::builder()
        .base_url(server.uri())
        .auth(basic_auth())
        .build()
        .unwrap()
}

async fn mount_csrf(server: &MockServer, token: &str, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/libs/granite/csrf/token.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "token": token })))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn read_sends_authorization_and_decodes_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/content/site/en.infinity.json"))
        .and(header("Authorization", "Basic YWRtaW46YWRtaW4="))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"jcr:primaryType": "cq:Page"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_csrf(&server, "unused", 0).await;

    let payload = client_for(&server)
        .execute(RequestDescriptor::get("/content/site/en.infinity.json"))
        .await
        .unwrap();

    assert_eq!(
        payload,
        Payload::Json(serde_json::json!({"jcr:primaryType": "cq:Page"}))
    );
}

#[tokio::test]
async fn query_parameters_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bin/querybuilder.json"))
        .and(query_param("path", "/content"))
        .and(query_param("p.limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"hits": []})))
        .expect(1)
        .mount(&server)
        .await;

    let request = RequestDescriptor::get("/bin/querybuilder.json")
        .query("path", "/content")
        .query("p.limit", "20");
    client_for(&server).execute(request).await.unwrap();
}

#[tokio::test]
async fn mutating_request_carries_security_token_once_fetched() {
    let server = MockServer::start().await;
    mount_csrf(&server, "tok-1", 1).await;
    Mock::given(method("POST"))
        .and(path("/bin/wcmcommand"))
        .and(header("CSRF-Token", "tok-1"))
        .and(body_string_contains("cmd=deletePage"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server);
    for _ in 0..2 {
        let request = RequestDescriptor::post("/bin/wcmcommand")
            .form_field("cmd", "deletePage")
            .form_field("path", "/content/site/old");
        let payload = client.execute(request).await.unwrap();
        assert_eq!(payload, Payload::Text("ok".to_string()));
    }
    server.verify().await;
}

#[tokio::test]
async fn security_token_failure_does_not_block_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/libs/granite/csrf/token.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/assets/content/dam/site/cf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .execute(RequestDescriptor::delete("/api/assets/content/dam/site/cf"))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let delete = requests
        .iter()
        .find(|r| r.method.as_str() == "DELETE")
        .unwrap();
    assert!(delete.headers.get("CSRF-Token").is_none());
    assert!(delete.headers.get("Authorization").is_some());
}

#[tokio::test]
async fn invalidated_security_token_is_refetched() {
    let server = MockServer::start().await;
    mount_csrf(&server, "tok", 2).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client
        .execute(RequestDescriptor::post("/content/a/jcr:content"))
        .await
        .unwrap();
    client.invalidate_security_token().await;
    client
        .execute(RequestDescriptor::post("/content/a/jcr:content"))
        .await
        .unwrap();
}

#[tokio::test]
async fn error_status_propagates_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("No resource found"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .execute(RequestDescriptor::get("/content/missing.1.json"))
        .await
        .unwrap_err();

    match &err {
        Error::UpstreamRequest {
            status,
            status_text,
            body,
        } => {
            assert_eq!(*status, 404);
            assert_eq!(status_text, "Not Found");
            assert_eq!(body, "No resource found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_upstream_request());
}

#[tokio::test]
async fn non_json_body_is_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html>ok</html>"),
        )
        .mount(&server)
        .await;

    let payload = client_for(&server)
        .execute(RequestDescriptor::get("/content/site.html"))
        .await
        .unwrap();
    assert_eq!(payload, Payload::Text("<html>ok</html>".to_string()));
}

#[tokio::test]
async fn missing_base_url_makes_no_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = AemClient::builder().auth(basic_auth()).build().unwrap();
    let err = client
        .execute(RequestDescriptor::post("/bin/wcmcommand"))
        .await
        .unwrap_err();
    assert!(err.is_config());
}

#[tokio::test]
async fn missing_credentials_is_config_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = AemClient::builder()
        .base_url(server.uri())
        .auth(AuthConfig::default())
        .build()
        .unwrap();
    let err = client
        .execute(RequestDescriptor::get("/content.1.json"))
        .await
        .unwrap_err();
    assert!(err.is_config());
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = AemClient::builder()
        .base_url(server.uri())
        .auth(basic_auth())
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();
    let err = client
        .execute(RequestDescriptor::get("/content.1.json"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout(_)), "got {err:?}");
    assert!(err.is_upstream_request());
}

#[tokio::test]
async fn oauth_mode_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ims/token/v3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "fresh",
            "expires_in": 86399
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/content.1.json"))
        .and(header("Authorization", "Bearer fresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .expect(2)
        .mount(&server)
        .await;

    let client = AemClient::builder()
        .base_url(server.uri())
        .auth(AuthConfig {
            mode: Some(AuthMode::OAuth),
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
            scope: Some("openid".to_string()),
            token_endpoint: Some(format!("{}/ims/token/v3", server.uri())),
            ..Default::default()
        })
        .build()
        .unwrap();

    for _ in 0..2 {
        client
            .execute(RequestDescriptor::get("/content.1.json"))
            .await
            .unwrap();
    }
}
