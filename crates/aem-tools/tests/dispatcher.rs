//! End-to-end dispatch against a mock AEM instance.

mod common;

use aem_config::{AuthConfig, AuthMode};
use common::{TestInstance, content_json};
use serde_json::{Map, Value, json};
use wiremock::matchers::{any, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn schema_violations_make_no_calls() {
    let instance = TestInstance::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&instance.server)
        .await;

    let cases = [
        ("aem_get_page", json!({})),
        ("aem_get_page", json!({"path": 12})),
        ("aem_create_page", json!({"parentPath": "/content/site", "title": "T"})),
        ("aem_update_page_properties", json!({"path": "/content/site"})),
        (
            "aem_update_page_properties",
            json!({"path": "/content/site", "properties": ["jcr:title"]}),
        ),
        ("aem_delete_page", json!({"path": "/content/site", "force": "yes"})),
        ("aem_search", json!({"limit": "many"})),
        ("aem_list_assets", json!({"limit": 0})),
        ("aem_create_content_fragment", json!({"parentPath": "/content/dam"})),
        (
            "aem_update_content_fragment",
            json!({"path": "/content/dam/cf", "fields": {"n": 1}}),
        ),
        ("aem_replicate", json!({"path": "/content/site", "action": "archive"})),
        ("aem_list_pages", json!({"path": null})),
        ("aem_get_asset_metadata", json!({"path": ["/content/dam/a.jpg"]})),
        ("aem_get_asset_renditions", json!({})),
        ("aem_get_content_fragment", json!({"path": false})),
        ("aem_list_content_fragments", json!({"model": 3})),
        ("aem_delete_content_fragment", json!({})),
        ("aem_check_connection", json!("now")),
    ];

    for (tool, args) in cases {
        assert_rejected(&instance, tool, args).await;
    }

    // Every registered tool: non-object arguments, each required argument
    // missing, and each declared argument with the wrong type.
    let definitions = instance.registry.definitions();
    assert_eq!(definitions.len(), 16);
    for def in &definitions {
        let tool = def.name.as_str();
        assert_rejected(&instance, tool, json!("not an object")).await;

        let schema = &def.input_schema;
        if let Some(required) = schema["required"].as_array() {
            for key in required.iter().filter_map(Value::as_str) {
                let mut args = minimal_arguments(schema);
                args.remove(key);
                assert_rejected(&instance, tool, Value::Object(args)).await;
            }
        }
        if let Some(properties) = schema["properties"].as_object() {
            for (key, property) in properties {
                let mut args = minimal_arguments(schema);
                args.insert(key.clone(), wrong_type_for(property));
                assert_rejected(&instance, tool, Value::Object(args)).await;
            }
        }
    }
}

async fn assert_rejected(instance: &TestInstance, tool: &str, args: Value) {
    let shown = args.to_string();
    let result = instance.registry.dispatch(tool, args, &instance.ctx).await;
    assert!(result.is_error(), "{tool} accepted {shown}");
    assert!(
        result.to_llm_content().starts_with("Error: Invalid arguments:"),
        "{tool} {shown}: {}",
        result.to_llm_content()
    );
}

/// Placeholder values for every required argument of `schema`.
fn minimal_arguments(schema: &Value) -> Map<String, Value> {
    let mut args = Map::new();
    for key in schema["required"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
    {
        let value = match schema["properties"][key]["type"].as_str() {
            Some("object") => json!({}),
            Some("boolean") => json!(true),
            Some("integer") => json!(1),
            _ => json!("/content/x"),
        };
        args.insert(key.to_string(), value);
    }
    args
}

/// A value no property of this shape accepts.
fn wrong_type_for(property: &Value) -> Value {
    let accepts_object = match &property["type"] {
        Value::String(t) => t == "object",
        Value::Array(types) => types.iter().any(|t| t == "object"),
        _ => false,
    };
    if accepts_object {
        json!(12)
    } else {
        json!({"unexpected": true})
    }
}

#[tokio::test]
async fn update_page_properties_round_trip() {
    let instance = TestInstance::start().await;
    instance.mount_security_token("csrf-abc").await;
    Mock::given(method("POST"))
        .and(path("/content/site/en/jcr:content"))
        .and(header("CSRF-Token", "csrf-abc"))
        .and(header("Authorization", "Basic YWRtaW46YWRtaW4="))
        .and(body_string_contains("jcr%3Atitle=New+Title"))
        .and(body_string_contains("_charset_=utf-8"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Content modified</html>"))
        .expect(1)
        .mount(&instance.server)
        .await;

    let result = instance
        .registry
        .dispatch(
            "aem_update_page_properties",
            json!({"path": "/content/site/en", "properties": {"jcr:title": "New Title"}}),
            &instance.ctx,
        )
        .await;

    assert!(result.is_success(), "{}", result.to_llm_content());
    assert_eq!(
        content_json(&result),
        json!({"success": true, "path": "/content/site/en"})
    );
}

#[tokio::test]
async fn upstream_failure_becomes_error_envelope_with_status() {
    let instance = TestInstance::start().await;
    instance.mount_security_token("csrf-abc").await;
    Mock::given(method("POST"))
        .and(path("/content/site/en/jcr:content"))
        .respond_with(ResponseTemplate::new(500).set_body_string("repository exploded"))
        .mount(&instance.server)
        .await;

    let result = instance
        .registry
        .dispatch(
            "aem_update_page_properties",
            json!({"path": "/content/site/en", "properties": {"jcr:title": "New Title"}}),
            &instance.ctx,
        )
        .await;

    assert!(result.is_error());
    let text = result.to_llm_content();
    assert!(text.starts_with("Error: "), "{text}");
    assert!(text.contains("500"), "{text}");
    assert!(text.contains("repository exploded"), "{text}");
}

#[tokio::test]
async fn mutating_call_proceeds_without_security_token() {
    let instance = TestInstance::start().await;
    Mock::given(method("GET"))
        .and(path("/libs/granite/csrf/token.json"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&instance.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/bin/replicate.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&instance.server)
        .await;

    let result = instance
        .registry
        .dispatch(
            "aem_replicate",
            json!({"path": "/content/site/en", "action": "unpublish"}),
            &instance.ctx,
        )
        .await;

    assert_eq!(
        content_json(&result),
        json!({"success": true, "path": "/content/site/en", "action": "unpublish"})
    );
    let requests = instance.operation_requests().await;
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("CSRF-Token").is_none());
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("cmd=Deactivate"), "{body}");
}

#[tokio::test]
async fn read_returns_payload_pretty_printed() {
    let instance = TestInstance::start().await;
    let page = json!({"jcr:primaryType": "cq:Page", "jcr:content": {"jcr:title": "Home"}});
    Mock::given(method("GET"))
        .and(path("/content/site/en.infinity.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page.clone()))
        .expect(1)
        .mount(&instance.server)
        .await;

    let result = instance
        .registry
        .dispatch("aem_get_page", json!({"path": "/content/site/en"}), &instance.ctx)
        .await;

    assert_eq!(
        result.to_llm_content(),
        serde_json::to_string_pretty(&page).unwrap()
    );
    assert!(instance.operation_requests().await[0].headers.get("CSRF-Token").is_none());
}

#[tokio::test]
async fn list_content_fragments_emits_model_filter() {
    let instance = TestInstance::start().await;
    Mock::given(method("GET"))
        .and(path("/bin/querybuilder.json"))
        .and(query_param("type", "dam:Asset"))
        .and(query_param("property", "jcr:content/contentFragment"))
        .and(query_param("property.value", "true"))
        .and(query_param("property.1_property", "jcr:content/data/cq:model"))
        .and(query_param("property.1_value", "/conf/site/models/article"))
        .and(query_param("p.limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": [], "total": 0})))
        .expect(1)
        .mount(&instance.server)
        .await;

    let result = instance
        .registry
        .dispatch(
            "aem_list_content_fragments",
            json!({"path": "/content/dam/site", "model": "/conf/site/models/article"}),
            &instance.ctx,
        )
        .await;
    assert!(result.is_success(), "{}", result.to_llm_content());
}

#[tokio::test]
async fn asset_metadata_reads_the_asset_node() {
    let instance = TestInstance::start().await;
    Mock::given(method("GET"))
        .and(path("/content/dam/site/hero.jpg.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jcr:primaryType": "dam:Asset"})))
        .expect(1)
        .mount(&instance.server)
        .await;

    let result = instance
        .registry
        .dispatch(
            "aem_get_asset_metadata",
            json!({"path": "/content/dam/site/hero.jpg"}),
            &instance.ctx,
        )
        .await;
    assert_eq!(content_json(&result), json!({"jcr:primaryType": "dam:Asset"}));
}

#[tokio::test]
async fn search_whole_repository_without_limit() {
    let instance = TestInstance::start().await;
    Mock::given(method("GET"))
        .and(path("/bin/querybuilder.json"))
        .and(query_param("path", "/"))
        .and(query_param("p.limit", "-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": []})))
        .expect(1)
        .mount(&instance.server)
        .await;

    let result = instance
        .registry
        .dispatch(
            "aem_search",
            json!({"path": "/", "fulltext": "hero", "limit": -1}),
            &instance.ctx,
        )
        .await;
    assert!(result.is_success(), "{}", result.to_llm_content());

    let rejected = instance
        .registry
        .dispatch("aem_search", json!({"limit": 0}), &instance.ctx)
        .await;
    assert!(rejected.to_llm_content().starts_with("Error: Invalid arguments:"));
    assert_eq!(instance.operation_requests().await.len(), 1);
}

#[tokio::test]
async fn reserved_characters_in_paths_are_encoded() {
    let instance = TestInstance::start().await;
    Mock::given(method("GET"))
        .and(path("/content/dam/what%3F.jpg/jcr:content/renditions.1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&instance.server)
        .await;

    let result = instance
        .registry
        .dispatch(
            "aem_get_asset_renditions",
            json!({"path": "/content/dam/what?.jpg"}),
            &instance.ctx,
        )
        .await;
    assert!(result.is_success(), "{}", result.to_llm_content());
}

#[tokio::test]
async fn search_passes_extra_predicates() {
    let instance = TestInstance::start().await;
    Mock::given(method("GET"))
        .and(path("/bin/querybuilder.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": []})))
        .mount(&instance.server)
        .await;

    instance
        .registry
        .dispatch(
            "aem_search",
            json!({
                "fulltext": "sustainability",
                "path": "/content/mysite",
                "1_property": "jcr:content/cq:template",
                "1_property.value": "/conf/mysite/article"
            }),
            &instance.ctx,
        )
        .await;

    let requests = instance.operation_requests().await;
    let query: Vec<(String, String)> = requests[0]
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let keys: Vec<&str> = query.iter().map(|(k, _)| k.as_str()).collect();

    assert_eq!(
        keys,
        vec![
            "path",
            "fulltext",
            "p.limit",
            "p.offset",
            "1_property",
            "1_property.value"
        ]
    );
    assert!(query.contains(&("p.limit".to_string(), "20".to_string())));
    assert!(query.contains(&("p.offset".to_string(), "0".to_string())));
}

#[tokio::test]
async fn check_connection_isolates_failing_read() {
    let instance = TestInstance::start().await;
    instance.mount_security_token("csrf-abc").await;
    Mock::given(method("GET"))
        .and(path("/libs/granite/security/currentuser.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"authorizableId": "admin"})))
        .mount(&instance.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/content.1.json"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&instance.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/content/dam.1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&instance.server)
        .await;

    let result = instance
        .registry
        .dispatch("aem_check_connection", json!({}), &instance.ctx)
        .await;
    assert!(result.is_success());

    let report = content_json(&result);
    assert_eq!(report["healthy"], false);
    assert_eq!(report["authMode"], "basic");

    let checks = report["checks"].as_array().unwrap();
    assert_eq!(checks.len(), 4);
    let failed: Vec<&str> = checks
        .iter()
        .filter(|c| c["ok"] == false)
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(failed, vec!["contentRead"]);
    assert_eq!(checks[2]["status"], 403);
    assert_eq!(checks[1]["detail"]["user"], "admin");
}

#[tokio::test]
async fn concurrent_calls_share_one_token_exchange() {
    let token_server = wiremock::MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ims/token/v3"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "shared", "expires_in": 3600}))
                .set_delay(std::time::Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&token_server)
        .await;

    let instance = TestInstance::start_with_auth(AuthConfig {
        mode: Some(AuthMode::OAuth),
        client_id: Some("id".to_string()),
        client_secret: Some("secret".to_string()),
        scope: Some("openid".to_string()),
        token_endpoint: Some(format!("{}/ims/token/v3", token_server.uri())),
        ..Default::default()
    })
    .await;
    Mock::given(method("GET"))
        .and(header("Authorization", "Bearer shared"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&instance.server)
        .await;

    let (a, b) = tokio::join!(
        instance
            .registry
            .dispatch("aem_get_page", json!({"path": "/content/a"}), &instance.ctx),
        instance
            .registry
            .dispatch("aem_list_pages", json!({"path": "/content/b"}), &instance.ctx),
    );
    assert!(a.is_success(), "{}", a.to_llm_content());
    assert!(b.is_success(), "{}", b.to_llm_content());
}

#[tokio::test]
async fn missing_base_url_is_a_fatal_error_envelope() {
    let ctx = aem_tools::ToolContext::new(aem_client::AemClient::builder().build().unwrap());
    let registry = aem_tools::ToolRegistry::with_aem_tools();

    let result = registry
        .dispatch("aem_get_page", json!({"path": "/content/site"}), &ctx)
        .await;

    assert!(matches!(
        result,
        aem_tools::ToolResult::Error {
            recoverable: false,
            ..
        }
    ));
    assert!(result.to_llm_content().contains("base_url"));
}
