use serde_json::json;
use vouch_node::{app, Config};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "5DAAnrj7VHTznn2AWBemMuyBwZWs6FNFjdyVXUeYum3PTXFy";

fn config(sentiment_url: String, data_dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.validator.validator_key = KEY.to_string();
    config.validator.network_id = 17;
    config.social.bearer_tokens = "tok-a;tok-b".to_string();
    config.sentiment.base_url = sentiment_url;
    config.sentiment.model = "gpt-4o-mini".to_string();
    config.storage.data_dir = data_dir.to_path_buf();
    config
}

#[tokio::test]
async fn test_build_validator_checks_sentiment_model() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "gpt-4o-mini" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let validator = app::build_validator(&config(format!("{}/v1", server.uri()), dir.path()))
        .await
        .unwrap();

    assert_eq!(validator.config().network_id, 17);
    assert!(dir.path().join("validator.db").exists());
}

#[tokio::test]
async fn test_unreachable_sentiment_model_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let result = app::build_validator(&config("http://127.0.0.1:1/v1".to_string(), dir.path())).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_empty_token_list_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config("http://127.0.0.1:1/v1".to_string(), dir.path());
    config.social.bearer_tokens = String::new();

    assert!(app::build_validator(&config).await.is_err());
}
