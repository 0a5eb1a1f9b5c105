use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use vouch_node::config::{ENV_SENTIMENT_API_KEY, ENV_SOCIAL_TOKENS, ENV_VALIDATOR_KEY};
use vouch_node::{Cli, Config, LogFormat, Network};
use vouch_validator::FreshnessDecay;

const KEY: &str = "5DAAnrj7VHTznn2AWBemMuyBwZWs6FNFjdyVXUeYum3PTXFy";

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn configured() -> Config {
    let vars = env(&[(ENV_VALIDATOR_KEY, KEY), (ENV_SOCIAL_TOKENS, "tok-a;tok-b")]);
    let mut config = Config::default();
    config.apply_secrets(|k| vars.get(k).cloned());
    config
}

#[test]
fn test_defaults_from_empty_toml() {
    let config = Config::from_toml("").unwrap();

    assert_eq!(config.validator.network_id, 0);
    assert_eq!(config.validator.iteration_interval_secs, 600);
    assert_eq!(config.validator.max_allowed_weights, 420);
    assert_eq!(config.ledger.url, "http://127.0.0.1:9944");
    assert_eq!(config.social.calls_per_window, 15);
    assert_eq!(config.social.window_secs, 900);
    assert_eq!(config.sentiment.model, "gpt-4o-mini");
    assert_eq!(config.storage.data_dir, PathBuf::from("data"));
    assert_eq!(config.scoring.window_days, 30);
    assert!(config.scoring.freshness.is_none());
}

#[test]
fn test_parse_sections() {
    let config = Config::from_toml(
        r#"
        [validator]
        network_id = 17
        iteration_interval_secs = 120
        max_allowed_weights = 64

        [ledger]
        url = "http://ledger.internal:8080"

        [sentiment]
        base_url = "http://localhost:11434/v1"
        model = "llama3"

        [storage]
        data_dir = "/var/lib/vouch"

        [scoring]
        window_days = 14

        [scoring.top_level]
        profile = 0.25
        content = 0.45
        originality = 0.2
        positivity = 0.1

        [scoring.freshness]
        full_credit_hours = 24
        zero_credit_days = 5
        "#,
    )
    .unwrap();

    assert_eq!(config.validator.network_id, 17);
    assert_eq!(config.validator.iteration_interval_secs, 120);
    assert_eq!(config.validator.max_allowed_weights, 64);
    // unspecified fields keep defaults
    assert_eq!(config.validator.query_timeout_secs, 60);
    assert_eq!(config.ledger.url, "http://ledger.internal:8080");
    assert_eq!(config.sentiment.model, "llama3");
    assert_eq!(config.storage.data_dir, PathBuf::from("/var/lib/vouch"));
    assert_eq!(config.scoring.window_days, 14);
    assert_eq!(config.scoring.top_level.content, 0.45);
    assert_eq!(config.scoring.profile.followers, 0.4);

    let freshness = config.scoring.freshness.unwrap();
    assert_eq!(freshness.full_credit_hours, 24);
    assert_eq!(freshness.zero_credit_days, 5);
}

#[test]
fn test_invalid_toml_is_an_error() {
    assert!(Config::from_toml("[validator\nnetwork_id = 1").is_err());
    assert!(Config::from_toml("[validator]\nnetwork_id = \"seventeen\"").is_err());
}

#[test]
fn test_load_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.validator.iteration_interval_secs, 600);
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vouch-validator.toml");
    std::fs::write(&path, "[validator]\nnetwork_id = 3\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.validator.network_id, 3);
}

#[test]
fn test_apply_secrets() {
    let vars = env(&[
        (ENV_VALIDATOR_KEY, &format!("  {}\n", KEY)),
        (ENV_SOCIAL_TOKENS, "tok-a;tok-b"),
        (ENV_SENTIMENT_API_KEY, "sk-test"),
    ]);
    let mut config = Config::default();
    config.apply_secrets(|k| vars.get(k).cloned());

    assert_eq!(config.validator.validator_key, KEY);
    assert_eq!(config.social.bearer_tokens, "tok-a;tok-b");
    assert_eq!(config.sentiment.api_key.as_deref(), Some("sk-test"));
}

#[test]
fn test_blank_api_key_is_ignored() {
    let vars = env(&[(ENV_SENTIMENT_API_KEY, "   ")]);
    let mut config = Config::default();
    config.apply_secrets(|k| vars.get(k).cloned());
    assert!(config.sentiment.api_key.is_none());
}

#[test]
fn test_secrets_are_not_serialized() {
    let mut config = configured();
    config.sentiment.api_key = Some("sk-test".into());

    let rendered = toml::to_string(&config).unwrap();
    assert!(!rendered.contains(KEY));
    assert!(!rendered.contains("tok-a"));
    assert!(!rendered.contains("sk-test"));
}

#[test]
fn test_validate_accepts_configured() {
    configured().validate().unwrap();
}

#[test]
fn test_validate_requires_validator_key() {
    let vars = env(&[(ENV_SOCIAL_TOKENS, "tok-a")]);
    let mut config = Config::default();
    config.apply_secrets(|k| vars.get(k).cloned());
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_requires_social_token() {
    let vars = env(&[(ENV_VALIDATOR_KEY, KEY), (ENV_SOCIAL_TOKENS, " ; ")]);
    let mut config = Config::default();
    config.apply_secrets(|k| vars.get(k).cloned());

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains(ENV_SOCIAL_TOKENS));
}

#[test]
fn test_validate_rejects_bad_weight_sum() {
    let mut config = configured();
    config.scoring.top_level.positivity = 0.5;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_interval() {
    let mut config = configured();
    config.validator.iteration_interval_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_zero_rate_window() {
    let mut config = configured();
    config.social.calls_per_window = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_validate_rejects_inverted_freshness() {
    let mut config = configured();
    config.scoring.freshness = Some(FreshnessDecay {
        full_credit_hours: 48,
        zero_credit_days: 2,
    });

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("zero_credit_days"));
}

#[test]
fn test_cli_defaults() {
    let cli = Cli::try_parse_from(["vouch-node", "--network", "testnet"]).unwrap();
    assert_eq!(cli.network, Network::Testnet);
    assert_eq!(cli.log_format, LogFormat::Text);
    assert_eq!(cli.env_file_path(), PathBuf::from("env/.env.validator.testnet"));
}

#[test]
fn test_cli_explicit_env_file() {
    let cli = Cli::try_parse_from([
        "vouch-node",
        "--config",
        "custom.toml",
        "--env-file",
        "/etc/vouch/secrets.env",
        "--log-format",
        "json",
    ])
    .unwrap();

    assert_eq!(cli.config, PathBuf::from("custom.toml"));
    assert_eq!(cli.env_file_path(), PathBuf::from("/etc/vouch/secrets.env"));
    assert_eq!(cli.log_format, LogFormat::Json);
}

#[test]
fn test_env_file_loads_before_logging() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("validator.env");
    std::fs::write(&path, "VOUCH_TEST_ENV_FILE_LOG=vouch_validator=debug\n").unwrap();

    let cli = Cli::try_parse_from(["vouch-node", "--env-file", path.to_str().unwrap()]).unwrap();

    assert_eq!(cli.load_env_file().unwrap(), Some(path));
    assert_eq!(
        std::env::var("VOUCH_TEST_ENV_FILE_LOG").unwrap(),
        "vouch_validator=debug"
    );
}

#[test]
fn test_missing_explicit_env_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.env");

    let cli = Cli::try_parse_from(["vouch-node", "--env-file", path.to_str().unwrap()]).unwrap();
    assert!(cli.load_env_file().is_err());
}

#[test]
fn test_missing_default_env_file_is_skipped() {
    let cli = Cli::try_parse_from(["vouch-node", "--network", "testnet"]).unwrap();
    if !cli.env_file_path().exists() {
        assert_eq!(cli.load_env_file().unwrap(), None);
    }
}
