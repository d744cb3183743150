//! Model spec parsing and provider construction.

use sieve::config::ModelConfig;
use sieve::providers::{
    from_model_config_with, parse_model_spec, LlmProvider, ProviderSpecError,
};

fn model_config(spec: &str) -> ModelConfig {
    ModelConfig {
        spec: spec.to_owned(),
        ..ModelConfig::default()
    }
}

fn no_env(_: &str) -> Option<String> {
    None
}

#[test]
fn parse_splits_at_first_slash() {
    let parsed = parse_model_spec("ollama/llama3.1:8b").expect("valid spec");
    assert_eq!(parsed.provider, "ollama");
    assert_eq!(parsed.model, "llama3.1:8b");

    let parsed = parse_model_spec("lmstudio/bartowski/Qwen2.5-7B-Instruct-GGUF").expect("valid");
    assert_eq!(parsed.provider, "lmstudio");
    assert_eq!(parsed.model, "bartowski/Qwen2.5-7B-Instruct-GGUF");
}

#[test]
fn parse_rejects_incomplete_specs() {
    for spec in ["", "ollama", "ollama/", "/model"] {
        assert!(
            matches!(
                parse_model_spec(spec),
                Err(ProviderSpecError::InvalidModelSpec { .. })
            ),
            "spec {spec:?} should be rejected"
        );
    }
}

#[test]
fn builds_ollama_provider() {
    let provider = from_model_config_with(&model_config("ollama/llama3.1:8b"), no_env)
        .expect("ollama provider");
    assert_eq!(provider.model_id(), "ollama/llama3.1:8b");
}

#[test]
fn builds_openai_compatible_aliases() {
    for spec in ["openai/gpt-oss-20b", "lmstudio/qwen", "llamacpp/default"] {
        let provider =
            from_model_config_with(&model_config(spec), no_env).expect("compatible provider");
        assert_eq!(provider.model_id(), spec);
    }
}

#[test]
fn unknown_provider_is_rejected() {
    let result = from_model_config_with(&model_config("gpt4all/llama"), no_env);
    assert!(matches!(
        result,
        Err(ProviderSpecError::UnsupportedProvider { provider }) if provider == "gpt4all"
    ));
}

#[test]
fn api_key_env_must_resolve() {
    let config = ModelConfig {
        api_key_env: Some("SIEVE_TEST_KEY".to_owned()),
        ..model_config("openai/local")
    };

    let missing = from_model_config_with(&config, no_env);
    assert!(matches!(
        missing,
        Err(ProviderSpecError::MissingApiKey { var }) if var == "SIEVE_TEST_KEY"
    ));

    let present = from_model_config_with(&config, |key| {
        (key == "SIEVE_TEST_KEY").then(|| "secret".to_owned())
    });
    assert!(present.is_ok());
}
