//! OpenAI-compatible provider wire format tests.

use serde_json::json;
use sieve::providers::openai::{
    build_request, parse_response, OpenAiCompatProvider, DEFAULT_OPENAI_COMPAT_URL,
};
use sieve::providers::{CompletionRequest, LlmProvider, StopReason};

#[test]
fn build_request_defaults_max_tokens() {
    let request = CompletionRequest {
        prompt: "hi".to_owned(),
        ..CompletionRequest::default()
    };
    let req = build_request("qwen2.5-7b-instruct", &request);
    assert_eq!(req.model, "qwen2.5-7b-instruct");
    assert_eq!(req.max_tokens, Some(512));
    assert_eq!(req.messages.len(), 1);
    assert_eq!(req.messages[0].role, "user");
}

#[test]
fn build_request_serializes_optional_fields_only_when_set() {
    let request = CompletionRequest {
        prompt: "hi".to_owned(),
        max_tokens: Some(64),
        temperature: Some(0.2),
    };
    let body = serde_json::to_value(build_request("m", &request)).expect("serialize");
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "hi");
    assert_eq!(body["max_tokens"], 64);
    assert!(body.get("temperature").is_some());

    let bare = CompletionRequest {
        prompt: "hi".to_owned(),
        ..CompletionRequest::default()
    };
    let body = serde_json::to_value(build_request("m", &bare)).expect("serialize");
    assert!(body.get("temperature").is_none());
}

#[test]
fn parse_response_first_choice() {
    let body = json!({
        "model": "local-model",
        "choices": [
            {"message": {"role": "assistant", "content": "IMPORTANT: No"}, "finish_reason": "stop"},
            {"message": {"role": "assistant", "content": "ignored"}, "finish_reason": "stop"}
        ],
        "usage": {"prompt_tokens": 40, "completion_tokens": 12}
    });
    let resp = parse_response(&body.to_string()).expect("should parse");
    assert_eq!(resp.text, "IMPORTANT: No");
    assert_eq!(resp.stop_reason, StopReason::EndTurn);
    assert_eq!(resp.usage.input_tokens, 40);
    assert_eq!(resp.usage.output_tokens, 12);
}

#[test]
fn parse_response_null_content_is_empty_text() {
    let body = json!({
        "choices": [{"message": {"content": null}, "finish_reason": "length"}]
    });
    let resp = parse_response(&body.to_string()).expect("should parse");
    assert_eq!(resp.text, "");
    assert_eq!(resp.stop_reason, StopReason::MaxTokens);
    assert!(resp.truncated());
    assert_eq!(resp.model, "");
}

#[test]
fn parse_response_without_choices_fails() {
    let body = json!({"model": "m", "choices": []});
    assert!(parse_response(&body.to_string()).is_err());
}

#[test]
fn base_url_drops_v1_suffix() {
    let provider = OpenAiCompatProvider::new("lmstudio/m".to_owned(), "m".to_owned(), None)
        .with_base_url("http://localhost:8080/v1/".to_owned());
    assert_eq!(provider.base_url, "http://localhost:8080");
    assert_eq!(provider.model_id(), "lmstudio/m");

    let default = OpenAiCompatProvider::new("openai/m".to_owned(), "m".to_owned(), None);
    assert_eq!(default.base_url, DEFAULT_OPENAI_COMPAT_URL);
}
