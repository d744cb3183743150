//! Ollama provider wire format tests.

use serde_json::json;
use sieve::providers::ollama::{build_request, parse_response, OllamaProvider, DEFAULT_OLLAMA_URL};
use sieve::providers::{CompletionRequest, LlmProvider, StopReason};

fn simple_request() -> CompletionRequest {
    CompletionRequest {
        prompt: "Hello".to_owned(),
        max_tokens: Some(512),
        temperature: None,
    }
}

#[test]
fn build_request_sends_one_user_message() {
    let req = build_request("llama3.1:8b", &simple_request());
    assert_eq!(req.model, "llama3.1:8b");
    assert!(!req.stream);
    assert_eq!(req.messages.len(), 1);
    assert_eq!(req.messages[0].role, "user");
    assert_eq!(req.messages[0].content, "Hello");
}

#[test]
fn build_request_sets_options() {
    let mut request = simple_request();
    request.temperature = Some(0.0);
    let req = build_request("model", &request);
    let opts = req.options.expect("options should exist");
    assert_eq!(opts.num_predict, Some(512));
    assert_eq!(opts.temperature, Some(0.0));
}

#[test]
fn build_request_omits_empty_options() {
    let request = CompletionRequest {
        prompt: "hi".to_owned(),
        ..CompletionRequest::default()
    };
    let req = build_request("model", &request);
    assert!(req.options.is_none());
    let body = serde_json::to_value(&req).expect("serialize");
    assert!(body.get("options").is_none());
    assert_eq!(body["stream"], false);
}

#[test]
fn parse_response_text() {
    let body = json!({
        "message": {"role": "assistant", "content": "IMPORTANT: Yes\nREASON: r\nCONFIDENCE: High"},
        "model": "llama3.1:8b",
        "done_reason": "stop",
        "prompt_eval_count": 10,
        "eval_count": 5
    });
    let resp = parse_response(&body.to_string()).expect("should parse");
    assert_eq!(resp.text, "IMPORTANT: Yes\nREASON: r\nCONFIDENCE: High");
    assert_eq!(resp.stop_reason, StopReason::EndTurn);
    assert_eq!(resp.usage.input_tokens, 10);
    assert_eq!(resp.usage.output_tokens, 5);
    assert_eq!(resp.model, "llama3.1:8b");
    assert!(!resp.truncated());
}

#[test]
fn parse_response_length_stop() {
    let body = json!({
        "message": {"role": "assistant", "content": "IMPORTANT: Ye"},
        "model": "m",
        "done_reason": "length"
    });
    let resp = parse_response(&body.to_string()).expect("should parse");
    assert_eq!(resp.stop_reason, StopReason::MaxTokens);
    assert!(resp.truncated());
}

#[test]
fn parse_response_no_usage() {
    let body = json!({
        "message": {"role": "assistant", "content": "Hi"},
        "model": "m"
    });
    let resp = parse_response(&body.to_string()).expect("should parse");
    assert_eq!(resp.usage.input_tokens, 0);
    assert_eq!(resp.usage.output_tokens, 0);
    assert_eq!(resp.stop_reason, StopReason::EndTurn);
}

#[test]
fn parse_response_invalid_json() {
    let result = parse_response("not json");
    assert!(result.is_err());
}

#[test]
fn ollama_provider_default_url() {
    assert_eq!(DEFAULT_OLLAMA_URL, "http://127.0.0.1:11434");
}

#[test]
fn ollama_provider_pub_fields() {
    let provider = OllamaProvider::new("ollama/llama3.1:8b".to_owned(), "llama3.1:8b".to_owned());
    assert_eq!(provider.model, "llama3.1:8b");
    assert_eq!(provider.base_url, DEFAULT_OLLAMA_URL);
    assert_eq!(provider.model_id(), "ollama/llama3.1:8b");
}

#[test]
fn with_base_url_trims_trailing_slash() {
    let provider = OllamaProvider::new("ollama/m".to_owned(), "m".to_owned())
        .with_base_url("http://gpu-box:11434/".to_owned());
    assert_eq!(provider.base_url, "http://gpu-box:11434");
}
