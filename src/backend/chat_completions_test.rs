// ABOUTME: Tests for the chat completions client - request shape and parsing.
// ABOUTME: No network access; exercises the pure conversion helpers.

use serde_json::json;

use super::*;
use crate::error::GenerateError;

#[test]
fn test_build_request_with_system_prompt() {
    let generator = ChatCompletionsGenerator::new("key")
        .model("test-model")
        .temperature(Some(0.2));
    let request = generator.build_request("Analyze this", Some("You are an analyst."));

    let value = serde_json::to_value(&request).unwrap();
    assert_eq!(value["model"], "test-model");
    assert_eq!(value["temperature"], 0.2);
    assert_eq!(value["messages"][0]["role"], "system");
    assert_eq!(value["messages"][0]["content"], "You are an analyst.");
    assert_eq!(value["messages"][1]["role"], "user");
    assert_eq!(value["messages"][1]["content"], "Analyze this");
}

#[test]
fn test_build_request_without_system_prompt() {
    let generator = ChatCompletionsGenerator::new("key").max_tokens(None);
    let request = generator.build_request("Hello", None);

    assert_eq!(request.messages.len(), 1);
    let value = serde_json::to_value(&request).unwrap();
    assert!(value.get("max_tokens").is_none());
    assert!(value.get("temperature").is_none());
}

#[test]
fn test_endpoint_strips_trailing_slash() {
    let generator = ChatCompletionsGenerator::new("key").base_url("http://localhost:8080/v1/");
    assert_eq!(generator.endpoint(), "http://localhost:8080/v1/chat/completions");
}

#[test]
fn test_extract_text() {
    let response: ChatResponse = serde_json::from_value(json!({
        "id": "cmpl-1",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": "  Strong momentum.  " } }
        ]
    }))
    .unwrap();

    assert_eq!(extract_text(response).unwrap(), "Strong momentum.");
}

#[test]
fn test_extract_text_empty() {
    let response: ChatResponse = serde_json::from_value(json!({
        "choices": [ { "message": { "role": "assistant", "content": null } } ]
    }))
    .unwrap();

    assert!(matches!(extract_text(response), Err(GenerateError::EmptyResponse)));

    let response: ChatResponse = serde_json::from_value(json!({})).unwrap();
    assert!(matches!(extract_text(response), Err(GenerateError::EmptyResponse)));
}
