// ABOUTME: Builds provider-specific message envelopes (text parts + base64 image parts).
// ABOUTME: A request with neither text nor images is rejected before any network traffic.

use serde_json::{Value, json};

use super::ChatRequest;
use crate::error::ChatError;
use crate::media;

pub(super) fn non_empty_texts(request: &ChatRequest) -> impl Iterator<Item = &str> {
    request
        .text
        .iter()
        .map(String::as_str)
        .filter(|text| !text.is_empty())
}

/// OpenAI-style user content: text parts followed by data-URL image parts.
pub(super) fn openai_content(request: &ChatRequest) -> Result<Vec<Value>, ChatError> {
    let mut parts: Vec<Value> = non_empty_texts(request)
        .map(|text| json!({"type": "text", "text": text}))
        .collect();
    for image in &request.images {
        let (mime, data) = media::encode_for_chat(image)?;
        parts.push(json!({
            "type": "image_url",
            "image_url": {"url": format!("data:{};base64,{}", mime, data)}
        }));
    }
    ensure_payload(parts)
}

/// Anthropic-style user content: text parts followed by base64 image sources.
pub(super) fn claude_content(request: &ChatRequest) -> Result<Vec<Value>, ChatError> {
    let mut parts: Vec<Value> = non_empty_texts(request)
        .map(|text| json!({"type": "text", "text": text}))
        .collect();
    for image in &request.images {
        let (mime, data) = media::encode_for_chat(image)?;
        parts.push(json!({
            "type": "image",
            "source": {"type": "base64", "media_type": mime, "data": data}
        }));
    }
    ensure_payload(parts)
}

/// OpenAI-style message array: an optional system message plus one user turn.
pub(super) fn openai_messages(request: &ChatRequest) -> Result<Vec<Value>, ChatError> {
    let content = openai_content(request)?;
    let mut messages = Vec::new();
    if let Some(system) = request.system.as_deref() {
        if !system.is_empty() {
            messages.push(json!({"role": "system", "content": system}));
        }
    }
    messages.push(json!({"role": "user", "content": content}));
    Ok(messages)
}

/// Anthropic-style message array: the system prompt rides at the top level of
/// the request body, so only the user turn appears here.
pub(super) fn claude_messages(request: &ChatRequest) -> Result<Vec<Value>, ChatError> {
    let content = claude_content(request)?;
    Ok(vec![json!({"role": "user", "content": content})])
}

fn ensure_payload(parts: Vec<Value>) -> Result<Vec<Value>, ChatError> {
    if parts.is_empty() {
        Err(ChatError::Validation("at least chat something".to_string()))
    } else {
        Ok(parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::test_images::write_png;

    fn request_with(text: Vec<&str>, images: Vec<std::path::PathBuf>) -> ChatRequest {
        ChatRequest {
            system: Some("You are a helpful assistant.".to_string()),
            text: text.into_iter().map(str::to_string).collect(),
            images,
            timeout: None,
        }
    }

    #[test]
    fn openai_envelope_carries_system_then_user_parts() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path(), "shot.png");
        let request = request_with(vec!["describe this"], vec![png]);

        let messages = openai_messages(&request).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["role"], "user");

        let content = messages[1]["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[1]["type"], "image_url");
        let url = content[1]["image_url"]["url"].as_str().unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn claude_envelope_uses_base64_sources_and_no_system_turn() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path(), "shot.png");
        let request = request_with(vec![], vec![png]);

        let messages = claude_messages(&request).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");

        let content = messages[0]["content"].as_array().unwrap();
        assert_eq!(content[0]["type"], "image");
        assert_eq!(content[0]["source"]["type"], "base64");
        assert_eq!(content[0]["source"]["media_type"], "image/png");
    }

    #[test]
    fn multiple_texts_each_become_a_part() {
        let request = request_with(vec!["first", "second"], vec![]);
        let content = openai_content(&request).unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0]["text"], "first");
        assert_eq!(content[1]["text"], "second");
    }

    #[test]
    fn empty_texts_are_skipped() {
        let request = request_with(vec!["", "real"], vec![]);
        let content = claude_content(&request).unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["text"], "real");
    }

    #[test]
    fn no_text_and_no_image_is_a_validation_error() {
        let request = request_with(vec![], vec![]);
        assert!(matches!(
            openai_messages(&request),
            Err(ChatError::Validation(_))
        ));
        assert!(matches!(
            claude_messages(&request),
            Err(ChatError::Validation(_))
        ));
    }

    #[test]
    fn system_message_is_omitted_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let png = write_png(dir.path(), "shot.png");
        let mut request = request_with(vec![], vec![png]);
        request.system = Some(String::new());
        let messages = openai_messages(&request).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["role"], "user");
    }
}
