// ABOUTME: Secondary pass that asks the model to flag hallucinated test code
// ABOUTME: against the screenshot and the annotated source file.

use std::path::Path;

use crate::chat::{ChatDispatch, ChatRequest};
use crate::detail::Detail;
use crate::error::ChatError;

/// Languages the check understands; anything else is flagged without a call.
pub const CHECKED_LANGUAGES: [&str; 3] = ["python", "javascript", "typescript"];

/// Flag each code block in the image's sidecar: `true` means the block is
/// suspected to be hallucinated (or cannot be checked at all).
pub async fn detect(
    client: &dyn ChatDispatch,
    image: &Path,
    system_prompt: &str,
) -> Result<Vec<bool>, ChatError> {
    let sidecar = Detail::sidecar_path(image);
    let detail = Detail::load(&sidecar).map_err(|err| {
        ChatError::Validation(format!(
            "cannot read detail for {}: {}",
            image.display(),
            err
        ))
    })?;

    let (project, location) = match (detail.project.as_deref(), detail.location.as_deref()) {
        (Some(project), Some(location)) if !project.is_empty() && !location.is_empty() => {
            (project, location)
        }
        _ => {
            return Err(ChatError::Validation(
                "cannot read source code from detail".to_string(),
            ));
        }
    };
    let source_path = Path::new(project).join(location);

    let mut flags = Vec::with_capacity(detail.code.len());
    for block in &detail.code {
        if !CHECKED_LANGUAGES.contains(&block.language.to_ascii_lowercase().as_str()) {
            flags.push(true);
            continue;
        }

        let source = std::fs::read_to_string(&source_path).unwrap_or_default();
        if source.is_empty() {
            flags.push(true);
            continue;
        }

        let code = block.code.clone().unwrap_or_default();
        let request = ChatRequest {
            system: Some(system_prompt.to_string()),
            text: vec![format!("Test code: {}\nSource code: {}", code, source)],
            images: vec![image.to_path_buf()],
            timeout: None,
        };
        let reply = client.chat(request).await?;
        flags.push(reply.trim().eq_ignore_ascii_case("true"));
    }

    Ok(flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants;
    use crate::detail::CodeBlock;
    use crate::media::test_images::write_png;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct SequencedChat {
        calls: AtomicUsize,
        replies: Mutex<Vec<&'static str>>,
    }

    impl SequencedChat {
        fn new(replies: Vec<&'static str>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                replies: Mutex::new(replies),
            }
        }
    }

    #[async_trait]
    impl ChatDispatch for SequencedChat {
        async fn chat(&self, _request: ChatRequest) -> Result<String, ChatError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut replies = self.replies.lock().unwrap();
            Ok(replies.remove(0).to_string())
        }
    }

    fn annotated_image(
        dir: &Path,
        blocks: Vec<CodeBlock>,
        source: Option<(&str, &str)>,
    ) -> std::path::PathBuf {
        let image = write_png(dir, "page.png");
        let mut detail = Detail {
            project: Some(dir.display().to_string()),
            location: Some("src/app.js".to_string()),
            code: blocks,
            ..Default::default()
        };
        if let Some((location, contents)) = source {
            detail.location = Some(location.to_string());
            let path = dir.join(location);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, contents).unwrap();
        }
        detail.save(&Detail::sidecar_path(&image)).unwrap();
        image
    }

    #[tokio::test]
    async fn flags_follow_the_model_verdict_per_block() {
        let dir = tempfile::tempdir().unwrap();
        let image = annotated_image(
            dir.path(),
            vec![
                CodeBlock {
                    language: "python".to_string(),
                    code: Some("assert True".to_string()),
                },
                CodeBlock {
                    language: "JavaScript".to_string(),
                    code: Some("expect(1).toBe(1)".to_string()),
                },
            ],
            Some(("src/app.js", "export const a = 1;")),
        );

        let chat = SequencedChat::new(vec!["True", "False"]);
        let flags = detect(&chat, &image, constants::PROMPT_HALLUCINATION)
            .await
            .unwrap();
        assert_eq!(flags, vec![true, false]);
        assert_eq!(chat.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unchecked_languages_are_flagged_without_a_call() {
        let dir = tempfile::tempdir().unwrap();
        let image = annotated_image(
            dir.path(),
            vec![CodeBlock {
                language: "rust".to_string(),
                code: Some("assert!(true)".to_string()),
            }],
            Some(("src/app.js", "export const a = 1;")),
        );

        let chat = SequencedChat::new(vec![]);
        let flags = detect(&chat, &image, constants::PROMPT_HALLUCINATION)
            .await
            .unwrap();
        assert_eq!(flags, vec![true]);
        assert_eq!(chat.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_source_file_flags_the_block() {
        let dir = tempfile::tempdir().unwrap();
        let image = annotated_image(
            dir.path(),
            vec![CodeBlock {
                language: "python".to_string(),
                code: Some("assert True".to_string()),
            }],
            None,
        );

        let chat = SequencedChat::new(vec![]);
        let flags = detect(&chat, &image, constants::PROMPT_HALLUCINATION)
            .await
            .unwrap();
        assert_eq!(flags, vec![true]);
    }

    #[tokio::test]
    async fn missing_project_annotation_is_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_png(dir.path(), "page.png");
        Detail::default().save(&Detail::sidecar_path(&image)).unwrap();

        let chat = SequencedChat::new(vec![]);
        let result = detect(&chat, &image, constants::PROMPT_HALLUCINATION).await;
        assert!(matches!(result, Err(ChatError::Validation(_))));
    }

    #[tokio::test]
    async fn missing_sidecar_is_a_validation_error() {
        let dir = tempfile::tempdir().unwrap();
        let image = write_png(dir.path(), "page.png");

        let chat = SequencedChat::new(vec![]);
        let result = detect(&chat, &image, constants::PROMPT_HALLUCINATION).await;
        assert!(matches!(result, Err(ChatError::Validation(_))));
    }
}
