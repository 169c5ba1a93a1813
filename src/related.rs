// ABOUTME: One chat call across related screenshots; the result is written to
// ABOUTME: every selected image's sidecar.

use std::path::PathBuf;
use thiserror::Error;

use crate::batch::BatchKind;
use crate::chat::{ChatDispatch, ChatRequest};
use crate::constants;
use crate::detail::Detail;
use crate::error::ChatError;
use crate::extract::extract_code_blocks;

pub const MIN_IMAGES: usize = 2;
pub const MAX_IMAGES: usize = 5;

#[derive(Debug, Error)]
pub enum RelatedError {
    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("failed to save detail: {0}")]
    Io(#[from] std::io::Error),
}

/// Generate one shared description (or one set of code blocks) across 2-5
/// related screenshots, then apply the result to every sidecar. `context` is
/// the reference image's metadata summary.
pub async fn generate(
    client: &dyn ChatDispatch,
    kind: BatchKind,
    system_prompt: &str,
    images: &[PathBuf],
    context: Option<&str>,
) -> Result<String, RelatedError> {
    if images.len() < MIN_IMAGES {
        return Err(ChatError::Validation("select at least two images".to_string()).into());
    }
    if images.len() > MAX_IMAGES {
        return Err(
            ChatError::Validation(format!("max {} images are allowed", MAX_IMAGES)).into(),
        );
    }

    let request = ChatRequest {
        system: Some(format!("{}{}", system_prompt, constants::PROMPT_RELATED)),
        text: context.map(str::to_string).into_iter().collect(),
        images: images.to_vec(),
        timeout: None,
    };
    let response = client.chat(request).await?;

    for image in images {
        let sidecar = Detail::sidecar_path(image);
        let mut detail = Detail::load_or_default(&sidecar);
        match kind {
            BatchKind::Content => detail.content = Some(response.clone()),
            BatchKind::Code => detail.code = extract_code_blocks(&response),
        }
        detail.save(&sidecar)?;
    }

    Ok(response)
}
