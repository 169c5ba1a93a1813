// ABOUTME: Core library for the snaptest screenshot annotation tool.
// ABOUTME: Chat client, batch engine, sidecar documents, and settings live here.

pub mod batch;
pub mod chat;
pub mod constants;
pub mod detail;
pub mod error;
pub mod extract;
pub mod hallucination;
pub mod media;
pub mod related;
pub mod settings;

pub use batch::{BatchHandle, BatchKind, BatchOptions, start_batch};
pub use chat::{ChatClient, ChatDispatch, ChatRequest};
pub use detail::{CodeBlock, Detail};
pub use error::ChatError;
pub use extract::extract_code_blocks;
pub use settings::SettingsStore;
