//! Chat-completion client and prompt templates.

pub mod chat;
pub mod prompt;

pub use chat::{ChatModel, ChatSettings, OpenAiChat, complete_parsed};
pub use prompt::PromptEngine;
