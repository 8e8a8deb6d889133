//! Render module - UI components for the prompt screen

mod prompt;

pub use prompt::PromptView;
