//! Context management module.
//!
//! Token counting and context window trimming.

pub mod tokenizer;
pub mod window;

pub use tokenizer::{TokenCounter, Tokenizer};
pub use window::{ContextWindowManager, ModelProfile};
