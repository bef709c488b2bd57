pub mod chat;
pub mod context;
pub mod core;
pub mod llm;
pub mod server;
pub mod state;
