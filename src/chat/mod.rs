pub mod mapper;
pub mod prompt;
pub mod service;

pub use mapper::{to_internal, ChatMessageDto, MessageConverter};
pub use service::ChatbotService;
