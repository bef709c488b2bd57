pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer the user's questions \
accurately and concisely. If you do not know the answer, say so instead of guessing.";

pub const DEFAULT_SYSTEM_PROMPT_PATH: &str = "prompts/prompt-template.txt";
pub const DEFAULT_API_VERSION: &str = "2024-02-01";
pub const DEFAULT_MODEL: &str = "gpt-35-turbo";

pub fn host() -> String {
    "127.0.0.1".to_string()
}

pub fn port() -> u16 {
    8080
}

pub fn api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

pub fn model() -> String {
    DEFAULT_MODEL.to_string()
}

pub fn max_tokens() -> usize {
    1000
}

pub fn temperature() -> f32 {
    0.7
}

pub fn max_attempts() -> u32 {
    3
}

pub fn initial_delay_ms() -> u64 {
    1000
}

pub fn multiplier() -> f64 {
    2.0
}

pub fn max_delay_ms() -> u64 {
    5000
}

pub fn system_prompt_path() -> String {
    DEFAULT_SYSTEM_PROMPT_PATH.to_string()
}

pub fn log_dir() -> String {
    "logs".to_string()
}

pub fn log_filter() -> String {
    "info".to_string()
}

pub fn local_origins() -> Vec<String> {
    vec![
        "http://localhost".to_string(),
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
        "http://127.0.0.1".to_string(),
        "http://127.0.0.1:3000".to_string(),
        "http://127.0.0.1:5173".to_string(),
    ]
}
