use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::mpsc;

use super::provider::{ChatProvider, FragmentReceiver, ProviderError};
use super::types::{GenerationOptions, Prompt};

pub enum Outcome {
    Reply(&'static str),
    Fail(ProviderError),
    Stream(Vec<Result<&'static str, ProviderError>>),
}

pub fn rate_limited() -> ProviderError {
    ProviderError::status(StatusCode::TOO_MANY_REQUESTS, "Too Many Requests")
}

pub fn unauthorized() -> ProviderError {
    ProviderError::status(StatusCode::UNAUTHORIZED, "Access denied")
}

/// Provider that replays a fixed script of outcomes, one per call.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Outcome>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Outcome>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }

    fn next(&self, prompt: &Prompt) -> Outcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted provider called more times than scripted")
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn chat(
        &self,
        prompt: &Prompt,
        _options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        match self.next(prompt) {
            Outcome::Reply(text) => Ok(text.to_string()),
            Outcome::Fail(err) => Err(err),
            Outcome::Stream(_) => panic!("stream outcome scripted for a one-shot call"),
        }
    }

    async fn stream_chat(
        &self,
        prompt: &Prompt,
        _options: &GenerationOptions,
    ) -> Result<FragmentReceiver, ProviderError> {
        match self.next(prompt) {
            Outcome::Stream(items) => {
                let (tx, rx) = mpsc::channel(items.len().max(1));
                for item in items {
                    tx.try_send(item.map(str::to_string)).unwrap();
                }
                Ok(rx)
            }
            Outcome::Fail(err) => Err(err),
            Outcome::Reply(_) => panic!("one-shot outcome scripted for a streaming call"),
        }
    }
}
