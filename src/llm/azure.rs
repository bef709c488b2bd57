use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use super::provider::{ChatProvider, FragmentReceiver, ProviderError};
use super::types::{GenerationOptions, Prompt};
use crate::core::config::AzureOpenAiConfig;

const STREAM_BUFFER: usize = 32;

/// Azure OpenAI chat completions over plain HTTPS.
#[derive(Clone)]
pub struct AzureOpenAiProvider {
    endpoint: String,
    api_key: String,
    api_version: String,
    client: Client,
}

impl AzureOpenAiProvider {
    pub fn new(config: &AzureOpenAiConfig) -> Self {
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_version: config.api_version.clone(),
            client: Client::new(),
        }
    }

    fn completions_url(&self, deployment: &str) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, deployment, self.api_version
        )
    }

    async fn send(
        &self,
        prompt: &Prompt,
        options: &GenerationOptions,
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let body = json!({
            "messages": prompt.messages(),
            "max_tokens": options.max_tokens,
            "temperature": options.temperature,
            "stream": stream,
        });

        let res = self
            .client
            .post(self.completions_url(&options.model))
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::other)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ProviderError::status(
                status,
                format!("Azure OpenAI returned {}: {}", status, text),
            ));
        }

        Ok(res)
    }
}

#[async_trait]
impl ChatProvider for AzureOpenAiProvider {
    fn name(&self) -> &str {
        "azure_openai"
    }

    async fn chat(
        &self,
        prompt: &Prompt,
        options: &GenerationOptions,
    ) -> Result<String, ProviderError> {
        let res = self.send(prompt, options, false).await?;
        let payload: Value = res.json().await.map_err(ProviderError::other)?;

        let message = payload["choices"]
            .get(0)
            .map(|choice| &choice["message"])
            .ok_or_else(|| ProviderError::other("Azure OpenAI returned no choices"))?;

        // Content-filtered choices come back with `content: null`.
        message["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::other("Azure OpenAI returned no content"))
    }

    async fn stream_chat(
        &self,
        prompt: &Prompt,
        options: &GenerationOptions,
    ) -> Result<FragmentReceiver, ProviderError> {
        let res = self.send(prompt, options, true).await?;

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let mut events = res.bytes_stream().eventsource();

        // Dropping `events` when this task returns closes the upstream connection.
        tokio::spawn(async move {
            loop {
                let item = tokio::select! {
                    _ = tx.closed() => {
                        tracing::debug!("Fragment receiver dropped, closing upstream stream");
                        return;
                    }
                    item = events.next() => item,
                };
                let Some(item) = item else {
                    return;
                };

                let event = match item {
                    Ok(event) => event,
                    Err(e) => {
                        let _ = tx.send(Err(ProviderError::other(e))).await;
                        return;
                    }
                };

                let data = event.data.trim();
                if data.is_empty() {
                    continue;
                }
                if data == "[DONE]" {
                    return;
                }

                let chunk: Value = match serde_json::from_str(data) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        let _ = tx.send(Err(ProviderError::other(e))).await;
                        return;
                    }
                };
                if let Some(message) = chunk["error"]["message"].as_str() {
                    let _ = tx.send(Err(ProviderError::other(message))).await;
                    return;
                }

                // Azure sends content-filter results in chunks without choices.
                if let Some(content) = chunk["choices"][0]["delta"]["content"].as_str() {
                    if tx.send(Ok(content.to_string())).await.is_err() {
                        tracing::debug!("Fragment receiver dropped, closing upstream stream");
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::Message;
    use reqwest::StatusCode;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CHAT_PATH: &str = "/openai/deployments/gpt-35-turbo/chat/completions";

    fn provider(server: &MockServer) -> AzureOpenAiProvider {
        AzureOpenAiProvider::new(&AzureOpenAiConfig {
            endpoint: format!("{}/", server.uri()),
            api_key: "test-key".to_string(),
            ..AzureOpenAiConfig::default()
        })
    }

    fn options() -> GenerationOptions {
        GenerationOptions {
            model: "gpt-35-turbo".to_string(),
            max_tokens: 100,
            temperature: 0.5,
        }
    }

    fn prompt() -> Prompt {
        Prompt::new(&Message::system("sys"), &[Message::user("hi")])
    }

    #[tokio::test]
    async fn chat_returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .and(query_param("api-version", "2024-02-01"))
            .and(header("api-key", "test-key"))
            .and(body_partial_json(json!({
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "hi"}
                ],
                "max_tokens": 100,
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "Hello!"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = provider(&server).chat(&prompt(), &options()).await.unwrap();
        assert_eq!(reply, "Hello!");
    }

    #[tokio::test]
    async fn chat_reports_upstream_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = provider(&server).chat(&prompt(), &options()).await.unwrap_err();
        assert_eq!(err.status, Some(StatusCode::TOO_MANY_REQUESTS));
        assert!(err.message.contains("slow down"));
    }

    #[tokio::test]
    async fn chat_without_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = provider(&server).chat(&prompt(), &options()).await.unwrap_err();
        assert_eq!(err.status, None);
    }

    #[tokio::test]
    async fn chat_with_null_content_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "finish_reason": "content_filter",
                    "message": {"role": "assistant", "content": null}
                }]
            })))
            .mount(&server)
            .await;

        let err = provider(&server).chat(&prompt(), &options()).await.unwrap_err();
        assert_eq!(err.status, None);
        assert!(err.message.contains("no content"));
    }

    #[tokio::test]
    async fn stream_chat_forwards_deltas_in_order() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"choices\":[],\"prompt_filter_results\":[]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        );
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .and(body_partial_json(json!({"stream": true})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let mut rx = provider(&server)
            .stream_chat(&prompt(), &options())
            .await
            .unwrap();

        let mut fragments = Vec::new();
        while let Some(item) = rx.recv().await {
            fragments.push(item.unwrap());
        }
        assert_eq!(fragments, vec!["Hel", "", "lo"]);
    }

    #[tokio::test]
    async fn dropping_receiver_closes_stalled_upstream() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (closed_tx, closed_rx) = oneshot::channel();

        // Sends one delta, then stalls until the client hangs up.
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await.unwrap();
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n",
                )
                .await
                .unwrap();
            socket
                .write_all(b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n")
                .await
                .unwrap();
            socket.flush().await.unwrap();
            loop {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => continue,
                }
            }
            let _ = closed_tx.send(());
        });

        let provider = AzureOpenAiProvider::new(&AzureOpenAiConfig {
            endpoint: format!("http://{}", addr),
            api_key: "test-key".to_string(),
            ..AzureOpenAiConfig::default()
        });
        let mut rx = provider.stream_chat(&prompt(), &options()).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().unwrap(), "Hel");

        drop(rx);

        tokio::time::timeout(Duration::from_secs(3), closed_rx)
            .await
            .expect("upstream connection still open after the receiver was dropped")
            .unwrap();
    }

    #[tokio::test]
    async fn stream_chat_rate_limit_fails_before_streaming() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = provider(&server)
            .stream_chat(&prompt(), &options())
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(StatusCode::TOO_MANY_REQUESTS));
    }
}
