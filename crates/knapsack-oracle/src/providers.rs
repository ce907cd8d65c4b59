//! External LLM provider calls.
//!
//! Every provider is called in streaming mode and the tokens are gathered
//! into one reply. OpenAI and Groq share a wire format; Anthropic has its own.

use std::pin::Pin;

use futures::Stream;
use knapsack_core::{Error, Result};
use reqwest::Client;
use serde_json::{json, Value};
use tokio_stream::StreamExt;
use tracing::{debug, error};

use crate::types::{ChatMessage, CompletionParams, OracleProvider, ResolvedProvider};

const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const GROQ_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Boxed stream type for returning different stream implementations.
pub type BoxedStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send>>;

/// A single streamed token, completion marker, or failure.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    Token(String),
    Done { tokens_used: usize },
    Error(String),
}

/// Stream tokens from the resolved provider.
pub fn stream_completion(
    client: &Client,
    resolved: &ResolvedProvider,
    messages: Vec<ChatMessage>,
    params: CompletionParams,
) -> BoxedStream {
    match resolved.provider {
        OracleProvider::OpenAI => Box::pin(stream_openai_compat(
            client.clone(),
            OPENAI_URL,
            messages,
            resolved.model.clone(),
            resolved.api_key.clone(),
            params,
        )),
        OracleProvider::Groq => Box::pin(stream_openai_compat(
            client.clone(),
            GROQ_URL,
            messages,
            resolved.model.clone(),
            resolved.api_key.clone(),
            params,
        )),
        OracleProvider::Anthropic => Box::pin(stream_anthropic(
            client.clone(),
            messages,
            resolved.model.clone(),
            resolved.api_key.clone(),
            params,
        )),
    }
}

/// Drive a token stream to completion and return the full reply text.
///
/// Any error chunk ends collection with `OracleUnavailable`.
pub async fn collect_reply(mut stream: BoxedStream) -> Result<String> {
    let mut reply = String::new();

    while let Some(chunk) = stream.next().await {
        match chunk {
            StreamChunk::Token(text) => reply.push_str(&text),
            StreamChunk::Done { tokens_used } => {
                debug!("Oracle reply complete: {} tokens, {} bytes", tokens_used, reply.len());
                return Ok(reply);
            }
            StreamChunk::Error(e) => {
                error!("Oracle stream failed: {}", e);
                return Err(Error::OracleUnavailable(e));
            }
        }
    }

    Ok(reply)
}

/// Pull complete `data:` payloads out of an SSE byte buffer.
///
/// Consumed lines are removed from `buffer`; a trailing partial line stays.
/// Lines are decoded only once complete, so a multibyte character split
/// across network chunks survives intact.
fn drain_sse_data(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut payloads = Vec::new();
    while let Some(line_end) = buffer.iter().position(|&b| b == b'\n') {
        let raw: Vec<u8> = buffer.drain(..=line_end).collect();
        let line = String::from_utf8_lossy(&raw);
        let line = line.trim();
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        // Anthropic also sends "event: " lines; only data lines matter.
        if let Some(data) = line.strip_prefix("data:") {
            payloads.push(data.trim().to_string());
        }
    }
    payloads
}

/// Interpret one OpenAI-compatible SSE payload.
fn openai_chunk(data: &str) -> Option<StreamChunk> {
    if data == "[DONE]" {
        return Some(StreamChunk::Done { tokens_used: 0 });
    }
    let parsed: Value = serde_json::from_str(data).ok()?;
    if let Some(msg) = parsed["error"]["message"].as_str() {
        return Some(StreamChunk::Error(msg.to_string()));
    }
    parsed["choices"][0]["delta"]["content"]
        .as_str()
        .filter(|c| !c.is_empty())
        .map(|c| StreamChunk::Token(c.to_string()))
}

/// Interpret one Anthropic SSE payload.
fn anthropic_chunk(data: &str) -> Option<StreamChunk> {
    let parsed: Value = serde_json::from_str(data).ok()?;
    match parsed["type"].as_str() {
        Some("content_block_delta") => parsed["delta"]["text"]
            .as_str()
            .filter(|t| !t.is_empty())
            .map(|t| StreamChunk::Token(t.to_string())),
        Some("message_stop") => Some(StreamChunk::Done { tokens_used: 0 }),
        Some("error") => Some(StreamChunk::Error(
            parsed["error"]["message"]
                .as_str()
                .unwrap_or("Unknown error")
                .to_string(),
        )),
        _ => None,
    }
}

/// Send a streaming request and translate its SSE payloads with `interpret`.
fn stream_request(
    request: reqwest::RequestBuilder,
    interpret: fn(&str) -> Option<StreamChunk>,
) -> impl Stream<Item = StreamChunk> + Send + 'static {
    async_stream::stream! {
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                yield StreamChunk::Error(format!("Request failed: {}", e));
                return;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            yield StreamChunk::Error(format!("API error {}: {}", status, body));
            return;
        }

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut token_count = 0usize;

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    yield StreamChunk::Error(format!("Stream read error: {}", e));
                    return;
                }
            };

            buffer.extend_from_slice(&bytes);

            for data in drain_sse_data(&mut buffer) {
                match interpret(&data) {
                    Some(StreamChunk::Token(text)) => {
                        token_count += 1;
                        yield StreamChunk::Token(text);
                    }
                    Some(StreamChunk::Done { .. }) => {
                        yield StreamChunk::Done { tokens_used: token_count };
                        return;
                    }
                    Some(StreamChunk::Error(e)) => {
                        yield StreamChunk::Error(e);
                        return;
                    }
                    None => {}
                }
            }
        }

        yield StreamChunk::Done { tokens_used: token_count };
    }
}

/// Stream from OpenAI-compatible APIs (OpenAI, Groq).
fn stream_openai_compat(
    client: Client,
    url: &str,
    messages: Vec<ChatMessage>,
    model: String,
    api_key: String,
    params: CompletionParams,
) -> impl Stream<Item = StreamChunk> + Send + 'static {
    let msgs: Vec<Value> = messages
        .iter()
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    let body = json!({
        "model": model,
        "messages": msgs,
        "temperature": params.temperature,
        "max_tokens": params.max_tokens,
        "stream": true,
    });

    debug!("Streaming from {} with model {}", url, model);

    let request = client
        .post(url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&body);

    stream_request(request, openai_chunk)
}

/// Stream from Anthropic's Messages API.
fn stream_anthropic(
    client: Client,
    messages: Vec<ChatMessage>,
    model: String,
    api_key: String,
    params: CompletionParams,
) -> impl Stream<Item = StreamChunk> + Send + 'static {
    // Anthropic takes the system prompt outside the message list
    let system_msg: Option<String> = messages
        .iter()
        .find(|m| m.role == "system")
        .map(|m| m.content.clone());

    let conv_msgs: Vec<Value> = messages
        .iter()
        .filter(|m| m.role != "system")
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    let mut body = json!({
        "model": model,
        "messages": conv_msgs,
        "temperature": params.temperature,
        "max_tokens": params.max_tokens,
        "stream": true,
    });

    if let Some(sys) = system_msg {
        body["system"] = json!(sys);
    }

    debug!("Streaming from Anthropic with model {}", model);

    let request = client
        .post(ANTHROPIC_URL)
        .header("x-api-key", &api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .header("Content-Type", "application/json")
        .json(&body);

    stream_request(request, anthropic_chunk)
}

/// Check that the resolved provider accepts its key with a minimal request.
pub async fn test_connection(client: &Client, resolved: &ResolvedProvider) -> Result<()> {
    let request = match resolved.provider {
        OracleProvider::OpenAI => client
            .get("https://api.openai.com/v1/models")
            .header("Authorization", format!("Bearer {}", resolved.api_key)),
        OracleProvider::Groq => client
            .get("https://api.groq.com/openai/v1/models")
            .header("Authorization", format!("Bearer {}", resolved.api_key)),
        OracleProvider::Anthropic => client
            .post(ANTHROPIC_URL)
            .header("x-api-key", &resolved.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": resolved.model,
                "max_tokens": 1,
                "messages": [{"role": "user", "content": "Hi"}],
            })),
    };

    let resp = request
        .send()
        .await
        .map_err(|e| Error::OracleUnavailable(e.to_string()))?;

    // Anthropic answers 400 for quota/model issues even with a valid key
    let accepted = resp.status().is_success()
        || (resolved.provider == OracleProvider::Anthropic && resp.status().as_u16() == 400);

    if accepted {
        Ok(())
    } else {
        Err(Error::OracleUnavailable(format!(
            "{} returned status {}",
            resolved.provider,
            resp.status()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_keeps_partial_line() {
        let mut buffer = b"data: {\"a\":1}\n: keepalive\nevent: ping\ndata: [DO".to_vec();
        let payloads = drain_sse_data(&mut buffer);
        assert_eq!(payloads, vec!["{\"a\":1}".to_string()]);
        assert_eq!(buffer, b"data: [DO");

        buffer.extend_from_slice(b"NE]\n");
        assert_eq!(drain_sse_data(&mut buffer), vec!["[DONE]".to_string()]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let event = "data: {\"choices\":[{\"delta\":{\"content\":\"café\"}}]}\n".as_bytes();
        // Split inside the two-byte encoding of 'é'
        let split = event.iter().position(|&b| b == 0xC3).unwrap() + 1;

        let mut buffer = event[..split].to_vec();
        assert!(drain_sse_data(&mut buffer).is_empty());

        buffer.extend_from_slice(&event[split..]);
        let payloads = drain_sse_data(&mut buffer);
        assert_eq!(payloads.len(), 1);
        assert_eq!(
            openai_chunk(&payloads[0]),
            Some(StreamChunk::Token("café".into()))
        );
    }

    #[test]
    fn test_openai_chunks() {
        assert_eq!(
            openai_chunk(r#"{"choices":[{"delta":{"content":"[{"}}]}"#),
            Some(StreamChunk::Token("[{".into()))
        );
        assert_eq!(openai_chunk(r#"{"choices":[{"delta":{"content":""}}]}"#), None);
        assert_eq!(openai_chunk("[DONE]"), Some(StreamChunk::Done { tokens_used: 0 }));
        assert_eq!(
            openai_chunk(r#"{"error":{"message":"rate limited"}}"#),
            Some(StreamChunk::Error("rate limited".into()))
        );
        assert_eq!(openai_chunk("garbage"), None);
    }

    #[test]
    fn test_anthropic_chunks() {
        assert_eq!(
            anthropic_chunk(r#"{"type":"content_block_delta","delta":{"text":"hi"}}"#),
            Some(StreamChunk::Token("hi".into()))
        );
        assert_eq!(
            anthropic_chunk(r#"{"type":"message_stop"}"#),
            Some(StreamChunk::Done { tokens_used: 0 })
        );
        assert_eq!(
            anthropic_chunk(r#"{"type":"error","error":{"message":"overloaded"}}"#),
            Some(StreamChunk::Error("overloaded".into()))
        );
        assert_eq!(anthropic_chunk(r#"{"type":"ping"}"#), None);
    }

    #[tokio::test]
    async fn test_collect_reply_joins_tokens() {
        let stream: BoxedStream = Box::pin(futures::stream::iter(vec![
            StreamChunk::Token("[".into()),
            StreamChunk::Token("]".into()),
            StreamChunk::Done { tokens_used: 2 },
            StreamChunk::Token("ignored".into()),
        ]));
        assert_eq!(collect_reply(stream).await.unwrap(), "[]");
    }

    #[tokio::test]
    async fn test_collect_reply_error_is_unavailable() {
        let stream: BoxedStream = Box::pin(futures::stream::iter(vec![
            StreamChunk::Token("[".into()),
            StreamChunk::Error("API error 401 Unauthorized".into()),
        ]));
        let err = collect_reply(stream).await.unwrap_err();
        assert!(matches!(err, Error::OracleUnavailable(_)));
    }
}
