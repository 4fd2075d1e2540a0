use futures::{Stream, StreamExt};
use reqwest::Response;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use crate::error::{BackendError, Result, TransportError};
use crate::traits::EventStream;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Incremental piece of the assistant reply
    Message {
        content: String,
    },

    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
}

/// One line of an Ollama `/api/chat` streaming reply
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub message: Option<ChunkMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: String,
}

impl ChatChunk {
    pub fn content(&self) -> Option<&str> {
        self.message.as_ref().map(|m| m.content.as_str())
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    fn to_stream_events(&self) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if let Some(content) = self.content() {
            if !content.is_empty() {
                events.push(StreamEvent::Message {
                    content: content.to_string(),
                });
            }
        }

        if self.done {
            events.push(StreamEvent::Done {
                finish_reason: self.done_reason.clone(),
            });
        }

        events
    }
}

/// Decode one NDJSON line into stream events; blank lines yield nothing
pub fn decode_line(line: &[u8]) -> Result<Vec<StreamEvent>> {
    let line = std::str::from_utf8(line)
        .map_err(|e| TransportError::other(format!("Invalid UTF-8 in chat stream: {}", e)))?
        .trim();

    if line.is_empty() {
        return Ok(Vec::new());
    }

    let chunk: ChatChunk = serde_json::from_str(line)
        .map_err(|e| TransportError::other(format!("Failed to parse chat chunk: {}", e)))?;

    if let Some(error) = chunk.error {
        return Err(TransportError::other(format!("Model server error: {}", error)).into());
    }

    Ok(chunk.to_stream_events())
}

/// Turn a raw byte stream of NDJSON chat chunks into reply events.
///
/// The sequence ends after the `Done` event. A read error, an undecodable line,
/// an idle gap longer than `idle_timeout` or end-of-body before `done: true`
/// ends it with one `Err` item after whatever was already decoded.
pub fn decode_chat_stream<S, B, E>(bytes: S, idle_timeout: Option<Duration>) -> EventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Into<BackendError> + Send,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(bytes);
        let mut buffer: VecDeque<u8> = VecDeque::with_capacity(8192);
        let mut finished = false;
        let mut failed = false;

        'read: loop {
            let next = match idle_timeout {
                Some(limit) => match tokio::time::timeout(limit, byte_chunks.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        yield Err(TransportError::timed_out(format!(
                            "No data from model server for {}s",
                            limit.as_secs_f32()
                        )).into());
                        failed = true;
                        break 'read;
                    }
                },
                None => byte_chunks.next().await,
            };

            let Some(chunk_result) = next else {
                break 'read;
            };

            match chunk_result {
                Ok(bytes) => {
                    buffer.extend(bytes.as_ref());

                    while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                        let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();

                        match decode_line(&line_bytes) {
                            Ok(events) => {
                                for event in events {
                                    let is_done = matches!(event, StreamEvent::Done { .. });
                                    yield Ok(event);
                                    if is_done {
                                        finished = true;
                                        break 'read;
                                    }
                                }
                            }
                            Err(e) => {
                                yield Err(e);
                                failed = true;
                                break 'read;
                            }
                        }
                    }
                }
                Err(e) => {
                    yield Err(e.into());
                    failed = true;
                    break 'read;
                }
            }
        }

        // Last object may arrive without a trailing newline
        if !finished && !failed && !buffer.is_empty() {
            let line_bytes: Vec<u8> = buffer.drain(..).collect();
            match decode_line(&line_bytes) {
                Ok(events) => {
                    for event in events {
                        if matches!(event, StreamEvent::Done { .. }) {
                            finished = true;
                        }
                        yield Ok(event);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    failed = true;
                }
            }
        }

        if !finished && !failed {
            yield Err(TransportError::other("Chat stream closed before completion").into());
        }
    })
}

pub fn parse_chat_stream(response: Response, idle_timeout: Option<Duration>) -> EventStream {
    decode_chat_stream(response.bytes_stream(), idle_timeout)
}
