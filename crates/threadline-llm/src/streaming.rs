use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::buffer::LineBuffer;
use crate::error::{InlineError, ProviderError};
use crate::traits::EventStream;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Reasoning {
        content: String,
    },

    Message {
        content: String,
    },

    /// Terminal event, emitted exactly once per successful stream
    Done {
        #[serde(skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
}

/// One `data:` payload of an OpenAI-compatible chat completion stream
#[derive(Debug, Clone, Deserialize)]
pub struct ChatStreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
    #[serde(default)]
    pub(crate) error: Option<InlineError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: Delta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Delta {
    pub content: Option<String>,
    /// OpenRouter and Groq name the reasoning trace differently
    #[serde(alias = "reasoning_content")]
    pub reasoning: Option<String>,
}

impl ChatStreamChunk {
    fn events(&self) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if let Some(choice) = self.choices.first() {
            if let Some(reasoning) = &choice.delta.reasoning {
                if !reasoning.is_empty() {
                    events.push(StreamEvent::Reasoning {
                        content: reasoning.clone(),
                    });
                }
            }

            if let Some(content) = &choice.delta.content {
                if !content.is_empty() {
                    events.push(StreamEvent::Message {
                        content: content.clone(),
                    });
                }
            }
        }

        events
    }

    fn finish_reason(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.finish_reason.as_deref())
    }
}

enum LineOutcome {
    Events(Vec<StreamEvent>),
    Finished,
    Failed(ProviderError),
}

fn handle_line(line: &str, finish_reason: &mut Option<String>) -> LineOutcome {
    // Comments (": OPENROUTER PROCESSING"), event names and ids carry nothing we use
    let Some(data) = line.strip_prefix("data:") else {
        return LineOutcome::Events(Vec::new());
    };
    let data = data.trim_start();

    if data == "[DONE]" {
        return LineOutcome::Finished;
    }

    match serde_json::from_str::<ChatStreamChunk>(data) {
        Ok(chunk) => {
            if let Some(err) = chunk.error.clone() {
                return LineOutcome::Failed(err.into());
            }
            if let Some(reason) = chunk.finish_reason() {
                *finish_reason = Some(reason.to_string());
            }
            LineOutcome::Events(chunk.events())
        }
        Err(e) => LineOutcome::Failed(ProviderError::Decode(format!(
            "failed to parse chat chunk: {}",
            e
        ))),
    }
}

/// Turn a raw SSE byte stream into [`StreamEvent`]s.
///
/// A single `Done` is emitted at `[DONE]`, or at end of input if a finish
/// reason was seen. A stream that closes with neither is an error.
pub fn parse_chat_sse_stream<S, B, E>(bytes: S) -> EventStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Into<ProviderError> + Send,
{
    Box::pin(async_stream::stream! {
        let mut byte_chunks = Box::pin(bytes);
        let mut buffer = LineBuffer::with_capacity(8192);
        let mut finish_reason: Option<String> = None;
        let mut saw_done = false;

        'outer: while let Some(chunk_result) = byte_chunks.next().await {
            match chunk_result {
                Ok(chunk) => {
                    buffer.extend(chunk.as_ref());

                    while let Some(line_result) = buffer.next_line() {
                        let line = match line_result {
                            Ok(line) => line,
                            Err(e) => {
                                yield Err(e);
                                return;
                            }
                        };
                        if line.is_empty() {
                            continue;
                        }

                        match handle_line(&line, &mut finish_reason) {
                            LineOutcome::Events(events) => {
                                for event in events {
                                    yield Ok(event);
                                }
                            }
                            LineOutcome::Finished => {
                                saw_done = true;
                                break 'outer;
                            }
                            LineOutcome::Failed(e) => {
                                yield Err(e);
                                return;
                            }
                        }
                    }
                }
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            }
        }

        if !saw_done {
            if let Some(line) = buffer.take_remainder() {
                match handle_line(&line, &mut finish_reason) {
                    LineOutcome::Events(events) => {
                        for event in events {
                            yield Ok(event);
                        }
                    }
                    LineOutcome::Finished => saw_done = true,
                    LineOutcome::Failed(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }

        if saw_done || finish_reason.is_some() {
            yield Ok(StreamEvent::Done { finish_reason });
        } else {
            yield Err(ProviderError::Decode("stream closed before completion".to_string()));
        }
    })
}
