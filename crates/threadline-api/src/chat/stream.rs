use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use serde_json::json;
use threadline_llm::{EventStream, StreamEvent};

use crate::chat::turn::ChatTurn;
use crate::error::ApiError;

fn sse_event(name: &str, data: serde_json::Value) -> Event {
    Event::default().event(name).data(data.to_string())
}

fn error_event(err: &ApiError) -> Event {
    if let ApiError::Internal(detail) = err {
        tracing::error!(error = %detail, "Chat stream failed");
    }
    sse_event("error", json!(err.body()))
}

/// Forward provider events to the client while the turn accumulates them.
///
/// The stream ends with exactly one `done` or `error` event. If the client
/// goes away first, dropping the stream drops the turn, which finalizes it.
pub fn into_sse(
    mut turn: ChatTurn,
    mut events: EventStream,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        while let Some(item) = events.next().await {
            match item {
                Ok(StreamEvent::Message { content }) => {
                    turn.push_content(&content);
                    turn.mark_streaming().await;
                    yield Ok(sse_event("message", json!({ "content": content })));
                }
                Ok(StreamEvent::Reasoning { content }) => {
                    turn.push_reasoning(&content);
                    turn.mark_streaming().await;
                    yield Ok(sse_event("reasoning", json!({ "content": content })));
                }
                Ok(StreamEvent::Done { finish_reason }) => {
                    tracing::debug!(
                        message_id = %turn.message_id(),
                        finish_reason = ?finish_reason,
                        "Provider stream finished"
                    );
                    match turn.complete().await {
                        Ok(()) => {
                            yield Ok(sse_event(
                                "done",
                                json!({ "status": "completed", "messageId": turn.message_id() }),
                            ));
                        }
                        Err(err) => yield Ok(error_event(&err)),
                    }
                    return;
                }
                Err(err) => {
                    let err = turn.reject(ApiError::from(err)).await;
                    yield Ok(error_event(&err));
                    return;
                }
            }
        }

        let err = turn
            .reject(ApiError::Internal("provider stream ended without completion".to_string()))
            .await;
        yield Ok(error_event(&err));
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
