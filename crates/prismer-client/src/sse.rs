//! SSE reader: response body bytes to [`StreamEvent`]s.
//!
//! Lines are only interpreted once their terminating newline has arrived,
//! so events survive arbitrary chunking, including chunks that split a
//! multi-byte character. A trailing line with no newline at end of stream
//! is discarded.
//!
//! Besides the native `{"type", "data"}` events, three simpler payload
//! shapes are accepted and normalized:
//!
//! | payload | event |
//! |---|---|
//! | `{"choices":[{"delta":{"content":"..."}}]}` | `content_delta` |
//! | `{"content":"..."}` or `{"message":"..."}` | `content_delta` |
//! | `{"error":"..."}` or `{"error":{"message":"..."}}` | `error` |
//!
//! Payloads that are not JSON become a `content_delta` carrying the raw
//! text. JSON with an unrecognized `type` is ignored.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use prismer_core::{StreamEvent, DONE_SENTINEL};
use serde_json::Value;
use tracing::{debug, warn};

const EVENT_TYPES: [&str; 6] = [
    "content_delta",
    "ui_directive",
    "tool_use",
    "tool_result",
    "error",
    "done",
];

/// Incremental SSE line decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Create a decoder with an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk. Returns the events its complete lines carry.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..pos]);
            if let Some(event) = decode_line(line.trim_end_matches('\r')) {
                events.push(event);
            }
        }
        events
    }

    /// End of stream. Drops any unterminated line.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() {
            debug!(bytes = self.buffer.len(), "Discarding unterminated SSE line");
            self.buffer.clear();
        }
    }
}

fn decode_line(line: &str) -> Option<StreamEvent> {
    if line.is_empty() || line.starts_with(':') {
        return None;
    }
    let data = line.strip_prefix("data:")?;
    decode_payload(data.strip_prefix(' ').unwrap_or(data))
}

/// Decode one `data:` payload.
///
/// Returns `None` for payloads that carry nothing the client acts on.
#[must_use]
pub fn decode_payload(data: &str) -> Option<StreamEvent> {
    if data.trim() == DONE_SENTINEL {
        return Some(StreamEvent::Done);
    }

    let Ok(value) = serde_json::from_str::<Value>(data) else {
        debug!("Non-JSON SSE payload, treating as content");
        return Some(StreamEvent::content(data));
    };

    if let Some(kind) = value.get("type").and_then(Value::as_str) {
        if !EVENT_TYPES.contains(&kind) {
            warn!(event_type = %kind, "Ignoring unknown stream event type");
            return None;
        }
        return match serde_json::from_value::<StreamEvent>(value) {
            Ok(event) => Some(event),
            Err(e) => {
                warn!(error = %e, "Malformed stream event, treating as content");
                Some(StreamEvent::content(data))
            }
        };
    }

    normalize(&value)
}

fn normalize(value: &Value) -> Option<StreamEvent> {
    if let Some(error) = value.get("error") {
        let message = error
            .as_str()
            .or_else(|| error.get("message").and_then(Value::as_str))
            .map_or_else(|| error.to_string(), str::to_string);
        return Some(StreamEvent::error(message));
    }

    if let Some(choices) = value.get("choices") {
        let content = choices
            .get(0)
            .and_then(|choice| choice.get("delta"))
            .and_then(|delta| delta.get("content"))
            .and_then(Value::as_str)?;
        return Some(StreamEvent::content(content));
    }

    value
        .get("content")
        .or_else(|| value.get("message"))
        .and_then(Value::as_str)
        .map(StreamEvent::content)
}

/// Decode a response body into events.
///
/// The stream ends after `done` or when the body ends, whichever comes
/// first; either way the body is dropped. A body error is yielded once and
/// ends the stream.
pub fn decode_stream<S, E>(body: S) -> impl Stream<Item = Result<StreamEvent, E>>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    struct State<S> {
        body: S,
        decoder: SseDecoder,
        queue: VecDeque<StreamEvent>,
        finished: bool,
    }

    let state = State {
        body,
        decoder: SseDecoder::new(),
        queue: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if state.finished {
                return None;
            }
            if let Some(event) = state.queue.pop_front() {
                state.finished = event.is_done();
                return Some((Ok(event), state));
            }
            match state.body.next().await {
                Some(Ok(chunk)) => state.queue.extend(state.decoder.push(&chunk)),
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.decoder.finish();
                    return None;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use prismer_core::Directive;
    use std::convert::Infallible;

    const WIRE: &str = concat!(
        "data: {\"type\":\"content_delta\",\"data\":{\"content\":\"Hello\"}}\n\n",
        "data: {\"type\":\"ui_directive\",\"data\":{\"type\":\"open_file\",\"payload\":\"/a.png\"}}\n\n",
        "data: [DONE]\n\n",
    );

    fn decode_all(chunks: &[&[u8]]) -> Vec<StreamEvent> {
        let mut decoder = SseDecoder::new();
        let mut events = Vec::new();
        for chunk in chunks {
            events.extend(decoder.push(chunk));
        }
        decoder.finish();
        events
    }

    #[test]
    fn whole_body() {
        assert_eq!(
            decode_all(&[WIRE.as_bytes()]),
            vec![
                StreamEvent::content("Hello"),
                Directive::open_file("/a.png").into(),
                StreamEvent::Done,
            ]
        );
    }

    #[test]
    fn every_split_point_yields_the_same_events() {
        let bytes = WIRE.as_bytes();
        let expected = decode_all(&[bytes]);
        for split in 0..=bytes.len() {
            assert_eq!(decode_all(&[&bytes[..split], &bytes[split..]]), expected);
        }
    }

    #[test]
    fn split_multibyte_character() {
        let wire = "data: {\"type\":\"content_delta\",\"data\":{\"content\":\"✓\"}}\n\n";
        let bytes = wire.as_bytes();
        let split = wire.find('✓').unwrap() + 1;
        assert_eq!(
            decode_all(&[&bytes[..split], &bytes[split..]]),
            vec![StreamEvent::content("✓")]
        );
    }

    #[test]
    fn crlf_comments_and_other_fields() {
        let wire = b": keep-alive\r\n\r\nevent: message\r\nid: 1\r\ndata:{\"content\":\"x\"}\r\n\r\n";
        assert_eq!(decode_all(&[wire]), vec![StreamEvent::content("x")]);
    }

    #[test]
    fn trailing_partial_line_is_dropped() {
        let wire = b"data: {\"content\":\"a\"}\n\ndata: {\"content\":\"b\"}";
        assert_eq!(decode_all(&[wire]), vec![StreamEvent::content("a")]);
    }

    #[test]
    fn alternate_shapes() {
        assert_eq!(
            decode_payload(r#"{"choices":[{"delta":{"content":"hi"}}]}"#),
            Some(StreamEvent::content("hi"))
        );
        assert_eq!(decode_payload(r#"{"choices":[{"delta":{}}]}"#), None);
        assert_eq!(
            decode_payload(r#"{"message":"m"}"#),
            Some(StreamEvent::content("m"))
        );
        assert_eq!(
            decode_payload(r#"{"error":"bad key"}"#),
            Some(StreamEvent::error("bad key"))
        );
        assert_eq!(
            decode_payload(r#"{"error":{"message":"quota"}}"#),
            Some(StreamEvent::error("quota"))
        );
    }

    #[test]
    fn degraded_payloads() {
        assert_eq!(decode_payload("not json"), Some(StreamEvent::content("not json")));
        assert_eq!(
            decode_payload(r#"{"type":"ui_directive","data":42}"#),
            Some(StreamEvent::content(r#"{"type":"ui_directive","data":42}"#))
        );
        assert_eq!(decode_payload(r#"{"type":"usage","data":{}}"#), None);
        assert_eq!(decode_payload(r#"{"type":"done"}"#), Some(StreamEvent::Done));
        assert_eq!(decode_payload(" [DONE] "), Some(StreamEvent::Done));
    }

    #[test]
    fn tool_events() {
        let event = decode_payload(
            r#"{"type":"tool_result","data":{"tool_call":{"id":"t","tool":"py","status":"completed","output":2}}}"#,
        )
        .unwrap();
        assert!(matches!(event, StreamEvent::ToolResult { .. }));
    }

    #[tokio::test]
    async fn stream_stops_at_done() {
        let body = WIRE.to_string() + "data: {\"content\":\"after\"}\n\n";
        let chunks: Vec<Result<Bytes, Infallible>> = body
            .as_bytes()
            .chunks(7)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        let events: Vec<_> = decode_stream(stream::iter(chunks))
            .map(Result::unwrap)
            .collect()
            .await;
        assert_eq!(events.len(), 3);
        assert_eq!(events.last(), Some(&StreamEvent::Done));
    }

    #[tokio::test]
    async fn stream_error_is_yielded_once() {
        let chunks: Vec<Result<Bytes, &str>> = vec![
            Ok(Bytes::from_static(b"data: {\"content\":\"a\"}\n\n")),
            Err("connection reset"),
            Ok(Bytes::from_static(b"data: {\"content\":\"b\"}\n\n")),
        ];
        let items: Vec<_> = decode_stream(stream::iter(chunks)).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Ok(StreamEvent::content("a")));
        assert_eq!(items[1], Err("connection reset"));
    }
}
