//! Response decoding into [`Usage`].
//!
//! Streaming responses are read as SSE: text deltas are accumulated and tool
//! invocations counted so usage can be estimated when the provider does not
//! report it. Non-streaming responses are parsed as one JSON body.

use bytes::Bytes;
use chanrelay_types::{
    RelayError, RelayInfo, RelayMode, TokenCounter, UpstreamResponse, Usage, traits::ByteStream,
};
use eventsource_stream::{EventStreamError, Eventsource as _};
use futures_util::StreamExt as _;
use serde_json::Value;
use std::collections::HashSet;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Completion tokens charged per streamed tool invocation.
///
/// Only text deltas are counted: a tool call's streamed function name and
/// arguments are not tokenized, so each invocation is approximated with this
/// fixed surcharge regardless of its argument size.
pub const TOOL_CALL_TOKEN_SURCHARGE: u64 = 7;

/// A decode error, with whatever usage had accumulated before it occurred.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct DecodeFailure {
    #[source]
    pub error: RelayError,
    pub partial: Option<Usage>,
}

impl DecodeFailure {
    fn with_partial(error: RelayError, partial: Usage) -> Self {
        Self {
            error,
            partial: Some(partial),
        }
    }
}

impl From<RelayError> for DecodeFailure {
    fn from(error: RelayError) -> Self {
        Self {
            error,
            partial: None,
        }
    }
}

/// Optional downstream sink for raw SSE events.
pub type Forward<'a> = Option<&'a mpsc::Sender<Bytes>>;

enum Delivery {
    Sent,
    Closed,
    Cancelled,
}

/// Hand `payload` to the downstream sink, giving up if `cancel` fires while
/// the channel is full.
async fn deliver(sink: &mpsc::Sender<Bytes>, payload: Bytes, cancel: &CancellationToken) -> Delivery {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Delivery::Cancelled,
        sent = sink.send(payload) => match sent {
            Ok(()) => Delivery::Sent,
            Err(_) => Delivery::Closed,
        },
    }
}

/// Decode an upstream response into usage.
///
/// # Errors
///
/// - Non-2xx status: [`RelayError::Upstream`] with the provider's message.
/// - Stream interrupted or cancelled: the error plus partial usage.
/// - Malformed or error-carrying JSON body: [`RelayError::Upstream`].
pub async fn decode_response(
    info: &RelayInfo,
    resp: UpstreamResponse,
    counter: &dyn TokenCounter,
    forward: Forward<'_>,
    cancel: &CancellationToken,
) -> Result<Usage, DecodeFailure> {
    if !resp.is_success() {
        let status = resp.status;
        let body = read_body(resp.body, cancel).await?;
        let error = upstream_error(status, &body);
        tracing::warn!(
            channel = %info.channel_type,
            model = %info.upstream_model_name,
            %error,
            "upstream request failed"
        );
        return Err(error.into());
    }
    if info.is_stream {
        decode_stream(info, resp.body, counter, forward, cancel).await
    } else {
        decode_json(info, resp.status, resp.body, counter, forward, cancel).await
    }
}

/// Build an upstream error from a non-2xx body, preferring the OpenAI error
/// envelope's message over the raw text.
#[must_use]
pub fn upstream_error(status: u16, body: &[u8]) -> RelayError {
    let message = serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| error_message(&v))
        .unwrap_or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            if text.is_empty() {
                http::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("upstream error")
                    .to_string()
            } else {
                text
            }
        });
    RelayError::Upstream { status, message }
}

fn error_message(body: &Value) -> Option<String> {
    match body.get("error")? {
        Value::Object(obj) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(String::from)
            .or_else(|| Some(Value::Object(obj.clone()).to_string())),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

async fn read_body(mut body: ByteStream, cancel: &CancellationToken) -> Result<Vec<u8>, DecodeFailure> {
    let mut buf = Vec::new();
    loop {
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(RelayError::Cancelled.into()),
            chunk = body.next() => chunk,
        };
        match chunk {
            Some(Ok(b)) => buf.extend_from_slice(&b),
            Some(Err(e)) => return Err(e.into()),
            None => return Ok(buf),
        }
    }
}

// ── Streaming ────────────────────────────────────────────────────────────────

/// Running state of one SSE response.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    text: String,
    tool_calls: HashSet<(u64, u64)>,
    reported: Option<Usage>,
}

impl StreamAccumulator {
    /// Feed one `data:` payload. Unparseable payloads are skipped.
    pub fn ingest(&mut self, data: &str) {
        let chunk: Value = match serde_json::from_str(data) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unparseable stream chunk");
                return;
            }
        };
        if let Some(usage) = chunk
            .get("usage")
            .filter(|u| u.is_object())
            .and_then(|u| serde_json::from_value::<Usage>(u.clone()).ok())
            .filter(|u| !u.is_empty())
        {
            self.reported = Some(usage);
        }
        let Some(choices) = chunk.get("choices").and_then(Value::as_array) else {
            return;
        };
        for (pos, choice) in (0u64..).zip(choices) {
            let choice_idx = choice.get("index").and_then(Value::as_u64).unwrap_or(pos);
            // Legacy completions stream `text` instead of a delta.
            if let Some(text) = choice.get("text").and_then(Value::as_str) {
                self.text.push_str(text);
            }
            let Some(delta) = choice.get("delta") else {
                continue;
            };
            if let Some(content) = delta.get("content").and_then(Value::as_str) {
                self.text.push_str(content);
            }
            if let Some(calls) = delta.get("tool_calls").and_then(Value::as_array) {
                for (tpos, call) in (0u64..).zip(calls) {
                    let tool_idx = call.get("index").and_then(Value::as_u64).unwrap_or(tpos);
                    self.tool_calls.insert((choice_idx, tool_idx));
                }
            }
        }
    }

    /// Concatenated text deltas so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of distinct tool invocations seen so far.
    #[must_use]
    pub fn tool_call_count(&self) -> u64 {
        u64::try_from(self.tool_calls.len()).unwrap_or(u64::MAX)
    }

    /// Provider-reported usage if any, otherwise an estimate.
    #[must_use]
    pub fn usage(&self, info: &RelayInfo, counter: &dyn TokenCounter) -> Usage {
        if let Some(usage) = self.reported {
            return usage;
        }
        let completion = counter.count(&self.text, &info.upstream_model_name)
            + TOOL_CALL_TOKEN_SURCHARGE * self.tool_call_count();
        Usage::new(info.prompt_tokens, completion)
    }
}

fn sse_error(e: EventStreamError<RelayError>) -> RelayError {
    match e {
        EventStreamError::Transport(e) => e,
        other => RelayError::Transport(format!("malformed event stream: {other}")),
    }
}

async fn decode_stream(
    info: &RelayInfo,
    body: ByteStream,
    counter: &dyn TokenCounter,
    mut forward: Forward<'_>,
    cancel: &CancellationToken,
) -> Result<Usage, DecodeFailure> {
    let mut events = std::pin::pin!(body.eventsource());
    let mut acc = StreamAccumulator::default();

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("stream decode cancelled");
                return Err(DecodeFailure::with_partial(
                    RelayError::Cancelled,
                    acc.usage(info, counter),
                ));
            }
            next = events.next() => next,
        };
        let event = match next {
            None => break,
            Some(Ok(event)) => event,
            Some(Err(e)) => {
                let error = sse_error(e);
                tracing::warn!(%error, "stream interrupted");
                return Err(DecodeFailure::with_partial(error, acc.usage(info, counter)));
            }
        };

        let data = event.data.trim();
        if data.is_empty() {
            continue;
        }
        let done = data == "[DONE]";
        if !done {
            acc.ingest(data);
        }
        if let Some(sink) = forward {
            let payload = Bytes::from(format!("data: {data}\n\n"));
            match deliver(sink, payload, cancel).await {
                Delivery::Sent => {}
                Delivery::Closed => {
                    tracing::debug!("downstream receiver closed, no longer forwarding");
                    forward = None;
                }
                Delivery::Cancelled => {
                    tracing::debug!("stream decode cancelled while forwarding");
                    return Err(DecodeFailure::with_partial(
                        RelayError::Cancelled,
                        acc.usage(info, counter),
                    ));
                }
            }
        }
        if done {
            break;
        }
    }

    Ok(acc.usage(info, counter))
}

// ── Non-streaming ────────────────────────────────────────────────────────────

async fn decode_json(
    info: &RelayInfo,
    status: u16,
    body: ByteStream,
    counter: &dyn TokenCounter,
    forward: Forward<'_>,
    cancel: &CancellationToken,
) -> Result<Usage, DecodeFailure> {
    let raw = read_body(body, cancel).await?;
    let json: Value = serde_json::from_slice(&raw).map_err(|e| RelayError::Upstream {
        status,
        message: format!("malformed response body: {e}"),
    })?;
    if json.get("error").is_some_and(|e| !e.is_null()) {
        let message = error_message(&json).unwrap_or_else(|| json["error"].to_string());
        return Err(RelayError::Upstream { status, message }.into());
    }

    let usage = json
        .get("usage")
        .filter(|u| u.is_object())
        .and_then(|u| serde_json::from_value::<Usage>(u.clone()).ok())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| {
            let text = response_text(&json, info.relay_mode());
            Usage::new(
                info.prompt_tokens,
                counter.count(&text, &info.upstream_model_name),
            )
        });

    if let Some(sink) = forward {
        match deliver(sink, Bytes::from(raw), cancel).await {
            Delivery::Sent => {}
            Delivery::Closed => tracing::debug!("downstream receiver closed"),
            Delivery::Cancelled => {
                return Err(DecodeFailure::with_partial(RelayError::Cancelled, usage));
            }
        }
    }
    Ok(usage)
}

fn response_text(json: &Value, mode: RelayMode) -> String {
    let Some(choices) = json.get("choices").and_then(Value::as_array) else {
        return String::new();
    };
    let field = if mode == RelayMode::Completions {
        "/text"
    } else {
        "/message/content"
    };
    choices
        .iter()
        .filter_map(|c| c.pointer(field).and_then(Value::as_str))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chanrelay_types::ChannelType;
    use futures_util::{StreamExt as _, stream};
    use serde_json::json;
    use std::time::Duration;

    /// One token per whitespace-separated word.
    struct WordCounter;

    impl TokenCounter for WordCounter {
        fn count(&self, text: &str, _model: &str) -> u64 {
            text.split_whitespace().count() as u64
        }
    }

    fn info(stream: bool) -> RelayInfo {
        RelayInfo::builder()
            .channel_type(ChannelType::OpenAI)
            .api_key("sk")
            .upstream_model_name("gpt-4o")
            .is_stream(stream)
            .prompt_tokens(11)
            .build()
    }

    fn chunked(status: u16, chunks: Vec<&'static str>) -> UpstreamResponse {
        let body: ByteStream = Box::pin(stream::iter(
            chunks.into_iter().map(|c| Ok(Bytes::from_static(c.as_bytes()))),
        ));
        UpstreamResponse {
            status,
            headers: http::HeaderMap::new(),
            body,
        }
    }

    fn sse(events: &[Value]) -> String {
        let mut out = String::new();
        for e in events {
            out.push_str(&format!("data: {e}\n\n"));
        }
        out.push_str("data: [DONE]\n\n");
        out
    }

    fn delta(content: &str) -> Value {
        json!({"choices": [{"index": 0, "delta": {"content": content}}]})
    }

    async fn decode(info: &RelayInfo, resp: UpstreamResponse) -> Result<Usage, DecodeFailure> {
        decode_response(info, resp, &WordCounter, None, &CancellationToken::new()).await
    }

    #[tokio::test]
    async fn test_stream_text_only() {
        let body = sse(&[delta("hello there"), delta(" general kenobi")]);
        let usage = decode(&info(true), UpstreamResponse::from_bytes(200, body))
            .await
            .unwrap();
        assert_eq!(usage, Usage::new(11, 4));
        assert_eq!(usage.total_tokens, 15);
    }

    #[tokio::test]
    async fn test_stream_tool_calls_add_surcharge() {
        // Two tool calls, the first spread over two chunks.
        let body = sse(&[
            delta("calling tools"),
            json!({"choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "id": "call_a", "function": {"name": "f", "arguments": ""}}
            ]}}]}),
            json!({"choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 0, "function": {"arguments": "{\"x\":1}"}}
            ]}}]}),
            json!({"choices": [{"index": 0, "delta": {"tool_calls": [
                {"index": 1, "id": "call_b", "function": {"name": "g", "arguments": "{}"}}
            ]}}]}),
        ]);
        let usage = decode(&info(true), UpstreamResponse::from_bytes(200, body))
            .await
            .unwrap();
        assert_eq!(usage.completion_tokens, 2 + 2 * TOOL_CALL_TOKEN_SURCHARGE);
        assert_eq!(usage.prompt_tokens, 11);
    }

    #[tokio::test]
    async fn test_stream_reported_usage_is_verbatim() {
        let body = sse(&[
            delta("some words here"),
            json!({"choices": [], "usage": {"prompt_tokens": 5, "completion_tokens": 9, "total_tokens": 14}}),
        ]);
        let usage = decode(&info(true), UpstreamResponse::from_bytes(200, body))
            .await
            .unwrap();
        assert_eq!(usage, Usage::new(5, 9));
    }

    #[tokio::test]
    async fn test_stream_events_split_across_chunks() {
        let resp = chunked(
            200,
            vec![
                "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"one ",
                "two\"}}]}\n\ndata: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\" three\"}}]}\n",
                "\ndata: [DONE]\n\n",
            ],
        );
        let usage = decode(&info(true), resp).await.unwrap();
        assert_eq!(usage.completion_tokens, 3);
    }

    #[tokio::test]
    async fn test_stream_without_done_ends_at_eof() {
        let resp = chunked(200, vec!["data: {\"choices\":[{\"delta\":{\"content\":\"a b\"}}]}\n\n"]);
        let usage = decode(&info(true), resp).await.unwrap();
        assert_eq!(usage.completion_tokens, 2);
    }

    #[tokio::test]
    async fn test_stream_skips_garbage_lines() {
        let body = format!(": keep-alive\n\ndata: not-json\n\n{}", sse(&[delta("ok")]));
        let usage = decode(&info(true), UpstreamResponse::from_bytes(200, body))
            .await
            .unwrap();
        assert_eq!(usage.completion_tokens, 1);
    }

    #[tokio::test]
    async fn test_stream_transport_error_returns_partial() {
        let body: ByteStream = Box::pin(stream::iter(vec![
            Ok(Bytes::from(format!("data: {}\n\n", delta("partial words")))),
            Err(RelayError::Transport("connection reset".into())),
        ]));
        let resp = UpstreamResponse {
            status: 200,
            headers: http::HeaderMap::new(),
            body,
        };
        let failure = decode(&info(true), resp).await.unwrap_err();
        assert!(matches!(failure.error, RelayError::Transport(_)));
        assert_eq!(failure.partial, Some(Usage::new(11, 2)));
    }

    #[tokio::test]
    async fn test_stream_cancelled_returns_partial() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let body = sse(&[delta("never read")]);
        let failure = decode_response(
            &info(true),
            UpstreamResponse::from_bytes(200, body),
            &WordCounter,
            None,
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(failure.error, RelayError::Cancelled));
        assert_eq!(failure.partial, Some(Usage::new(11, 0)));
    }

    #[tokio::test]
    async fn test_stream_forwards_every_event() {
        let (tx, mut rx) = mpsc::channel(16);
        let body = sse(&[delta("a"), delta("b")]);
        decode_response(
            &info(true),
            UpstreamResponse::from_bytes(200, body),
            &WordCounter,
            Some(&tx),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        drop(tx);
        let mut forwarded = Vec::new();
        while let Some(b) = rx.recv().await {
            forwarded.push(String::from_utf8(b.to_vec()).unwrap());
        }
        assert_eq!(forwarded.len(), 3);
        assert!(forwarded[0].starts_with("data: {"));
        assert_eq!(forwarded[2], "data: [DONE]\n\n");
    }

    #[tokio::test]
    async fn test_stream_closed_receiver_does_not_fail() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let usage = decode_response(
            &info(true),
            UpstreamResponse::from_bytes(200, sse(&[delta("x y")])),
            &WordCounter,
            Some(&tx),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(usage.completion_tokens, 2);
    }

    fn cancel_after(cancel: &CancellationToken, delay: Duration) {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            cancel.cancel();
        });
    }

    #[tokio::test]
    async fn test_stream_cancel_while_downstream_stalled() {
        // The receiver stays alive but is never read, so the second forward
        // blocks on a full channel.
        let (tx, mut rx) = mpsc::channel(1);
        let event = format!("data: {}\n\n", delta("tick"));
        let body: ByteStream = Box::pin(stream::repeat_with(move || {
            Ok::<_, RelayError>(Bytes::from(event.clone()))
        }));
        let resp = UpstreamResponse {
            status: 200,
            headers: http::HeaderMap::new(),
            body,
        };
        let cancel = CancellationToken::new();
        cancel_after(&cancel, Duration::from_millis(50));

        let failure = tokio::time::timeout(
            Duration::from_secs(2),
            decode_response(&info(true), resp, &WordCounter, Some(&tx), &cancel),
        )
        .await
        .expect("decoder must observe cancellation")
        .unwrap_err();

        assert!(matches!(failure.error, RelayError::Cancelled));
        let partial = failure.partial.expect("partial usage");
        assert_eq!(partial.prompt_tokens, 11);
        assert!(partial.completion_tokens >= 1);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_json_cancel_mid_body() {
        let body: ByteStream = Box::pin(
            stream::iter(vec![Ok::<_, RelayError>(Bytes::from_static(b"{\"choices\": ["))])
                .chain(stream::pending()),
        );
        let resp = UpstreamResponse {
            status: 200,
            headers: http::HeaderMap::new(),
            body,
        };
        let cancel = CancellationToken::new();
        cancel_after(&cancel, Duration::from_millis(50));

        let failure = tokio::time::timeout(
            Duration::from_secs(2),
            decode_response(&info(false), resp, &WordCounter, None, &cancel),
        )
        .await
        .expect("body read must observe cancellation")
        .unwrap_err();

        assert!(matches!(failure.error, RelayError::Cancelled));
        assert!(failure.partial.is_none());
    }

    #[tokio::test]
    async fn test_json_cancel_while_downstream_stalled() {
        let (tx, _rx) = mpsc::channel(1);
        tx.send(Bytes::from_static(b"earlier")).await.unwrap();
        let body = json!({"choices": [{"message": {"content": "three small words"}}]});
        let cancel = CancellationToken::new();
        cancel_after(&cancel, Duration::from_millis(50));

        let failure = tokio::time::timeout(
            Duration::from_secs(2),
            decode_response(
                &info(false),
                UpstreamResponse::from_bytes(200, body.to_string()),
                &WordCounter,
                Some(&tx),
                &cancel,
            ),
        )
        .await
        .expect("forward must observe cancellation")
        .unwrap_err();

        assert!(matches!(failure.error, RelayError::Cancelled));
        assert_eq!(failure.partial, Some(Usage::new(11, 3)));
    }

    #[tokio::test]
    async fn test_json_explicit_usage_unchanged() {
        let body = json!({
            "choices": [{"message": {"role": "assistant", "content": "lots of words in here"}}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 4, "total_tokens": 99}
        });
        let usage = decode(&info(false), UpstreamResponse::from_bytes(200, body.to_string()))
            .await
            .unwrap();
        assert_eq!(usage.prompt_tokens, 3);
        assert_eq!(usage.completion_tokens, 4);
        assert_eq!(usage.total_tokens, 99);
    }

    #[tokio::test]
    async fn test_json_missing_usage_is_estimated() {
        let body = json!({"choices": [{"message": {"content": "three small words"}}]});
        let usage = decode(&info(false), UpstreamResponse::from_bytes(200, body.to_string()))
            .await
            .unwrap();
        assert_eq!(usage, Usage::new(11, 3));
    }

    #[tokio::test]
    async fn test_json_error_in_success_body() {
        let body = json!({"error": {"message": "quota exceeded", "type": "insufficient_quota"}});
        let failure = decode(&info(false), UpstreamResponse::from_bytes(200, body.to_string()))
            .await
            .unwrap_err();
        assert!(matches!(
            failure.error,
            RelayError::Upstream { status: 200, ref message } if message == "quota exceeded"
        ));
        assert!(failure.partial.is_none());
    }

    #[tokio::test]
    async fn test_json_malformed_body() {
        let failure = decode(&info(false), UpstreamResponse::from_bytes(200, "<html>"))
            .await
            .unwrap_err();
        assert!(matches!(failure.error, RelayError::Upstream { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_non_2xx_uses_error_envelope() {
        let body = json!({"error": {"message": "Incorrect API key provided", "code": "invalid_api_key"}});
        let failure = decode(&info(true), UpstreamResponse::from_bytes(401, body.to_string()))
            .await
            .unwrap_err();
        assert!(matches!(
            failure.error,
            RelayError::Upstream { status: 401, ref message } if message == "Incorrect API key provided"
        ));
        assert!(failure.partial.is_none());
    }

    #[tokio::test]
    async fn test_non_2xx_raw_text() {
        let failure = decode(&info(false), UpstreamResponse::from_bytes(502, "bad gateway\n"))
            .await
            .unwrap_err();
        assert!(matches!(
            failure.error,
            RelayError::Upstream { status: 502, ref message } if message == "bad gateway"
        ));
    }

    #[test]
    fn test_upstream_error_empty_body_uses_reason() {
        let err = upstream_error(429, b"");
        assert!(matches!(err, RelayError::Upstream { ref message, .. } if message == "Too Many Requests"));
    }

    #[test]
    fn test_accumulator_counts_tool_calls_per_choice() {
        let mut acc = StreamAccumulator::default();
        acc.ingest(
            &json!({"choices": [
                {"index": 0, "delta": {"tool_calls": [{"index": 0}]}},
                {"index": 1, "delta": {"tool_calls": [{"index": 0}]}}
            ]})
            .to_string(),
        );
        acc.ingest(&json!({"choices": [{"index": 0, "delta": {"tool_calls": [{"index": 0}]}}]}).to_string());
        assert_eq!(acc.tool_call_count(), 2);
        assert_eq!(acc.text(), "");
    }
}
