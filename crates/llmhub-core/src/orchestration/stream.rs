//! Terminal-state adapter for streamed generation
//!
//! Wraps the opening of a provider stream and the stream itself so that the
//! consumer always sees exactly one final chunk, and sees it last:
//! - the backend's own final chunk is passed through (priced when possible)
//! - a backend error becomes a final chunk with an error marker
//! - a backend stream that just ends gets a synthetic final chunk
//! - cancellation becomes a final chunk with error kind `cancelled`
//!
//! Nothing is polled until the consumer polls, and dropping the consumer's
//! stream drops the backend stream.

use std::pin::Pin;

use futures::future::BoxFuture;
use futures::stream::{self, Stream, StreamExt};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::providers::StreamResponse;
use crate::types::{CancellationToken, FinishReason, ModelInfo, ProviderId, StreamChunk};

/// Stream handed to callers of `stream_content`
pub type ChunkStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send>>;

/// A backend stream plus what is needed to finish it
pub(crate) struct OpenedStream {
    pub provider: ProviderId,
    pub inner: StreamResponse,
    pub pricing: Option<ModelInfo>,
}

enum State {
    Opening(BoxFuture<'static, OrchestratorResult<OpenedStream>>),
    Streaming(OpenedStream),
    Done,
}

/// Final chunk describing `err`
fn error_chunk(err: &OrchestratorError) -> StreamChunk {
    StreamChunk::failed(err.kind().as_str(), err.to_string())
}

/// Build the consumer-facing stream from a future that opens the backend stream
pub(crate) fn terminated(
    open: BoxFuture<'static, OrchestratorResult<OpenedStream>>,
    cancel: CancellationToken,
) -> ChunkStream {
    Box::pin(stream::unfold(
        (State::Opening(open), cancel),
        |(state, cancel)| async move {
            match state {
                State::Done => None,
                State::Opening(open) => {
                    let opened = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => Err(OrchestratorError::Cancelled),
                        res = open => res,
                    };
                    match opened {
                        Ok(opened) => Some(next_chunk(opened, cancel).await),
                        Err(e) => Some((error_chunk(&e), (State::Done, cancel))),
                    }
                }
                State::Streaming(opened) => Some(next_chunk(opened, cancel).await),
            }
        },
    ))
}

async fn next_chunk(
    mut opened: OpenedStream,
    cancel: CancellationToken,
) -> (StreamChunk, (State, CancellationToken)) {
    let item = tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        item = opened.inner.next() => Some(item),
    };

    let Some(item) = item else {
        return (error_chunk(&OrchestratorError::Cancelled), (State::Done, cancel));
    };

    match item {
        Some(Ok(chunk)) if chunk.is_final => (price(chunk, opened.pricing.as_ref()), (State::Done, cancel)),
        Some(Ok(chunk)) => (chunk, (State::Streaming(opened), cancel)),
        Some(Err(e)) => {
            let err = OrchestratorError::from_provider(opened.provider, e);
            (error_chunk(&err), (State::Done, cancel))
        }
        None => (
            StreamChunk::finished(FinishReason::Stop, None),
            (State::Done, cancel),
        ),
    }
}

fn price(mut chunk: StreamChunk, pricing: Option<&ModelInfo>) -> StreamChunk {
    if let (Some(meta), Some(model)) = (chunk.metadata.as_mut(), pricing) {
        meta.usage = meta.usage.take().map(|u| u.priced_with(model));
    }
    chunk
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderError;
    use crate::types::Usage;
    use futures::FutureExt;

    fn opened(items: Vec<Result<StreamChunk, ProviderError>>) -> OpenedStream {
        OpenedStream {
            provider: ProviderId::Mock,
            inner: Box::pin(stream::iter(items)),
            pricing: Some(ModelInfo::new("m", 1000).with_pricing(1.0, 1.0)),
        }
    }

    fn ready(o: OpenedStream) -> BoxFuture<'static, OrchestratorResult<OpenedStream>> {
        async move { Ok(o) }.boxed()
    }

    async fn collect(s: ChunkStream) -> Vec<StreamChunk> {
        s.collect().await
    }

    #[tokio::test]
    async fn test_passes_backend_final_and_prices_it() {
        let chunks = collect(terminated(
            ready(opened(vec![
                Ok(StreamChunk::text("a")),
                Ok(StreamChunk::finished(FinishReason::Stop, Some(Usage::new(1_000_000, 0)))),
                Ok(StreamChunk::text("ignored")),
            ])),
            CancellationToken::new(),
        ))
        .await;

        assert_eq!(chunks.len(), 2);
        assert!(chunks[1].is_final);
        let usage = chunks[1].metadata.as_ref().unwrap().usage.as_ref().unwrap();
        assert_eq!(usage.cost, Some(1.0));
    }

    #[tokio::test]
    async fn test_synthesizes_final_chunk() {
        let chunks = collect(terminated(
            ready(opened(vec![Ok(StreamChunk::text("a")), Ok(StreamChunk::text("b"))])),
            CancellationToken::new(),
        ))
        .await;

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.iter().filter(|c| c.is_final).count(), 1);
        assert!(chunks[2].is_final && !chunks[2].is_error());
    }

    #[tokio::test]
    async fn test_backend_error_becomes_final_marker() {
        let chunks = collect(terminated(
            ready(opened(vec![
                Ok(StreamChunk::text("a")),
                Err(ProviderError::api_error("mock", 500, "boom")),
                Ok(StreamChunk::text("never")),
            ])),
            CancellationToken::new(),
        ))
        .await;

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].error().unwrap().kind, "backend");
    }

    #[tokio::test]
    async fn test_open_failure_is_single_chunk() {
        let open = async { Err(OrchestratorError::invalid_request("bad")) }.boxed();
        let chunks = collect(terminated(open, CancellationToken::new())).await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].error().unwrap().kind, "invalid_request");
    }

    #[tokio::test]
    async fn test_cancelled_before_open() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let chunks = collect(terminated(ready(opened(vec![Ok(StreamChunk::text("a"))])), cancel)).await;
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].error().unwrap().kind, "cancelled");
    }

    #[test]
    fn test_error_chunk_carries_kind() {
        let chunk = error_chunk(&OrchestratorError::NoActiveProvider);
        assert!(chunk.is_final);
        assert_eq!(chunk.error().unwrap().kind, "no_active_provider");
    }
}
