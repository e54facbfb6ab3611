//! Bodies for driving middleware in tests.

use bytes::Bytes;
use http::HeaderMap;
use http_body::{Body, Frame, SizeHint};
use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Error yielded by a [`ChunkedBody`] configured to fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestBodyError(pub String);

impl fmt::Display for TestBodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "test body error: {}", self.0)
    }
}

impl std::error::Error for TestBodyError {}

/// A body that yields one data frame per chunk, then optional trailers.
///
/// With [`fail_after`](ChunkedBody::fail_after) it errors once the given
/// number of chunks has been produced, like a connection that drops mid-body.
/// With [`stalled`](ChunkedBody::stalled) it stays pending after the last
/// chunk, like a client that is still uploading.
#[derive(Debug, Default)]
pub struct ChunkedBody {
    chunks: VecDeque<Bytes>,
    trailers: Option<HeaderMap>,
    fail_after: Option<usize>,
    produced: usize,
    failed: bool,
    stalled: bool,
}

impl ChunkedBody {
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_trailers(mut self, trailers: HeaderMap) -> Self {
        self.trailers = Some(trailers);
        self
    }

    pub fn fail_after(mut self, chunks: usize) -> Self {
        self.fail_after = Some(chunks);
        self
    }

    pub fn stalled(mut self) -> Self {
        self.stalled = true;
        self
    }
}

impl Body for ChunkedBody {
    type Data = Bytes;
    type Error = TestBodyError;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.failed {
            return Poll::Ready(None);
        }
        if this.fail_after == Some(this.produced) {
            this.failed = true;
            return Poll::Ready(Some(Err(TestBodyError(format!(
                "failed after {} chunks",
                this.produced
            )))));
        }
        if let Some(chunk) = this.chunks.pop_front() {
            this.produced += 1;
            return Poll::Ready(Some(Ok(Frame::data(chunk))));
        }
        if this.stalled {
            // Never woken: the rest of the upload does not arrive.
            return Poll::Pending;
        }
        Poll::Ready(this.trailers.take().map(|t| Ok(Frame::trailers(t))))
    }

    fn is_end_stream(&self) -> bool {
        if self.stalled {
            return false;
        }
        (self.failed || (self.chunks.is_empty() && self.fail_after.is_none()))
            && self.trailers.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        if self.fail_after.is_some() || self.stalled {
            return SizeHint::default();
        }
        let len: usize = self.chunks.iter().map(Bytes::len).sum();
        SizeHint::with_exact(len as u64)
    }
}
