//! Response body decorator.
//!
//! [`CaptureBody`] forwards every frame of the wrapped body unchanged and
//! feeds a copy of the data frames to a [`ResponseCapture`]. When the wrapped
//! body ends, the capture is finalized and the response message is emitted.

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;
use scribe_core::ResponseCapture;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

pin_project! {
    /// Response body that records what it forwards.
    pub struct CaptureBody<B> {
        #[pin]
        inner: B,
        capture: Option<ResponseCapture>,
    }
}

impl<B: Body> CaptureBody<B> {
    /// Wrap `inner`, reporting into `capture`.
    ///
    /// A body that is already at its end finalizes right away, so responses
    /// without a body are logged even if nobody polls them.
    pub fn new(inner: B, capture: ResponseCapture) -> Self {
        let mut capture = Some(capture);
        if inner.is_end_stream() {
            finish(&mut capture);
        }
        Self { inner, capture }
    }
}

impl<B> CaptureBody<B> {
    /// Wrap `inner` without recording anything.
    pub fn passthrough(inner: B) -> Self {
        Self {
            inner,
            capture: None,
        }
    }

    /// Whether a response message is still pending for this body.
    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    pub fn get_ref(&self) -> &B {
        &self.inner
    }

    pub fn into_inner(self) -> B {
        self.inner
    }
}

fn finish(capture: &mut Option<ResponseCapture>) {
    if let Some(mut capture) = capture.take() {
        capture.finalize(None);
    }
}

impl<B> Body for CaptureBody<B>
where
    B: Body<Data = Bytes>,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let mut this = self.project();
        let frame = ready!(this.inner.as_mut().poll_frame(cx));

        match &frame {
            Some(Ok(frame)) => {
                if let Some(capture) = this.capture.as_mut() {
                    if let Some(data) = frame.data_ref() {
                        capture.write_bytes(data.clone());
                    }
                }
                if this.inner.is_end_stream() {
                    finish(this.capture);
                }
            }
            Some(Err(_)) => {
                if this.capture.take().is_some() {
                    tracing::warn!("response body stream failed; response not logged");
                }
            }
            None => finish(this.capture),
        }

        Poll::Ready(frame)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
