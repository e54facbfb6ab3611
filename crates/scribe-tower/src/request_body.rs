//! Request body handed to the wrapped service.

use bytes::{Bytes, BytesMut};
use http::HeaderMap;
use http_body::{Body, Frame, SizeHint};
use http_body_util::BodyExt;
use pin_project_lite::pin_project;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Boxed error yielded by [`RequestBody`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pin_project! {
    /// Request body seen by the wrapped service.
    ///
    /// Either the original body, untouched, or a replay of the part that was
    /// read up front for logging: the same bytes, then the same trailers or
    /// the same error the original produced. When buffering stopped at the
    /// limit, the replayed prefix is followed by the rest of the original
    /// body as it arrives.
    pub struct RequestBody<B> {
        #[pin]
        inner: B,
        replay: Option<Replay>,
    }
}

#[derive(Debug, Default)]
struct Replay {
    data: Option<Bytes>,
    trailers: Option<HeaderMap>,
    error: Option<BoxError>,
    // The original body continues after the replayed data.
    live: bool,
}

impl Replay {
    fn is_done(&self) -> bool {
        self.data.is_none() && self.trailers.is_none() && self.error.is_none()
    }
}

/// Outcome of [`RequestBody::buffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Buffered {
    /// The whole body (data frames only) fit within the limit.
    Complete(Bytes),
    /// The body passed the limit; only a prefix was read.
    OverLimit,
}

impl<B> RequestBody<B> {
    /// Pass `inner` through as is.
    pub fn streaming(inner: B) -> Self {
        Self {
            inner,
            replay: None,
        }
    }

    /// Whether this body replays buffered content.
    pub fn is_buffered(&self) -> bool {
        self.replay.is_some()
    }
}

impl<B> RequestBody<B>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: Into<BoxError>,
{
    /// Read `inner` to its end, its first error, or until more than `limit`
    /// data bytes have arrived, whichever comes first.
    ///
    /// Returns the replaying body and what was read.
    pub async fn buffer(mut inner: B, limit: usize) -> (Self, Buffered) {
        let mut data = BytesMut::new();
        let mut replay = Replay::default();
        while let Some(frame) = inner.frame().await {
            match frame {
                Ok(frame) => match frame.into_data() {
                    Ok(chunk) => {
                        data.extend_from_slice(&chunk);
                        if data.len() > limit {
                            tracing::debug!(limit, "request body over limit; streaming the rest");
                            replay.live = true;
                            break;
                        }
                    }
                    Err(frame) => {
                        if let Ok(trailers) = frame.into_trailers() {
                            replay.trailers = Some(trailers);
                        }
                    }
                },
                Err(err) => {
                    tracing::debug!("request body failed while buffering; replaying the error");
                    replay.error = Some(err.into());
                    break;
                }
            }
        }
        let data = data.freeze();
        if !data.is_empty() {
            replay.data = Some(data.clone());
        }
        let buffered = if replay.live {
            Buffered::OverLimit
        } else {
            Buffered::Complete(data)
        };
        (
            Self {
                inner,
                replay: Some(replay),
            },
            buffered,
        )
    }
}

impl<B> Body for RequestBody<B>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();
        match this.replay.as_mut() {
            Some(replay) if replay.data.is_some() => {
                Poll::Ready(replay.data.take().map(|data| Ok(Frame::data(data))))
            }
            Some(replay) if replay.error.is_some() => {
                Poll::Ready(replay.error.take().map(Err))
            }
            Some(replay) if !replay.live => {
                Poll::Ready(replay.trailers.take().map(|t| Ok(Frame::trailers(t))))
            }
            _ => this
                .inner
                .poll_frame(cx)
                .map(|frame| frame.map(|result| result.map_err(Into::into))),
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.replay {
            Some(replay) if !replay.live => replay.is_done(),
            Some(replay) => replay.is_done() && self.inner.is_end_stream(),
            None => self.inner.is_end_stream(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.replay {
            Some(replay) if replay.error.is_none() => {
                let len = replay.data.as_ref().map_or(0, Bytes::len) as u64;
                if !replay.live {
                    return SizeHint::with_exact(len);
                }
                let rest = self.inner.size_hint();
                let mut hint = SizeHint::new();
                hint.set_lower(rest.lower() + len);
                if let Some(upper) = rest.upper() {
                    hint.set_upper(upper + len);
                }
                hint
            }
            Some(_) => SizeHint::default(),
            None => self.inner.size_hint(),
        }
    }
}
