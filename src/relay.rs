use std::convert::Infallible;

use anyhow::Error;
use bytes::Bytes;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full, StreamBody};
use hyper::body::Frame;
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

/// Response body used by every handler: either a fully buffered payload or
/// a lazily forwarded chunk sequence.
pub type RelayBody = UnsyncBoxBody<Bytes, Infallible>;

pub fn full<T: Into<Bytes>>(body: T) -> RelayBody {
    Full::new(body.into()).boxed_unsync()
}

pub fn empty() -> RelayBody {
    Full::new(Bytes::new()).boxed_unsync()
}

/// Forwards a chunk sequence to the caller as it arrives, preserving order.
/// A mid-stream error ends the caller-facing body at the last chunk that
/// was delivered; the truncation is logged but not signalled on the wire.
pub fn relay<S>(chunks: S) -> RelayBody
where
    S: Stream<Item = Result<Bytes, Error>> + Send + 'static,
{
    let frames = chunks.map_while(|chunk| match chunk {
        Ok(bytes) => Some(Ok::<_, Infallible>(Frame::data(bytes))),
        Err(e) => {
            warn!("Upstream stream ended early: {e:#}");
            None
        }
    });
    StreamBody::new(frames).boxed_unsync()
}
