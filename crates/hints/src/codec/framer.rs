use bytes::{Bytes, BytesMut};
use http::Method;
use tokio_util::codec::Encoder;

use crate::codec::header::HeaderEncoder;
use crate::protocol::{BodyFraming, Response, SendError, StatusTable};

/// Frames the status line and header block of `response` as an answer to `method`.
///
/// Returns the encoded head together with the framing that was applied. Only
/// [`BodyFraming::Chunked`] means body bytes must follow, encoded with
/// [`ChunkedEncoder`](crate::codec::ChunkedEncoder). No I/O is performed.
///
/// ```
/// use http::{Method, StatusCode};
/// use micro_hints::codec::frame;
/// use micro_hints::protocol::{early_hints, BodyFraming, Response, StandardReasons};
///
/// let hints = Response::<()>::empty(early_hints(["/style.css"]));
/// let (head, framing) = frame(&Method::GET, &hints, StandardReasons).unwrap();
///
/// assert_eq!(&head[..], b"HTTP/1.1 103 Early Hints\r\nLink: </style.css>; rel=preload\r\n\r\n");
/// assert_eq!(framing, BodyFraming::Suppressed);
/// ```
pub fn frame<B, T: StatusTable>(method: &Method, response: &Response<B>, reasons: T) -> Result<(Bytes, BodyFraming), SendError> {
    let head = response.head();
    let framing = BodyFraming::resolve(method, head.status(), response.body().is_some());

    let mut dst = BytesMut::new();
    HeaderEncoder::new(reasons).encode((head, framing), &mut dst)?;
    Ok((dst.freeze(), framing))
}
