use crate::codec::body::ChunkedEncoder;
use crate::codec::header::HeaderEncoder;
use crate::protocol::{BodyFraming, Message, ResponseHead, SendError, StandardReasons, StatusTable};
use bytes::{Buf, BytesMut};
use std::io;
use std::io::ErrorKind;
use tokio_util::codec::Encoder;
use tracing::error;

/// Encodes a sequence of responses onto one byte stream.
///
/// Every response is a [`Message::Header`] followed, for chunked framing only, by its
/// payload items up to and including [`PayloadItem::Eof`](crate::protocol::PayloadItem::Eof).
/// A head arriving while a chunked body is still open is rejected, so two messages can
/// never interleave on the wire.
#[derive(Debug)]
pub struct ResponseEncoder<T = StandardReasons> {
    header_encoder: HeaderEncoder<T>,
    payload_encoder: Option<ChunkedEncoder>,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Default for ResponseEncoder {
    fn default() -> Self {
        Self::with_status_table(StandardReasons)
    }
}

impl<T: StatusTable> ResponseEncoder<T> {
    pub fn with_status_table(reasons: T) -> Self {
        Self { header_encoder: HeaderEncoder::new(reasons), payload_encoder: None }
    }

    /// Returns true if a chunked body is still waiting for its terminator
    #[inline]
    pub fn is_in_body(&self) -> bool {
        self.payload_encoder.is_some()
    }
}

impl<T: StatusTable, D: Buf> Encoder<Message<(ResponseHead, BodyFraming), D>> for ResponseEncoder<T> {
    type Error = SendError;

    fn encode(&mut self, item: Message<(ResponseHead, BodyFraming), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Header((head, framing)) => {
                if self.payload_encoder.is_some() {
                    error!("expect payload item but receive response head");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                }

                self.header_encoder.encode((&head, framing), dst)?;
                if framing.is_chunked() {
                    self.payload_encoder = Some(ChunkedEncoder::new());
                }
                Ok(())
            }

            Message::Payload(payload_item) => {
                let payload_encoder = if let Some(encoder) = &mut self.payload_encoder {
                    encoder
                } else {
                    error!("expect response head but receive payload item");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                };

                let result = payload_encoder.encode(payload_item, dst);

                if payload_encoder.is_finish() {
                    self.payload_encoder.take();
                }

                result
            }
        }
    }
}
