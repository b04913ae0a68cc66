//! HTTP codec module for encoding HTTP/1.1 responses
//!
//! Responses are encoded in two parts: the head (status line and header block) and, when the
//! body framing calls for it, a chunked body. Both parts write into a `BytesMut` through the
//! [`Encoder`](tokio_util::codec::Encoder) trait and never touch the connection.
//!
//! # Components
//!
//! - [`frame`]: frames a single response head for a request method
//! - [`HeaderEncoder`]: status line, `Date`, caller headers and the length header
//! - [`ChunkedEncoder`]: chunked transfer encoding of a body
//! - [`ResponseEncoder`]: interim and final responses back to back on one stream
//!
//! # Example
//!
//! ```
//! use bytes::{Bytes, BytesMut};
//! use http::StatusCode;
//! use micro_hints::codec::ResponseEncoder;
//! use micro_hints::protocol::{BodyFraming, Message, PayloadItem, ResponseHead};
//! use tokio_util::codec::Encoder;
//!
//! let mut encoder = ResponseEncoder::new();
//! let mut buffer = BytesMut::new();
//!
//! let head = ResponseHead::new(StatusCode::OK);
//! encoder.encode(Message::<_, Bytes>::Header((head, BodyFraming::Chunked)), &mut buffer).unwrap();
//! encoder.encode(Message::Payload(PayloadItem::Chunk(Bytes::from_static(b"hello"))), &mut buffer).unwrap();
//! encoder.encode(Message::Payload(PayloadItem::<Bytes>::Eof), &mut buffer).unwrap();
//!
//! assert!(buffer.ends_with(b"5\r\nhello\r\n0\r\n\r\n"));
//! ```

mod body;
mod framer;
mod header;
mod response_encoder;

pub use body::ChunkedEncoder;
pub use framer::frame;
pub use header::HeaderEncoder;
pub use response_encoder::ResponseEncoder;
