//! HTTP body encoding for response payloads
//!
//! Bodies are always streamed with chunked transfer encoding, the total length of a body is
//! never computed up front.
//!
//! - [`ChunkedEncoder`]: encodes payload items as chunks followed by the terminating chunk

mod chunked_encoder;

pub use chunked_encoder::ChunkedEncoder;
