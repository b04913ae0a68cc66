//! HTTP header encoding for response heads
//!
//! - [`HeaderEncoder`]: encodes the status line and header block of a response
//!   - Looks the reason phrase up in the injected status table
//!   - Adds the `Date` header to final responses
//!   - Emits the length header chosen by the body framing

mod header_encoder;

pub use header_encoder::HeaderEncoder;
