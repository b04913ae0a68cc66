//! HTTP header encoder implementation for serializing HTTP response heads
//!
//! This module turns a [`ResponseHead`] and its resolved [`BodyFraming`] into the exact
//! status line and header block of an HTTP/1.1 response. It never writes body bytes.
//!
//! # Wire layout
//!
//! - `HTTP/1.1 {code} {reason}` status line, reason taken from the injected [`StatusTable`]
//! - `Date` header for statuses of 200 and above, interim heads never carry one
//! - the caller's header fields, verbatim and in order
//! - `Content-Length: 0` or `Transfer-Encoding: chunked` depending on the framing
//! - the terminating blank line

use crate::protocol::{BodyFraming, ResponseHead, SendError, StatusTable};

use bytes::{BufMut, BytesMut};

use std::io;
use std::io::Write;
use tokio_util::codec::Encoder;
use tracing::error;

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Encoder for HTTP response heads implementing the [`Encoder`] trait.
///
/// The reason phrase is resolved before anything is written, so an unknown status leaves
/// `dst` untouched.
#[derive(Debug, Clone)]
pub struct HeaderEncoder<T> {
    reasons: T,
}

impl<T: StatusTable> HeaderEncoder<T> {
    pub fn new(reasons: T) -> Self {
        Self { reasons }
    }
}

impl<T: StatusTable> Encoder<(&ResponseHead, BodyFraming)> for HeaderEncoder<T> {
    type Error = SendError;

    /// Encodes the status line and header block into `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::UnknownStatus`] if the status table has no phrase for the status.
    fn encode(&mut self, item: (&ResponseHead, BodyFraming), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (head, framing) = item;
        let status = head.status();

        let Some(reason) = self.reasons.reason(status) else {
            error!(status = status.as_u16(), "no reason phrase for status code");
            return Err(SendError::unknown_status(status));
        };

        dst.reserve(INIT_HEADER_SIZE);
        write!(FastWrite(dst), "HTTP/1.1 {} {}\r\n", status.as_str(), reason)?;

        if status.as_u16() >= 200 {
            let mut date = faf_http_date::get_date_buff_no_key();
            faf_http_date::get_date_no_key(&mut date);
            dst.put_slice(b"Date: ");
            dst.put_slice(&date[..]);
            dst.put_slice(b"\r\n");
        }

        for (name, value) in head.headers() {
            dst.put_slice(name.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }

        match framing {
            BodyFraming::Empty => dst.put_slice(b"Content-Length: 0\r\n"),
            BodyFraming::Chunked => dst.put_slice(b"Transfer-Encoding: chunked\r\n"),
            BodyFraming::Suppressed => {}
        }

        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Fast writer implementation for writing to BytesMut.
///
/// Skips the bounds checking of the generic writer, space is reserved up front.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
