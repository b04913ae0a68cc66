use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BytesMut};
use std::io::Write;

use tokio_util::codec::Encoder;
use tracing::trace;

/// Encodes a body as `Transfer-Encoding: chunked`.
///
/// Each chunk becomes `{len:x}\r\n{bytes}\r\n` and [`PayloadItem::Eof`] becomes the
/// `0\r\n\r\n` terminator. A zero-length chunk from the body is skipped: written out it would
/// read as the terminator and end the body early on the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedEncoder {
    eof: bool,
    send_size: usize,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self { eof: false, send_size: 0 }
    }

    /// Returns true once the terminator has been written
    #[inline]
    pub fn is_finish(&self) -> bool {
        self.eof
    }

    /// Number of body bytes encoded so far, framing excluded
    #[inline]
    pub fn send_size(&self) -> usize {
        self.send_size
    }
}

impl Default for ChunkedEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for ChunkedEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.eof {
            return Ok(());
        }

        match item {
            PayloadItem::Chunk(mut bytes) => {
                let size = bytes.remaining();
                if size == 0 {
                    trace!("skip zero length chunk");
                    return Ok(());
                }

                write!(helper::Writer(dst), "{size:x}\r\n")?;
                dst.reserve(size + 2);
                while bytes.has_remaining() {
                    let chunk = bytes.chunk();
                    let len = chunk.len();
                    dst.extend_from_slice(chunk);
                    bytes.advance(len);
                }
                dst.extend_from_slice(b"\r\n");
                self.send_size += size;
                Ok(())
            }
            PayloadItem::Eof => {
                self.eof = true;
                dst.extend_from_slice(b"0\r\n\r\n");
                Ok(())
            }
        }
    }
}

mod helper {
    use bytes::{BufMut, BytesMut};
    use std::io;

    pub struct Writer<'a>(pub &'a mut BytesMut);

    impl io::Write for Writer<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.put_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{Buf, Bytes};

    fn encode_all(chunks: &[&'static [u8]]) -> (ChunkedEncoder, BytesMut) {
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();
        for chunk in chunks {
            encoder.encode(PayloadItem::Chunk(Bytes::from_static(chunk)), &mut dst).unwrap();
        }
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();
        (encoder, dst)
    }

    #[test]
    fn test_single_chunk() {
        let (encoder, dst) = encode_all(&[b"hello"]);
        assert_eq!(&dst[..], b"5\r\nhello\r\n0\r\n\r\n");
        assert!(encoder.is_finish());
        assert_eq!(encoder.send_size(), 5);
    }

    #[test]
    fn test_lowercase_hex_size() {
        let body = [b'a'; 26];
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();
        encoder.encode(PayloadItem::Chunk(&body[..]), &mut dst).unwrap();

        assert!(dst.starts_with(b"1a\r\n"));
        assert!(dst.ends_with(b"aaaa\r\n"));
    }

    #[test]
    fn test_empty_body_is_only_terminator() {
        let (_, dst) = encode_all(&[]);
        assert_eq!(&dst[..], b"0\r\n\r\n");
    }

    #[test]
    fn test_zero_length_chunk_does_not_terminate() {
        let (_, dst) = encode_all(&[b"ab", b"", b"cd"]);
        assert_eq!(&dst[..], b"2\r\nab\r\n2\r\ncd\r\n0\r\n\r\n");
    }

    #[test]
    fn test_nothing_after_eof() {
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"late")), &mut dst).unwrap();
        encoder.encode(PayloadItem::<Bytes>::Eof, &mut dst).unwrap();

        assert_eq!(&dst[..], b"0\r\n\r\n");
    }

    #[test]
    fn test_non_contiguous_buf() {
        let data = Bytes::from_static(b"hel").chain(Bytes::from_static(b"lo"));
        let mut encoder = ChunkedEncoder::new();
        let mut dst = BytesMut::new();
        encoder.encode(PayloadItem::Chunk(data), &mut dst).unwrap();

        assert_eq!(&dst[..], b"5\r\nhello\r\n");
    }
}
