use std::fmt::Display;

use crate::codec::ResponseEncoder;
use crate::protocol::{BodyFraming, Message, PayloadItem, Response, ResponseHead, SendError, StatusTable};
use bytes::{Buf, BytesMut};
use futures::StreamExt;
use futures::channel::mpsc;
use http::Method;
use http_body::Body;
use http_body_util::BodyExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;
use tracing::{debug, trace, warn};

/// A response waiting in the write queue, framing already resolved.
#[derive(Debug)]
pub(crate) struct OutgoingMessage<B> {
    head: ResponseHead,
    framing: BodyFraming,
    body: Option<B>,
    last: bool,
}

impl<B> OutgoingMessage<B> {
    pub(crate) fn interim(method: &Method, head: ResponseHead) -> Self {
        let framing = BodyFraming::resolve(method, head.status(), false);
        Self { head, framing, body: None, last: false }
    }

    pub(crate) fn last(method: &Method, response: Response<B>) -> Self {
        let (head, body) = response.into_parts();
        let framing = BodyFraming::resolve(method, head.status(), body.is_some());
        Self { head, framing, body, last: true }
    }

    #[inline]
    pub(crate) fn is_last(&self) -> bool {
        self.last
    }
}

/// Single writer of a connection: encodes responses into a buffer and writes them out one
/// complete message at a time.
#[derive(Debug)]
pub(crate) struct MessageWriter<W, T> {
    writer: W,
    buffer: BytesMut,
    encoder: ResponseEncoder<T>,
}

impl<W, T> MessageWriter<W, T>
where
    W: AsyncWrite + Unpin,
    T: StatusTable,
{
    pub fn with_capacity(writer: W, reasons: T, buffer_size: usize) -> Self {
        Self { writer, buffer: BytesMut::with_capacity(buffer_size), encoder: ResponseEncoder::with_status_table(reasons) }
    }

    #[inline]
    pub fn write<D>(&mut self, item: Message<(ResponseHead, BodyFraming), D>) -> Result<(), SendError>
    where
        D: Buf,
    {
        self.encoder.encode(item, &mut self.buffer)
    }

    #[inline]
    pub async fn flush(&mut self) -> Result<(), SendError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        self.writer.write_all_buf(&mut self.buffer).await?;
        Ok(self.writer.flush().await?)
    }

    /// Writes one complete response. Returns once every byte of it has been flushed.
    pub async fn send<B>(&mut self, message: OutgoingMessage<B>) -> Result<(), SendError>
    where
        B: Body + Unpin,
        B::Error: Display,
    {
        let OutgoingMessage { head, framing, body, .. } = message;
        debug!(status = head.status().as_u16(), ?framing, "write response head");
        self.write(Message::<_, B::Data>::Header((head, framing)))?;

        if !framing.is_chunked() {
            if body.is_some() {
                trace!(?framing, "framing allows no body, discard it");
            }
            return self.flush().await;
        }

        let Some(mut body) = body else {
            self.write(Message::Payload(PayloadItem::<B::Data>::Eof))?;
            return self.flush().await;
        };

        loop {
            match body.frame().await {
                Some(Ok(frame)) => match frame.into_data() {
                    Ok(data) => {
                        self.write(Message::Payload(PayloadItem::Chunk(data)))?;
                        self.flush().await?;
                    }
                    Err(_frame) => warn!("skip non-data body frame, trailers are not supported"),
                },
                Some(Err(e)) => return Err(SendError::invalid_body(format!("resolve response body error: {e}"))),
                None => {
                    self.write(Message::Payload(PayloadItem::<B::Data>::Eof))?;
                    return self.flush().await;
                }
            }
        }
    }

    /// Writes queued messages in order until the last one is written or the queue closes.
    ///
    /// Returns `true` if the last message was written.
    pub async fn drain<B>(&mut self, mut queue: mpsc::UnboundedReceiver<OutgoingMessage<B>>) -> Result<bool, SendError>
    where
        B: Body + Unpin,
        B::Error: Display,
    {
        while let Some(message) = queue.next().await {
            let last = message.is_last();
            self.send(message).await?;
            if last {
                return Ok(true);
            }
        }

        Ok(false)
    }

    pub async fn shutdown(&mut self) -> Result<(), SendError> {
        Ok(self.writer.shutdown().await?)
    }
}
