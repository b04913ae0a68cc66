use std::convert::Infallible;
use std::fmt::Display;
use std::pin::pin;

use futures::channel::mpsc;
use futures::future::{self, Either};
use futures::{Stream, StreamExt, stream};
use http::{Method, Request};
use http_body::Body;
use tokio::io::AsyncWrite;
use tracing::{debug, error, info};

use crate::connection::message_writer::{MessageWriter, OutgoingMessage};
use crate::ensure;
use crate::handler::{Exchange, Handler};
use crate::protocol::{BoxError, HttpError, StandardReasons, StatusTable, Step};

/// Default capacity of the write buffer
const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// Writes the responses of one request onto a raw connection, then closes it.
///
/// The sequencer owns the connection: interim responses and the final response go out in
/// the order the handler produced them, each one fully flushed before the next starts, and
/// the connection is shut down once after the last byte (or after the first failure).
/// Consuming `self` guarantees that nothing is written after the close.
///
/// Dropping the returned future drops the connection and abandons whatever was queued.
///
/// # Type Parameters
///
/// * `W`: the connection, already taken over from the server
/// * `T`: the reason phrase table used for status lines
#[derive(Debug)]
pub struct ResponseSequencer<W, T = StandardReasons> {
    writer: MessageWriter<W, T>,
}

impl<W> ResponseSequencer<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(connection: W) -> Self {
        Self::with_status_table(connection, StandardReasons)
    }
}

impl<W, T> ResponseSequencer<W, T>
where
    W: AsyncWrite + Unpin,
    T: StatusTable,
{
    pub fn with_status_table(connection: W, reasons: T) -> Self {
        Self::with_capacity(connection, reasons, DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(connection: W, reasons: T, buffer_size: usize) -> Self {
        Self { writer: MessageWriter::with_capacity(connection, reasons, buffer_size) }
    }

    /// Runs `handler` on `request` and writes everything it responds with.
    pub async fn process<H, ReqBody>(self, request: Request<ReqBody>, handler: &H) -> Result<(), HttpError>
    where
        H: Handler<ReqBody>,
        H::RespBody: Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        let method = request.method().clone();
        let exchange = Exchange::start(handler, request);
        self.drive(&method, exchange).await
    }

    /// Writes responses produced by a plain iterator, see [`drive`](Self::drive).
    pub async fn drive_iter<I, B>(self, method: &Method, steps: I) -> Result<(), HttpError>
    where
        I: IntoIterator<Item = Step<B>>,
        B: Body + Unpin,
        B::Error: Display,
    {
        self.drive(method, stream::iter(steps.into_iter().map(Ok::<_, Infallible>))).await
    }

    /// Pulls steps from `steps` and writes them as responses to a `method` request.
    ///
    /// The stream is polled while earlier responses are still being written; only the writes
    /// are serialized. Polling stops at the first [`Step::Final`].
    ///
    /// # Errors
    ///
    /// - [`HttpError::ContractViolation`] if an interim step is not 1xx or the stream ends
    ///   without a final step
    /// - [`HttpError::HandlerFailure`] if the stream yields an error
    /// - [`HttpError::ResponseError`] if a response cannot be framed, its body fails, or the
    ///   connection fails
    ///
    /// Responses queued before a handler failure are still written. The connection is
    /// closed in every case.
    pub async fn drive<S, B, E>(mut self, method: &Method, steps: S) -> Result<(), HttpError>
    where
        S: Stream<Item = Result<Step<B>, E>>,
        E: Into<BoxError>,
        B: Body + Unpin,
        B::Error: Display,
    {
        let (queue, pending) = mpsc::unbounded();

        let outcome = {
            let producing = pin!(produce(method, steps, queue));
            let writing = pin!(self.writer.drain(pending));

            match future::select(producing, writing).await {
                Either::Left((produced, writing)) => {
                    // whatever was queued is complete, let it go out before closing
                    let written = writing.await;
                    produced.and(written.map(drop).map_err(HttpError::from))
                }
                Either::Right((written, producing)) => match written {
                    Ok(_) => producing.await,
                    Err(e) => Err(e.into()),
                },
            }
        };

        let closed = self.writer.shutdown().await;
        match outcome {
            Ok(()) => match closed {
                Ok(()) => {
                    info!(method = %method, "responses finished, connection closed");
                    Ok(())
                }
                Err(e) => {
                    error!(cause = %e, "failed to close connection");
                    Err(e.into())
                }
            },
            Err(e) => {
                error!(method = %method, cause = %e, "responses aborted, connection closed");
                if let Err(close_error) = closed {
                    debug!(cause = %close_error, "failed to close connection after abort");
                }
                Err(e)
            }
        }
    }
}

/// Pulls steps and queues them for the writer until the final one.
async fn produce<S, B, E>(method: &Method, steps: S, queue: mpsc::UnboundedSender<OutgoingMessage<B>>) -> Result<(), HttpError>
where
    S: Stream<Item = Result<Step<B>, E>>,
    E: Into<BoxError>,
{
    let mut steps = pin!(steps);

    while let Some(step) = steps.next().await {
        let message = match step.map_err(HttpError::handler)? {
            Step::Interim(head) => {
                ensure!(
                    head.is_interim(),
                    HttpError::contract_violation(format!("interim response with final status {}", head.status()))
                );
                OutgoingMessage::interim(method, head)
            }
            Step::Final(response) => OutgoingMessage::last(method, response),
        };

        let last = message.is_last();
        if queue.unbounded_send(message).is_err() {
            // the writer failed and reports why
            return Ok(());
        }

        if last {
            return Ok(());
        }
    }

    Err(HttpError::contract_violation("handler finished without a final response"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Hints, make_handler};
    use crate::protocol::{Response, ResponseHead, SendError, early_hints};
    use bytes::Bytes;
    use http::StatusCode;
    use http_body::Frame;
    use http_body_util::{Full, StreamBody};
    use std::collections::HashMap;
    use std::io;
    use std::pin::Pin;
    use std::sync::{Arc, Mutex};
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, duplex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        Write(Vec<u8>),
        Flush,
        Shutdown,
    }

    /// connection that records every operation and can fail writes on demand
    #[derive(Debug, Clone, Default)]
    struct RecordingConnection {
        ops: Arc<Mutex<Vec<Op>>>,
        fail_writes: bool,
    }

    impl RecordingConnection {
        fn failing() -> Self {
            Self { fail_writes: true, ..Default::default() }
        }

        fn ops(&self) -> Vec<Op> {
            self.ops.lock().unwrap().clone()
        }

        /// written bytes with the `Date` lines dropped
        fn wire(&self) -> String {
            let bytes: Vec<u8> = self
                .ops()
                .into_iter()
                .filter_map(|op| match op {
                    Op::Write(bytes) => Some(bytes),
                    _ => None,
                })
                .flatten()
                .collect();
            String::from_utf8(bytes).unwrap().split_inclusive("\r\n").filter(|line| !line.starts_with("Date: ")).collect()
        }
    }

    impl AsyncWrite for RecordingConnection {
        fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<Result<usize, io::Error>> {
            if self.fail_writes {
                return Poll::Ready(Err(io::Error::from(io::ErrorKind::ConnectionReset)));
            }
            self.ops.lock().unwrap().push(Op::Write(buf.to_vec()));
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
            self.ops.lock().unwrap().push(Op::Flush);
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
            self.ops.lock().unwrap().push(Op::Shutdown);
            Poll::Ready(Ok(()))
        }
    }

    fn ok(body: &'static str) -> Response<Full<Bytes>> {
        Response::with_body(ResponseHead::new(StatusCode::OK), Full::new(Bytes::from_static(body.as_bytes())))
    }

    #[tokio::test]
    async fn early_hints_then_final_over_duplex() {
        let (mut client, server) = duplex(64 * 1024);
        let steps = vec![Step::Interim(early_hints(["/style.css"])), Step::Final(ok("hello"))];

        ResponseSequencer::new(server).drive_iter(&Method::GET, steps).await.unwrap();

        let mut received = String::new();
        client.read_to_string(&mut received).await.unwrap();

        let (hints, last) = received.split_at(received.find("HTTP/1.1 200").unwrap());
        assert_eq!(hints, "HTTP/1.1 103 Early Hints\r\nLink: </style.css>; rel=preload\r\n\r\n");

        let lines: Vec<&str> = last.split("\r\n").collect();
        assert_eq!(lines[0], "HTTP/1.1 200 OK");
        assert!(lines[1].starts_with("Date: "));
        assert_eq!(&lines[2..], ["Transfer-Encoding: chunked", "", "5", "hello", "0", "", ""]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_request_closes_connection() {
        let (mut client, server) = duplex(64 * 1024);
        let handler = make_handler(|_req: Request<()>, hints: Hints| async move {
            hints.early_hints(["/a.css"])?;
            futures::future::pending::<()>().await;
            Ok::<_, SendError>(ok("never"))
        });

        let processing = ResponseSequencer::new(server).process(Request::new(()), &handler);
        assert!(tokio::time::timeout(Duration::from_millis(50), processing).await.is_err());

        let mut received = String::new();
        client.read_to_string(&mut received).await.unwrap();
        assert_eq!(received, "HTTP/1.1 103 Early Hints\r\nLink: </a.css>; rel=preload\r\n\r\n");
    }

    #[tokio::test]
    async fn framing_for_every_status_and_method() {
        let methods = [Method::GET, Method::POST, Method::HEAD, Method::DELETE, Method::PUT];

        for code in 200..=599 {
            let status = StatusCode::from_u16(code).unwrap();
            let Some(reason) = StandardReasons.reason(status) else {
                continue;
            };

            for method in &methods {
                for with_body in [true, false] {
                    let connection = RecordingConnection::default();
                    let head = ResponseHead::new(status);
                    let response = if with_body {
                        Response::with_body(head, Full::new(Bytes::from_static(b"hello")))
                    } else {
                        Response::empty(head)
                    };

                    ResponseSequencer::new(connection.clone()).drive_iter(method, [Step::Final(response)]).await.unwrap();

                    let tail = match code {
                        205 | 304 => "Content-Length: 0\r\n\r\n",
                        204 => "\r\n",
                        _ if *method == Method::HEAD => "\r\n",
                        _ if !with_body => "Content-Length: 0\r\n\r\n",
                        _ => "Transfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n",
                    };
                    assert_eq!(connection.wire(), format!("HTTP/1.1 {code} {reason}\r\n{tail}"), "{method} {code} body={with_body}");
                    assert_eq!(connection.ops().last(), Some(&Op::Shutdown));
                }
            }
        }
    }

    #[tokio::test]
    async fn messages_are_written_in_production_order() {
        let connection = RecordingConnection::default();
        let steps = vec![
            Step::Interim(early_hints(["/a.css"])),
            Step::Interim(early_hints(["/b.js"])),
            Step::Final(ok("hello")),
        ];

        ResponseSequencer::new(connection.clone()).drive_iter(&Method::GET, steps).await.unwrap();

        assert_eq!(
            connection.wire(),
            concat!(
                "HTTP/1.1 103 Early Hints\r\nLink: </a.css>; rel=preload\r\n\r\n",
                "HTTP/1.1 103 Early Hints\r\nLink: </b.js>; rel=preload\r\n\r\n",
                "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n",
            )
        );

        // every message is flushed before the next one is written, close comes last
        let ops = connection.ops();
        let kinds: Vec<&str> = ops
            .iter()
            .map(|op| match op {
                Op::Write(_) => "write",
                Op::Flush => "flush",
                Op::Shutdown => "shutdown",
            })
            .collect();
        assert_eq!(kinds, ["write", "flush", "write", "flush", "write", "flush", "write", "flush", "shutdown"]);
    }

    #[tokio::test]
    async fn handler_keeps_running_while_writing() {
        let connection = RecordingConnection::default();
        let handler = make_handler(|_req: Request<()>, hints: Hints| async move {
            hints.early_hints(["/style.css"])?;
            for _ in 0..3 {
                tokio::task::yield_now().await;
            }
            hints.send(ResponseHead::new(StatusCode::from_u16(103).unwrap()).with_header("Link", "</app.js>; rel=preload"))?;
            Ok::<_, SendError>(ok("hello"))
        });

        let request = Request::builder().method(Method::GET).uri("/").body(()).unwrap();
        ResponseSequencer::new(connection.clone()).process(request, &handler).await.unwrap();

        assert_eq!(
            connection.wire(),
            concat!(
                "HTTP/1.1 103 Early Hints\r\nLink: </style.css>; rel=preload\r\n\r\n",
                "HTTP/1.1 103 Early Hints\r\nLink: </app.js>; rel=preload\r\n\r\n",
                "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n",
            )
        );
        assert_eq!(connection.ops().last(), Some(&Op::Shutdown));
    }

    #[tokio::test]
    async fn head_request_gets_no_body() {
        let connection = RecordingConnection::default();
        let handler = make_handler(|_req: Request<()>, hints: Hints| async move {
            hints.early_hints(["/style.css"])?;
            Ok::<_, SendError>(ok("hello"))
        });

        let request = Request::builder().method(Method::HEAD).body(()).unwrap();
        ResponseSequencer::new(connection.clone()).process(request, &handler).await.unwrap();

        assert_eq!(connection.wire(), "HTTP/1.1 103 Early Hints\r\nLink: </style.css>; rel=preload\r\n\r\nHTTP/1.1 200 OK\r\n\r\n");
    }

    #[tokio::test]
    async fn streamed_body_chunks_are_kept_apart() {
        let connection = RecordingConnection::default();
        let chunks = futures::stream::iter(vec![
            Ok::<_, Infallible>(Frame::data(Bytes::from_static(b"<html>"))),
            Ok(Frame::data(Bytes::from_static(b"</html>"))),
        ]);
        let response = Response::with_body(ResponseHead::new(StatusCode::OK).with_header("Content-Type", "text/html"), StreamBody::new(chunks));

        ResponseSequencer::new(connection.clone()).drive_iter(&Method::GET, [Step::Final(response)]).await.unwrap();

        assert_eq!(
            connection.wire(),
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nTransfer-Encoding: chunked\r\n\r\n6\r\n<html>\r\n7\r\n</html>\r\n0\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn no_steps_is_a_contract_violation() {
        let connection = RecordingConnection::default();
        let result = ResponseSequencer::new(connection.clone()).drive_iter(&Method::GET, Vec::<Step<Full<Bytes>>>::new()).await;

        assert!(matches!(result, Err(HttpError::ContractViolation { .. })));
        assert_eq!(connection.ops(), [Op::Shutdown]);
    }

    #[tokio::test]
    async fn only_interim_steps_is_a_contract_violation() {
        let connection = RecordingConnection::default();
        let steps = vec![Step::<Full<Bytes>>::Interim(early_hints(["/a.css"]))];
        let result = ResponseSequencer::new(connection.clone()).drive_iter(&Method::GET, steps).await;

        assert!(matches!(result, Err(HttpError::ContractViolation { .. })));
        // the complete interim response still went out before the close
        assert_eq!(connection.wire(), "HTTP/1.1 103 Early Hints\r\nLink: </a.css>; rel=preload\r\n\r\n");
        assert_eq!(connection.ops().last(), Some(&Op::Shutdown));
    }

    #[tokio::test]
    async fn interim_with_final_status_is_a_contract_violation() {
        let connection = RecordingConnection::default();
        let steps = vec![Step::Interim(ResponseHead::new(StatusCode::OK)), Step::Final(ok("never"))];
        let result = ResponseSequencer::new(connection.clone()).drive_iter(&Method::GET, steps).await;

        assert!(matches!(result, Err(HttpError::ContractViolation { .. })));
        assert_eq!(connection.ops(), [Op::Shutdown]);
    }

    #[tokio::test]
    async fn handler_failure_closes_connection() {
        let connection = RecordingConnection::default();
        let handler = make_handler(|_req: Request<()>, hints: Hints| async move {
            hints.early_hints(["/style.css"])?;
            Err::<Response<Full<Bytes>>, BoxError>("database down".into())
        });

        let result = ResponseSequencer::new(connection.clone()).process(Request::new(()), &handler).await;

        assert!(matches!(result, Err(HttpError::HandlerFailure { .. })));
        assert_eq!(connection.wire(), "HTTP/1.1 103 Early Hints\r\nLink: </style.css>; rel=preload\r\n\r\n");
        assert_eq!(connection.ops().last(), Some(&Op::Shutdown));
    }

    #[tokio::test]
    async fn unknown_status_aborts() {
        let connection = RecordingConnection::default();
        let reasons = HashMap::from([(103, "Early Hints".to_string())]);
        let steps = vec![Step::Interim(early_hints(["/a.css"])), Step::Final(ok("hello"))];

        let result = ResponseSequencer::with_status_table(connection.clone(), reasons).drive_iter(&Method::GET, steps).await;

        assert!(matches!(result, Err(HttpError::ResponseError { source: SendError::UnknownStatus { status: 200 } })));
        assert_eq!(connection.wire(), "HTTP/1.1 103 Early Hints\r\nLink: </a.css>; rel=preload\r\n\r\n");
        assert_eq!(connection.ops().last(), Some(&Op::Shutdown));
    }

    #[tokio::test]
    async fn write_failure_is_propagated() {
        let connection = RecordingConnection::failing();
        let steps = vec![Step::Interim(early_hints(["/a.css"])), Step::Final(ok("hello"))];

        let result = ResponseSequencer::new(connection.clone()).drive_iter(&Method::GET, steps).await;

        assert!(result.as_ref().is_err_and(HttpError::is_io));
        assert_eq!(connection.ops(), [Op::Shutdown]);
    }

    #[tokio::test]
    async fn write_failure_stops_a_waiting_handler() {
        let connection = RecordingConnection::failing();
        let handler = make_handler(|_req: Request<()>, hints: Hints| async move {
            hints.early_hints(["/a.css"])?;
            futures::future::pending::<()>().await;
            Ok::<_, SendError>(ok("never"))
        });

        let result = ResponseSequencer::new(connection.clone()).process(Request::new(()), &handler).await;

        assert!(result.as_ref().is_err_and(HttpError::is_io));
    }
}
