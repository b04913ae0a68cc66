//! Interim HTTP/1.1 responses on a taken-over connection
//!
//! This crate lets a request handler send any number of interim responses, such as
//! `103 Early Hints`, before its final response. The surrounding server hands the raw
//! connection over (typically after a protocol upgrade), and the crate takes care of
//! HTTP/1.1 framing, chunked body streaming, write ordering and closing the connection.
//!
//! # Features
//!
//! - Interim (1xx) responses followed by exactly one final response
//! - Exact HTTP/1.1 body rules for 1xx, 204, 205, 304 and `HEAD`
//! - Streaming bodies with chunked transfer encoding
//! - Handlers keep running while earlier responses are being written
//! - Injected reason phrase table, no global state
//!
//! # Example
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::{Request, StatusCode};
//! use http_body_util::Full;
//! use micro_hints::connection::ResponseSequencer;
//! use micro_hints::handler::{make_handler, Hints};
//! use micro_hints::protocol::{Response, ResponseHead};
//! use std::error::Error;
//! use std::time::Duration;
//! use tokio::net::TcpListener;
//! use tracing::{error, info};
//!
//! async fn index(_request: Request<()>, hints: Hints) -> Result<Response<Full<Bytes>>, Box<dyn Error + Send + Sync>> {
//!     // the client can start fetching the stylesheet right away
//!     hints.early_hints(["/style.css"])?;
//!
//!     tokio::time::sleep(Duration::from_secs(1)).await;
//!
//!     let head = ResponseHead::new(StatusCode::OK).with_header("Content-Type", "text/html");
//!     Ok(Response::with_body(head, Full::new(Bytes::from_static(b"<!DOCTYPE html><html><body>hello world</body></html>"))))
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let handler = make_handler(index);
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!
//!     let (tcp_stream, _remote_addr) = listener.accept().await.unwrap();
//!     // read the request head from `tcp_stream` first, then:
//!     let request = Request::builder().uri("/").body(()).unwrap();
//!
//!     match ResponseSequencer::new(tcp_stream).process(request, &handler).await {
//!         Ok(()) => info!("finished process, connection shutdown"),
//!         Err(e) => error!(cause = %e, "service has error, connection shutdown"),
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: response descriptors, body framing rules, status table and errors
//! - [`codec`]: pure encoding of heads and chunked bodies into buffers
//! - [`connection`]: the [`connection::ResponseSequencer`] writing onto the connection
//! - [`handler`]: handler trait, closure adapter and the [`handler::Hints`] handle
//!
//! Data flows handler → sequencer → codec → connection write → connection close.
//!
//! # Error Handling
//!
//! - [`protocol::HttpError`]: what went wrong with the request as a whole
//! - [`protocol::SendError`]: framing, body and I/O failures while writing
//!
//! Every failure ends the request: the connection is closed and nothing is retried.
//!
//! # Limitations
//!
//! - HTTP/1.1 only, one request per connection
//! - Header names and values are written verbatim, CR/LF injection is not checked
//! - Bodies are always chunked, clients must support chunked transfer encoding

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
