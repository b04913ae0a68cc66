use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use http::{Request, StatusCode};
use http_body_util::Full;
use micro_hints::connection::ResponseSequencer;
use micro_hints::handler::{Handler, Hints};
use micro_hints::protocol::{BoxError, Response, ResponseHead};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const MAX_HEADER_SIZE: usize = 8 * 1024;
const MAX_HEADER_NUM: usize = 64;

const INDEX_HTML: &str = r#"<!DOCTYPE html><html><head><link rel="stylesheet" href="/style.css"></head><body>hello world</body></html>"#;
const STYLE_CSS: &str = "body{border: 1px solid black;}";

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!(port = 8080, "start listening");
    let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
        Ok(tcp_listener) => tcp_listener,
        Err(e) => {
            error!(cause = %e, "bind server error");
            return;
        }
    };

    let handler = Arc::new(SiteHandler);
    loop {
        let (tcp_stream, _remote_addr) = match tcp_listener.accept().await {
            Ok(stream_and_addr) => stream_and_addr,
            Err(e) => {
                warn!(cause = %e, "failed to accept");
                continue;
            }
        };

        let handler = handler.clone();

        tokio::spawn(async move {
            if let Err(e) = serve(tcp_stream, handler.as_ref()).await {
                error!(cause = %e, "connection shutdown with error");
            }
        });
    }
}

/// Reads one request head, then hands the connection over to the sequencer.
async fn serve(mut tcp_stream: TcpStream, handler: &SiteHandler) -> Result<(), BoxError> {
    let Some(request) = read_request_head(&mut tcp_stream).await? else {
        info!("connection closed before a request arrived");
        return Ok(());
    };

    info!(method = %request.method(), path = request.uri().path(), "receive request");
    ResponseSequencer::new(tcp_stream).process(request, handler).await?;
    Ok(())
}

async fn read_request_head(tcp_stream: &mut TcpStream) -> Result<Option<Request<()>>, BoxError> {
    let mut buf = BytesMut::with_capacity(MAX_HEADER_SIZE);

    loop {
        if tcp_stream.read_buf(&mut buf).await? == 0 {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut parsed = httparse::Request::new(&mut headers);
        match parsed.parse(&buf)? {
            httparse::Status::Complete(_) => {
                let mut builder = Request::builder().method(parsed.method.unwrap_or("GET")).uri(parsed.path.unwrap_or("/"));
                for header in parsed.headers.iter() {
                    builder = builder.header(header.name, header.value);
                }
                return Ok(Some(builder.body(())?));
            }
            httparse::Status::Partial if buf.len() >= MAX_HEADER_SIZE => {
                return Err(format!("request head exceeds {MAX_HEADER_SIZE} bytes").into());
            }
            httparse::Status::Partial => {}
        }
    }
}

struct SiteHandler;

#[async_trait]
impl Handler<()> for SiteHandler {
    type RespBody = Full<Bytes>;
    type Error = BoxError;

    async fn call(&self, request: Request<()>, hints: Hints) -> Result<Response<Self::RespBody>, Self::Error> {
        match request.uri().path() {
            "/" => {
                // sends early hints response
                hints.early_hints(["/style.css"])?;

                // some long task
                tokio::time::sleep(Duration::from_secs(1)).await;

                Ok(text(StatusCode::OK, "text/html; charset=utf-8", INDEX_HTML))
            }
            "/style.css" => {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(text(StatusCode::OK, "text/css; charset=utf-8", STYLE_CSS))
            }
            _ => Ok(Response::empty(ResponseHead::new(StatusCode::NOT_FOUND))),
        }
    }
}

fn text(status: StatusCode, content_type: &str, body: &'static str) -> Response<Full<Bytes>> {
    let head = ResponseHead::new(status).with_header("Content-Type", content_type);
    Response::with_body(head, Full::new(Bytes::from_static(body.as_bytes())))
}
