use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures::channel::mpsc;
use futures::future::BoxFuture;
use futures::{Stream, StreamExt};
use http::Request;
use pin_project_lite::pin_project;
use tracing::warn;

use crate::handler::Handler;
use crate::protocol::{Response, ResponseHead, SendError, Step, early_hints};

/// Sending side for the interim responses of one request.
///
/// Heads are queued without waiting for the connection, the handler keeps running while
/// earlier responses are still being written. Cloning the handle is fine, all clones feed
/// the same queue.
#[derive(Debug, Clone)]
pub struct Hints {
    sender: mpsc::UnboundedSender<ResponseHead>,
}

impl Hints {
    /// Creates a handle and the receiving side an [`Exchange`] reads from.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ResponseHead>) {
        let (sender, receiver) = mpsc::unbounded();
        (Self { sender }, receiver)
    }

    /// Queues an interim head.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Closed`] once the request is finished or its connection failed.
    pub fn send(&self, head: ResponseHead) -> Result<(), SendError> {
        self.sender.unbounded_send(head).map_err(|_e| {
            warn!("interim response after the exchange is closed, drop it");
            SendError::Closed
        })
    }

    /// Queues a `103 Early Hints` head preloading `paths`, see [`early_hints`].
    pub fn early_hints<I, S>(&self, paths: I) -> Result<(), SendError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.send(early_hints(paths))
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    Running,
    Returned,
    Done,
}

pin_project! {
    /// A running handler call seen as a stream of [`Step`]s.
    ///
    /// Yields every head queued through [`Hints`] as [`Step::Interim`], in the order it was
    /// queued, then the value the call returned as [`Step::Final`] (or its error), then ends.
    /// Heads queued before the call returned always come out before the final response,
    /// anything queued later is dropped.
    pub struct Exchange<F, B, E> {
        #[pin]
        call: F,
        hints: mpsc::UnboundedReceiver<ResponseHead>,
        outcome: Option<Result<Response<B>, E>>,
        state: State,
    }
}

impl<F, B, E> Exchange<F, B, E>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    pub fn new(call: F, hints: mpsc::UnboundedReceiver<ResponseHead>) -> Self {
        Self { call, hints, outcome: None, state: State::Running }
    }
}

impl<'a, B, E> Exchange<BoxFuture<'a, Result<Response<B>, E>>, B, E> {
    /// Starts `handler` on `request`. The call makes progress as the exchange is polled.
    pub fn start<H, ReqBody>(handler: &'a H, request: Request<ReqBody>) -> Self
    where
        H: Handler<ReqBody, RespBody = B, Error = E>,
    {
        let (hints, receiver) = Hints::channel();
        Self::new(handler.call(request, hints), receiver)
    }
}

impl<F, B, E> Stream for Exchange<F, B, E>
where
    F: Future<Output = Result<Response<B>, E>>,
{
    type Item = Result<Step<B>, E>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.state == State::Done {
            return Poll::Ready(None);
        }

        if let Poll::Ready(Some(head)) = this.hints.poll_next_unpin(cx) {
            return Poll::Ready(Some(Ok(Step::Interim(head))));
        }

        if *this.state == State::Running {
            let outcome = ready!(this.call.as_mut().poll(cx));
            *this.outcome = Some(outcome);
            *this.state = State::Returned;

            // heads queued during the last poll of the call
            if let Poll::Ready(Some(head)) = this.hints.poll_next_unpin(cx) {
                return Poll::Ready(Some(Ok(Step::Interim(head))));
            }
        }

        *this.state = State::Done;
        Poll::Ready(this.outcome.take().map(|outcome| outcome.map(Step::Final)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::make_handler;
    use crate::protocol::BoxError;
    use bytes::Bytes;
    use http::StatusCode;
    use http_body_util::Full;

    fn statuses<B, E>(steps: &[Result<Step<B>, E>]) -> Vec<Option<u16>> {
        steps.iter().map(|step| step.as_ref().ok().map(|step| step.head().status().as_u16())).collect()
    }

    #[tokio::test]
    async fn hints_come_before_final() {
        let handler = make_handler(|_req: Request<()>, hints: Hints| async move {
            hints.early_hints(["/a.css"])?;
            tokio::task::yield_now().await;
            hints.early_hints(["/b.js"])?;
            Ok::<_, SendError>(Response::with_body(ResponseHead::new(StatusCode::OK), Full::new(Bytes::from_static(b"hello"))))
        });

        let steps: Vec<_> = Exchange::start(&handler, Request::new(())).collect().await;

        assert_eq!(statuses(&steps), [Some(103), Some(103), Some(200)]);
        assert!(steps[2].as_ref().unwrap().is_final());
        assert_eq!(steps[1].as_ref().unwrap().head().headers()[0].1, "</b.js>; rel=preload");
    }

    #[tokio::test]
    async fn hint_sent_while_returning_is_not_lost() {
        let handler = make_handler(|_req: Request<()>, hints: Hints| async move {
            tokio::task::yield_now().await;
            hints.early_hints(["/late.css"])?;
            Ok::<_, SendError>(Response::<Full<Bytes>>::empty(ResponseHead::new(StatusCode::NO_CONTENT)))
        });

        let steps: Vec<_> = Exchange::start(&handler, Request::new(())).collect().await;

        assert_eq!(statuses(&steps), [Some(103), Some(204)]);
    }

    #[tokio::test]
    async fn handler_error_ends_the_stream() {
        let handler = make_handler(|_req: Request<()>, hints: Hints| async move {
            hints.early_hints(["/a.css"])?;
            Err::<Response<Full<Bytes>>, BoxError>("upstream unavailable".into())
        });

        let steps: Vec<_> = Exchange::start(&handler, Request::new(())).collect().await;

        assert_eq!(statuses(&steps), [Some(103), None]);
        assert_eq!(steps[1].as_ref().unwrap_err().to_string(), "upstream unavailable");
    }

    #[tokio::test]
    async fn hints_outliving_the_exchange_are_closed() {
        let (hints, receiver) = Hints::channel();
        let exchange = Exchange::new(
            futures::future::ready(Ok::<_, SendError>(Response::<Full<Bytes>>::empty(ResponseHead::new(StatusCode::OK)))),
            receiver,
        );
        let steps: Vec<_> = exchange.collect().await;

        assert_eq!(statuses(&steps), [Some(200)]);
        assert!(hints.is_closed());
        assert!(matches!(hints.early_hints(["/a.css"]), Err(SendError::Closed)));
    }
}
