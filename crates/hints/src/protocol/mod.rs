//! Protocol types shared by the codec and the connection.
//!
//! - **Messages** ([`message`]): [`Message`], [`PayloadItem`] and the [`BodyFraming`] rules
//!   that decide whether and how a body follows a header block
//! - **Responses** ([`response`]): [`ResponseHead`], [`Response`] and the [`Step`] a handler
//!   produces at a time
//! - **Status table** ([`status`]): the injected reason phrase lookup
//! - **Early hints** ([`hints`]): builder for `103` heads
//! - **Errors** ([`error`]): [`HttpError`] and [`SendError`]

mod message;
pub use message::BodyFraming;
pub use message::Message;
pub use message::PayloadItem;

mod response;
pub use response::Response;
pub use response::ResponseHead;
pub use response::Step;

mod status;
pub use status::StandardReasons;
pub use status::StatusTable;

mod hints;
pub use hints::early_hints;

mod error;
pub use error::BoxError;
pub use error::HttpError;
pub use error::SendError;
