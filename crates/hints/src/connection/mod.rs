//! Writing responses onto a taken-over connection
//!
//! - [`ResponseSequencer`]: owns the connection for one request and
//!   - pulls interim and final responses from the handler
//!   - writes them strictly in production order, each one flushed before the next
//!   - streams chunked bodies
//!   - closes the connection after the final response or the first failure
//!
//! The handler side and the writing side run concurrently on the connection's task and
//! meet in a FIFO queue, so a handler can prepare its next response while the previous one
//! is still being written.

mod message_writer;
mod sequencer;

pub use sequencer::ResponseSequencer;
