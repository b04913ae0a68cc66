//! Reason phrases for the status line.
//!
//! The table is injected into the encoder instead of being looked up from a global, so a
//! server can ship its own phrases or restrict the codes it is willing to emit.

use std::collections::HashMap;

use http::StatusCode;

/// Maps a status code to the reason phrase written on the status line.
///
/// Returning `None` makes the code unknown and the response cannot be framed.
pub trait StatusTable {
    fn reason(&self, status: StatusCode) -> Option<&str>;
}

/// The registered reason phrases, as known to the `http` crate, plus `103 Early Hints`.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct StandardReasons;

impl StatusTable for StandardReasons {
    fn reason(&self, status: StatusCode) -> Option<&str> {
        match status.as_u16() {
            103 => Some("Early Hints"),
            _ => status.canonical_reason(),
        }
    }
}

impl<T: StatusTable + ?Sized> StatusTable for &T {
    #[inline]
    fn reason(&self, status: StatusCode) -> Option<&str> {
        (**self).reason(status)
    }
}

impl StatusTable for HashMap<u16, String> {
    fn reason(&self, status: StatusCode) -> Option<&str> {
        self.get(&status.as_u16()).map(String::as_str)
    }
}
