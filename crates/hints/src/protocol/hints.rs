use http::StatusCode;

use crate::protocol::ResponseHead;

/// Builds a `103 Early Hints` head asking the client to preload `paths`.
///
/// All paths go into a single `Link` field, comma separated:
///
/// ```
/// use micro_hints::protocol::early_hints;
///
/// let head = early_hints(["/a.css", "/b.js"]);
/// assert_eq!(head.status().as_u16(), 103);
/// assert_eq!(head.headers(), [("Link".to_string(), "</a.css>; rel=preload, </b.js>; rel=preload".to_string())]);
/// ```
pub fn early_hints<I, S>(paths: I) -> ResponseHead
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let link = paths.into_iter().map(|path| format!("<{}>; rel=preload", path.as_ref())).collect::<Vec<_>>().join(", ");

    ResponseHead::new(early_hints_status()).with_header("Link", link)
}

/// `103 Early Hints`, which `http` has no named constant for.
///
/// # Panics
///
/// Never: 103 lies in the `100..=999` range `StatusCode::from_u16` accepts.
#[inline]
fn early_hints_status() -> StatusCode {
    StatusCode::from_u16(103).expect("103 is a valid status code")
}
