//! Response head type and the reason-phrase lookup.

use http::{Response, StatusCode};

/// Head of an outgoing response: status line plus headers, body attached
/// separately through the payload messages.
pub type ResponseHead = Response<()>;

/// Reason phrase for the status line, with the catch-all for codes that
/// have no canonical text.
pub fn reason_phrase(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("NA")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_and_fallback_reasons() {
        assert_eq!(reason_phrase(StatusCode::OK), "OK");
        assert_eq!(reason_phrase(StatusCode::NOT_FOUND), "Not Found");
        assert_eq!(reason_phrase(StatusCode::from_u16(299).unwrap()), "NA");
    }
}
