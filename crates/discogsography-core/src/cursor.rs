//! Opaque offset-based pagination cursor.
//!
//! A cursor is `base64url(json({"offset": N}))`. It is intentionally opaque
//! to clients but trivial to construct: there is no signature, since the
//! offset is not privileged data. An invalid or garbled cursor always
//! decodes to offset 0 rather than surfacing a 400 — pagination should never
//! fail to start just because a stored cursor went stale.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct CursorPayload {
    offset: usize,
}

pub fn encode(offset: usize) -> String {
    let payload = CursorPayload { offset };
    let json = serde_json::to_vec(&payload).expect("cursor payload always serializes");
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode `cursor` into an offset. Any decoding failure (bad base64, bad
/// JSON, missing field) falls back to offset 0 rather than erroring.
pub fn decode(cursor: &str) -> usize {
    URL_SAFE_NO_PAD
        .decode(cursor)
        .ok()
        .and_then(|bytes| serde_json::from_slice::<CursorPayload>(&bytes).ok())
        .map(|payload| payload.offset)
        .unwrap_or(0)
}

/// Build the `next_cursor` for a page, per the convention that a cursor is
/// only emitted when the page was full (`returned == limit`) — a short page
/// signals the caller has reached the end.
pub fn next_cursor(offset: usize, limit: usize, returned: usize) -> Option<String> {
    if returned == limit && returned > 0 {
        Some(encode(offset + returned))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decode_of_garbage_is_zero() {
        assert_eq!(decode("not valid base64 at all!!"), 0);
        assert_eq!(decode(""), 0);
        assert_eq!(decode(&URL_SAFE_NO_PAD.encode("not json")), 0);
    }

    #[test]
    fn full_page_emits_next_cursor() {
        let next = next_cursor(0, 20, 20).expect("full page should continue");
        assert_eq!(decode(&next), 20);
    }

    #[test]
    fn short_page_emits_no_cursor() {
        assert!(next_cursor(0, 20, 5).is_none());
        assert!(next_cursor(0, 20, 0).is_none());
    }

    proptest! {
        #[test]
        fn round_trip_law(offset in 0usize..10_000_000) {
            prop_assert_eq!(decode(&encode(offset)), offset);
        }
    }
}
