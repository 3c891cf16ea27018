//! Continuation token codec
//!
//! Tokens are URL-safe base64 of a small JSON cursor. Callers treat them as
//! opaque and hand them back unmodified.

use crate::domain::{CosmosDbError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Cursor {
    offset: u64,
}

/// Encodes the position of the next unread document
pub fn encode_continuation(offset: u64) -> String {
    let cursor = serde_json::to_vec(&Cursor { offset }).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(cursor)
}

/// Decodes a token produced by [`encode_continuation`]
///
/// A missing or blank token starts at offset 0.
///
/// # Errors
///
/// Returns `InvalidRequest` when the token was not produced by this codec.
pub fn decode_continuation(token: Option<&str>) -> Result<u64> {
    let token = match token.map(str::trim) {
        Some(t) if !t.is_empty() => t,
        _ => return Ok(0),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| malformed(token, &e.to_string()))?;
    let cursor: Cursor =
        serde_json::from_slice(&bytes).map_err(|e| malformed(token, &e.to_string()))?;

    Ok(cursor.offset)
}

fn malformed(token: &str, reason: &str) -> crate::domain::EntityStoreError {
    CosmosDbError::InvalidRequest(format!("Malformed continuation token '{token}': {reason}")).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let token = encode_continuation(40);
        assert!(!token.contains('='));
        assert_eq!(decode_continuation(Some(&token)).unwrap(), 40);
    }

    #[test]
    fn test_blank_token_starts_at_zero() {
        assert_eq!(decode_continuation(None).unwrap(), 0);
        assert_eq!(decode_continuation(Some("  ")).unwrap(), 0);
    }

    #[test]
    fn test_malformed_token_is_invalid_request() {
        let err = decode_continuation(Some("not-a-token!")).unwrap_err();
        assert!(matches!(
            err,
            crate::domain::EntityStoreError::CosmosDb(CosmosDbError::InvalidRequest(_))
        ));

        let not_a_cursor = URL_SAFE_NO_PAD.encode(br#"{"page":2}"#);
        assert!(decode_continuation(Some(&not_a_cursor)).is_err());
    }
}
