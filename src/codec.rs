//! Signed, timestamped session tokens.
//!
//! Wire format, three `|`-joined ASCII fields:
//!
//! ```text
//! base64url(json(value)) | unix-seconds | hex(hmac(key, "<field1>|<field2>"))
//! ```
//!
//! The HMAC hash is SHA-1 by default so tokens stay readable by older
//! deployments. SHA-1 is weak for new designs; [`Signature::Sha256`] keeps the
//! same three fields and only lengthens the hex signature.
//!
//! Decoding never fails loudly. A malformed, tampered, expired or
//! undecodable token yields `None` and a `warn!` entry.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::GeneralPurpose;
use base64::engine::{DecodePaddingMode, GeneralPurposeConfig};
use base64::{Engine as _, alphabet};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha1::Sha1;
use sha2::Sha256;
use tracing::warn;

/// Padded on encode, padding-indifferent on decode.
const TOKEN_B64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Hash used inside the HMAC.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Signature {
    #[default]
    Sha1,
    Sha256,
}

impl Signature {
    fn sign(self, key: &[u8], message: &[u8]) -> String {
        match self {
            Self::Sha1 => sign_with::<Hmac<Sha1>>(key, message),
            Self::Sha256 => sign_with::<Hmac<Sha256>>(key, message),
        }
    }

    fn verify(self, key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        match self {
            Self::Sha1 => verify_with::<Hmac<Sha1>>(key, message, signature),
            Self::Sha256 => verify_with::<Hmac<Sha256>>(key, message, signature),
        }
    }
}

fn keyed<M: Mac + KeyInit>(key: &[u8], message: &[u8]) -> M {
    #[allow(clippy::expect_used)]
    let mut mac = <M as Mac>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(message);
    mac
}

fn sign_with<M: Mac + KeyInit>(key: &[u8], message: &[u8]) -> String {
    hex::encode(keyed::<M>(key, message).finalize().into_bytes())
}

fn verify_with<M: Mac + KeyInit>(key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    keyed::<M>(key, message).verify_slice(signature).is_ok()
}

/// Seconds since the Unix epoch.
pub fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

// ── Codec ─────────────────────────────────────────────────────────────────────

/// A signing key bound to a hash choice.
///
/// ```rust
/// use serde_json::json;
/// use wren::codec::Codec;
///
/// let codec = Codec::new("random-string");
/// let token = codec.encode(&json!({"a": "b"}), Some(1_700_000_000));
/// assert_eq!(token.split('|').count(), 3);
/// assert_eq!(codec.decode(&token, None), Some(json!({"a": "b"})));
/// ```
#[derive(Clone, Debug)]
pub struct Codec {
    key: String,
    signature: Signature,
}

impl Codec {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into(), signature: Signature::default() }
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    /// Encodes `value` into a token stamped with `timestamp`, or with the
    /// current time when `None`.
    pub fn encode(&self, value: &Value, timestamp: Option<u64>) -> String {
        let payload = TOKEN_B64.encode(value.to_string());
        let timestamp = timestamp.unwrap_or_else(now);
        let signed = format!("{payload}|{timestamp}");
        let signature = self.signature.sign(self.key.as_bytes(), signed.as_bytes());
        format!("{signed}|{signature}")
    }

    /// Verifies and decodes a token. `max_age` is in seconds.
    pub fn decode(&self, token: &str, max_age: Option<u64>) -> Option<Value> {
        self.decode_at(token, max_age, now())
    }

    /// [`decode`](Self::decode) against an explicit clock.
    pub fn decode_at(&self, token: &str, max_age: Option<u64>, now: u64) -> Option<Value> {
        let fields: Vec<&str> = token.split('|').collect();
        let [payload, timestamp, signature] = fields[..] else {
            warn!(fields = fields.len(), "rejecting session token: malformed");
            return None;
        };

        let signed = format!("{payload}|{timestamp}");
        let authentic = hex::decode(signature)
            .is_ok_and(|sig| self.signature.verify(self.key.as_bytes(), signed.as_bytes(), &sig));
        if !authentic {
            warn!(len = token.len(), "rejecting session token: invalid signature");
            return None;
        }

        let Ok(issued) = timestamp.parse::<u64>() else {
            warn!(%timestamp, "rejecting session token: bad timestamp");
            return None;
        };
        if let Some(max_age) = max_age {
            if issued < now.saturating_sub(max_age) {
                warn!(issued, max_age, "rejecting session token: expired");
                return None;
            }
        }

        let json = match TOKEN_B64.decode(payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("rejecting session token: {e}");
                return None;
            }
        };
        match serde_json::from_slice(&json) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("rejecting session token: {e}");
                None
            }
        }
    }
}

/// SHA-1 shortcut for [`Codec::encode`].
pub fn encode(key: &str, value: &Value, timestamp: Option<u64>) -> String {
    Codec::new(key).encode(value, timestamp)
}

/// SHA-1 shortcut for [`Codec::decode`].
pub fn decode(key: &str, token: &str, max_age: Option<u64>) -> Option<Value> {
    Codec::new(key).decode(token, max_age)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const KEY: &str = "random-string";

    #[test]
    fn round_trips_within_max_age() {
        let session = json!({"hello": "earth", "n": 2, "nested": {"list": [1, null, true]}});
        let token = encode(KEY, &session, Some(1_000));
        let codec = Codec::new(KEY);
        assert_eq!(codec.decode_at(&token, Some(60), 1_060), Some(session.clone()));
        assert_eq!(codec.decode_at(&token, None, u64::MAX), Some(session));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let token = encode(KEY, &json!({"a": "b"}), Some(123));
        let codec = Codec::new(KEY);
        assert_eq!(codec.decode_at(&token, Some(1), 125), None);
        assert!(codec.decode_at(&token, Some(1), 124).is_some());
        assert_eq!(decode(KEY, &token, Some(1)), None);
    }

    #[test]
    fn any_flipped_signature_character_is_rejected() {
        let token = encode(KEY, &json!({"k": "v"}), Some(2_111_666_111));
        let sig_start = token.rfind('|').unwrap() + 1;
        for i in sig_start..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'0' { b'1' } else { b'0' };
            let tampered = String::from_utf8(bytes).unwrap();
            assert_eq!(decode(KEY, &tampered, None), None, "position {i}");
        }
    }

    #[test]
    fn payload_and_timestamp_are_covered_by_the_signature() {
        let token = encode(KEY, &json!({"admin": false}), Some(1_000));
        let fields: Vec<&str> = token.split('|').collect();

        let forged_payload = TOKEN_B64.encode(json!({"admin": true}).to_string());
        let forged = format!("{forged_payload}|{}|{}", fields[1], fields[2]);
        assert_eq!(decode(KEY, &forged, None), None);

        let forged = format!("{}|9999999999|{}", fields[0], fields[2]);
        assert_eq!(decode(KEY, &forged, None), None);

        assert_eq!(decode("other-key", &token, None), None);
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert_eq!(decode(KEY, "", None), None);
        assert_eq!(decode(KEY, "hello|world", None), None);
        assert_eq!(decode(KEY, "a|b|c|d", None), None);
        assert_eq!(decode(KEY, "eyIxIjogMn0=|2111666111|wronghash", None), None);
    }

    #[test]
    fn correctly_signed_garbage_is_rejected() {
        let codec = Codec::new(KEY);
        let sig = Signature::Sha1.sign(KEY.as_bytes(), b"abc|2111666111");
        assert_eq!(codec.decode(&format!("abc|2111666111|{sig}"), None), None);

        let payload = TOKEN_B64.encode("not json");
        let signed = format!("{payload}|2111666111");
        let sig = Signature::Sha1.sign(KEY.as_bytes(), signed.as_bytes());
        assert_eq!(codec.decode(&format!("{signed}|{sig}"), None), None);
    }

    #[test]
    fn sha256_keeps_three_fields_with_a_longer_signature() {
        let codec = Codec::new(KEY).with_signature(Signature::Sha256);
        let token = codec.encode(&json!({"a": 1}), Some(5));
        let fields: Vec<&str> = token.split('|').collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[2].len(), 64);
        assert_eq!(encode(KEY, &json!({"a": 1}), Some(5)).rsplit('|').next().unwrap().len(), 40);

        assert_eq!(codec.decode(&token, None), Some(json!({"a": 1})));
        assert_eq!(Codec::new(KEY).decode(&token, None), None);
    }

    #[derive(Clone, Default)]
    struct Captured(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn rejected_tokens_are_not_logged() {
        let logs = Captured::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let token = encode(KEY, &json!({"secret": "hunter2"}), Some(1_000));
        let (payload, _) = token.split_once('|').unwrap();
        tracing::subscriber::with_default(subscriber, || {
            assert_eq!(decode("other-key", &token, None), None);
        });

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("invalid signature"), "{output}");
        assert!(!output.contains(payload), "{output}");
    }

    #[test]
    fn accepts_unpadded_payloads() {
        let payload = TOKEN_B64.encode(r#"{"a":"bc"}"#);
        assert!(payload.ends_with("=="));
        let trimmed = payload.trim_end_matches('=');
        let signed = format!("{trimmed}|1");
        let sig = Signature::Sha1.sign(KEY.as_bytes(), signed.as_bytes());
        assert_eq!(decode(KEY, &format!("{signed}|{sig}"), None), Some(json!({"a": "bc"})));
    }
}
