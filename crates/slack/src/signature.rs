//! Slack request signing: `v0=` + hex(HMAC-SHA256(secret, "v0:<ts>:<body>")).

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const MAX_REQUEST_AGE_SECS: u64 = 60 * 5;
const VERSION: &str = "v0";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("request timestamp `{0}` is not a unix timestamp")]
    InvalidTimestamp(String),
    #[error("request timestamp is more than five minutes away from now")]
    Stale,
    #[error("signature is malformed")]
    Malformed,
    #[error("signature does not match")]
    Mismatch,
}

pub struct SignatureVerifier {
    secret: SecretString,
}

impl SignatureVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn mac(&self, timestamp: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| SignatureError::Malformed)?;
        mac.update(VERSION.as_bytes());
        mac.update(b":");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body);
        Ok(mac)
    }

    pub fn sign(&self, timestamp: &str, body: &[u8]) -> Result<String, SignatureError> {
        let digest = self.mac(timestamp, body)?.finalize().into_bytes();
        Ok(format!("{VERSION}={}", hex::encode(digest)))
    }

    /// Checks the headers of a Slack request against its raw body at unix time `now`.
    pub fn verify(
        &self,
        timestamp: Option<&str>,
        signature: Option<&str>,
        body: &[u8],
        now: i64,
    ) -> Result<(), SignatureError> {
        let timestamp = timestamp.ok_or(SignatureError::MissingHeader(TIMESTAMP_HEADER))?;
        let signature = signature.ok_or(SignatureError::MissingHeader(SIGNATURE_HEADER))?;

        let sent_at: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp(timestamp.to_owned()))?;
        let age = now.checked_sub(sent_at).map(i64::unsigned_abs);
        if !age.is_some_and(|age| age <= MAX_REQUEST_AGE_SECS) {
            return Err(SignatureError::Stale);
        }

        let encoded = signature
            .strip_prefix("v0=")
            .ok_or(SignatureError::Malformed)?;
        let expected = hex::decode(encoded).map_err(|_| SignatureError::Malformed)?;

        self.mac(timestamp.trim(), body)?
            .verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::{SignatureError, SignatureVerifier};

    const NOW: i64 = 1_531_420_618;
    const BODY: &[u8] = b"token=xyzz0WbapA4vBCDEFasx0q6G&team_id=T1DC2JH3J&command=%2Fweather";

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new(SecretString::from("8f742231b10e8888abcd99yyyzzz85a5".to_owned()))
    }

    #[test]
    fn signed_requests_verify_within_the_window() {
        let signature = verifier().sign("1531420618", BODY).expect("sign");

        assert!(signature.starts_with("v0="));
        assert_eq!(signature.len(), 3 + 64);
        assert_eq!(verifier().verify(Some("1531420618"), Some(&signature), BODY, NOW), Ok(()));
        assert_eq!(
            verifier().verify(Some("1531420618"), Some(&signature), BODY, NOW + 299),
            Ok(())
        );
    }

    #[test]
    fn rejects_tampered_body_and_old_requests() {
        let signature = verifier().sign("1531420618", BODY).expect("sign");

        assert_eq!(
            verifier().verify(Some("1531420618"), Some(&signature), b"tampered", NOW),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verifier().verify(Some("1531420618"), Some(&signature), BODY, NOW + 301),
            Err(SignatureError::Stale)
        );
    }

    #[test]
    fn extreme_timestamps_are_stale() {
        for timestamp in [i64::MIN.to_string(), i64::MAX.to_string()] {
            assert_eq!(
                verifier().verify(Some(&timestamp), Some("v0=00"), BODY, NOW),
                Err(SignatureError::Stale)
            );
        }
        assert_eq!(
            verifier().verify(Some(&i64::MAX.to_string()), Some("v0=00"), BODY, i64::MIN),
            Err(SignatureError::Stale)
        );
    }

    #[test]
    fn rejects_missing_or_malformed_headers() {
        assert!(matches!(
            verifier().verify(None, Some("v0=00"), BODY, NOW),
            Err(SignatureError::MissingHeader(_))
        ));
        assert_eq!(
            verifier().verify(Some("1531420618"), Some("sha256=abc"), BODY, NOW),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verifier().verify(Some("yesterday"), Some("v0=00"), BODY, NOW),
            Err(SignatureError::InvalidTimestamp("yesterday".to_owned()))
        );
    }
}
