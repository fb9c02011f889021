//! Ed25519 request verification.

use ed25519_dalek::{PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH, Signature, Verifier, VerifyingKey};

use crate::{DiscordConfig, Error, Result, TRACING_TARGET};

/// Header carrying the hex-encoded request signature.
pub const SIGNATURE_HEADER: &str = "X-Signature-Ed25519";

/// Header carrying the signed timestamp.
pub const TIMESTAMP_HEADER: &str = "X-Signature-Timestamp";

/// Verifies that requests were signed by Discord.
///
/// Discord signs `timestamp || body` with the application's key. The body
/// must be the exact bytes received; re-serialized JSON will not verify.
#[derive(Debug, Clone)]
pub struct DiscordVerifier {
    key: VerifyingKey,
}

impl DiscordVerifier {
    /// Creates a verifier from a hex-encoded public key.
    pub fn from_hex(public_key: &str) -> Result<Self> {
        let bytes = hex::decode(public_key.trim())
            .map_err(|e| Error::InvalidPublicKey(e.to_string()))?;

        let bytes: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().map_err(|bytes: Vec<u8>| {
            Error::InvalidPublicKey(format!(
                "expected {PUBLIC_KEY_LENGTH} bytes, got {}",
                bytes.len()
            ))
        })?;

        let key = VerifyingKey::from_bytes(&bytes)
            .map_err(|e| Error::InvalidPublicKey(e.to_string()))?;

        Ok(Self { key })
    }

    /// Creates a verifier from configuration.
    pub fn from_config(config: &DiscordConfig) -> Result<Self> {
        Self::from_hex(&config.public_key)
    }

    /// Creates a verifier from a raw key.
    pub fn new(key: VerifyingKey) -> Self {
        Self { key }
    }

    /// Checks a request signature.
    pub fn verify(&self, signature: &str, timestamp: &str, body: &[u8]) -> Result<()> {
        let signature = hex::decode(signature.trim())
            .map_err(|e| Error::MalformedSignature(e.to_string()))?;

        let signature: [u8; SIGNATURE_LENGTH] = signature.try_into().map_err(|bytes: Vec<u8>| {
            Error::MalformedSignature(format!(
                "expected {SIGNATURE_LENGTH} bytes, got {}",
                bytes.len()
            ))
        })?;
        let signature = Signature::from_bytes(&signature);

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.key.verify(&message, &signature).map_err(|_| {
            tracing::warn!(
                target: TRACING_TARGET,
                timestamp = %timestamp,
                body_len = body.len(),
                "Discord signature verification failed"
            );
            Error::InvalidSignature
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use ed25519_dalek::{Signer, SigningKey};

    use super::*;

    pub(crate) fn signing_key() -> SigningKey {
        SigningKey::from_bytes(&[7u8; 32])
    }

    pub(crate) fn sign(timestamp: &str, body: &[u8]) -> String {
        let mut message = timestamp.as_bytes().to_vec();
        message.extend_from_slice(body);
        hex::encode(signing_key().sign(&message).to_bytes())
    }

    fn verifier() -> DiscordVerifier {
        DiscordVerifier::from_hex(&hex::encode(signing_key().verifying_key().as_bytes())).unwrap()
    }

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"type":1}"#;
        let signature = sign("1700000000", body);

        verifier().verify(&signature, "1700000000", body).unwrap();
    }

    #[test]
    fn rejects_tampered_body() {
        let signature = sign("1700000000", br#"{"type":1}"#);

        let error = verifier()
            .verify(&signature, "1700000000", br#"{"type":2}"#)
            .unwrap_err();
        assert!(matches!(error, Error::InvalidSignature));
    }

    #[test]
    fn rejects_mismatched_timestamp() {
        let body = br#"{"type":1}"#;
        let signature = sign("1700000000", body);

        let error = verifier().verify(&signature, "1700000001", body).unwrap_err();
        assert!(matches!(error, Error::InvalidSignature));
    }

    #[test]
    fn rejects_malformed_signature() {
        let error = verifier().verify("zz", "1700000000", b"{}").unwrap_err();
        assert!(matches!(error, Error::MalformedSignature(_)));

        let error = verifier().verify("abcd", "1700000000", b"{}").unwrap_err();
        assert!(matches!(error, Error::MalformedSignature(_)));
    }

    #[test]
    fn rejects_invalid_public_key() {
        assert!(DiscordVerifier::from_hex("not-hex").is_err());
        assert!(DiscordVerifier::from_hex("abcd").is_err());
    }
}
