//! Signed configuration tokens.
//!
//! A token is three base64url segments (no padding) joined by `.`:
//! a JSON header, the JCS-canonical JSON of the property map, and an
//! Ed25519 signature over `header.payload`. The header's `kid` is the
//! SHA-256 fingerprint of the signer's verifying key.

use std::collections::BTreeMap;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Signature algorithm carried in the token header.
pub const TOKEN_ALGORITHM: &str = "EdDSA";

/// Token type carried in the token header.
pub const TOKEN_TYPE: &str = "stagecfg+token";

/// Flat property mapping carried by a token. Ordered so encoding is stable.
pub type Properties = BTreeMap<String, String>;

/// Errors from encoding or decoding tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("unsupported token algorithm '{alg}' (type '{typ}')")]
    UnsupportedAlgorithm { alg: String, typ: String },

    #[error("token signature does not verify")]
    BadSignature,

    #[error("fingerprint mismatch: expected {expected}, got {actual}")]
    FingerprintMismatch { expected: String, actual: String },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("token encoding error: {0}")]
    Encoding(String),
}

/// Result type for token operations
pub type TokenResult<T> = Result<T, TokenError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
    kid: String,
}

/// Result of decoding a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken {
    /// Fingerprint of the key the token claims to be signed with.
    pub key_fingerprint: String,
    pub properties: Properties,
    /// True when the signature was checked against a verifying key.
    pub verified: bool,
}

/// Signs property maps into tokens.
#[derive(Debug, Clone)]
pub struct TokenSigner {
    key: SigningKey,
    fingerprint: String,
}

impl TokenSigner {
    pub fn new(key: SigningKey) -> Self {
        let fingerprint = compute_key_fingerprint(&key.verifying_key());
        Self { key, fingerprint }
    }

    /// Signer with a freshly generated key.
    pub fn generate() -> Self {
        Self::new(generate_keypair())
    }

    /// Signer from a base64 (standard alphabet) encoded 32-byte secret key.
    pub fn from_base64(encoded: &str) -> TokenResult<Self> {
        decode_signing_key(encoded).map(Self::new)
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.key.verifying_key()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Encode and sign a property map.
    pub fn encode(&self, properties: &Properties) -> TokenResult<String> {
        let header = TokenHeader {
            alg: TOKEN_ALGORITHM.to_string(),
            typ: TOKEN_TYPE.to_string(),
            kid: self.fingerprint.clone(),
        };
        let header_json =
            serde_json::to_vec(&header).map_err(|e| TokenError::Encoding(e.to_string()))?;
        let payload_json = serde_json_canonicalizer::to_vec(properties)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(payload_json)
        );
        let signature = self.key.sign(signing_input.as_bytes());

        Ok(format!(
            "{}.{}",
            signing_input,
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }
}

/// Decode a token, verifying it when a key is supplied.
///
/// Without a key the structure and header are still checked but the
/// signature is not, and `verified` is false.
pub fn decode_token(token: &str, verifying_key: Option<&VerifyingKey>) -> TokenResult<DecodedToken> {
    let token = token.trim();
    let mut parts = token.split('.');
    let (header_b64, payload_b64, signature_b64) =
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(p), Some(s), None) => (h, p, s),
            _ => {
                return Err(TokenError::Malformed(
                    "expected three '.' separated segments".to_string(),
                ))
            }
        };

    let header: TokenHeader = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header_b64)?)
        .map_err(|e| TokenError::Malformed(format!("header: {e}")))?;
    if header.alg != TOKEN_ALGORITHM || header.typ != TOKEN_TYPE {
        return Err(TokenError::UnsupportedAlgorithm {
            alg: header.alg,
            typ: header.typ,
        });
    }

    let properties: Properties = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload_b64)?)
        .map_err(|e| TokenError::Malformed(format!("payload: {e}")))?;

    let verified = match verifying_key {
        Some(key) => {
            let actual = compute_key_fingerprint(key);
            if actual != header.kid {
                return Err(TokenError::FingerprintMismatch {
                    expected: actual,
                    actual: header.kid,
                });
            }
            let signature = Signature::from_slice(&URL_SAFE_NO_PAD.decode(signature_b64)?)
                .map_err(|e| TokenError::Malformed(format!("signature: {e}")))?;
            let signing_input = &token[..header_b64.len() + 1 + payload_b64.len()];
            key.verify(signing_input.as_bytes(), &signature)
                .map_err(|_| TokenError::BadSignature)?;
            true
        }
        None => false,
    };

    Ok(DecodedToken {
        key_fingerprint: header.kid,
        properties,
        verified,
    })
}

/// Compute SHA-256 fingerprint of an Ed25519 public key
pub fn compute_key_fingerprint(key: &VerifyingKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a new Ed25519 keypair
pub fn generate_keypair() -> SigningKey {
    SigningKey::generate(&mut rand::thread_rng())
}

/// Encode a signing key to base64 for storage
pub fn encode_signing_key(key: &SigningKey) -> String {
    STANDARD.encode(key.to_bytes())
}

/// Decode a signing key from base64
pub fn decode_signing_key(encoded: &str) -> TokenResult<SigningKey> {
    let bytes = STANDARD.decode(encoded.trim())?;
    let bytes_array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| TokenError::InvalidKey("key must be 32 bytes".to_string()))?;
    Ok(SigningKey::from_bytes(&bytes_array))
}

/// Encode a verifying key to base64 for distribution
pub fn encode_verifying_key(key: &VerifyingKey) -> String {
    STANDARD.encode(key.as_bytes())
}

/// Decode a verifying key from base64
pub fn decode_verifying_key(encoded: &str) -> TokenResult<VerifyingKey> {
    let bytes = STANDARD.decode(encoded.trim())?;
    let bytes_array: [u8; 32] = bytes
        .try_into()
        .map_err(|_| TokenError::InvalidKey("key must be 32 bytes".to_string()))?;
    VerifyingKey::from_bytes(&bytes_array).map_err(|e| TokenError::InvalidKey(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_properties() -> Properties {
        let mut properties = Properties::new();
        properties.insert("db.url".to_string(), "jdbc:h2:mem:test".to_string());
        properties.insert("greeting".to_string(), "hello, world".to_string());
        properties.insert("empty".to_string(), String::new());
        properties
    }

    #[test]
    fn test_encode_and_verify() {
        let signer = TokenSigner::generate();
        let token = signer.encode(&sample_properties()).unwrap();
        assert_eq!(token.split('.').count(), 3);

        let decoded = decode_token(&token, Some(&signer.verifying_key())).unwrap();
        assert!(decoded.verified);
        assert_eq!(decoded.properties, sample_properties());
        assert_eq!(decoded.key_fingerprint, signer.fingerprint());
    }

    #[test]
    fn test_decode_without_key() {
        let signer = TokenSigner::generate();
        let token = signer.encode(&sample_properties()).unwrap();

        let decoded = decode_token(&token, None).unwrap();
        assert!(!decoded.verified);
        assert_eq!(decoded.properties.get("empty"), Some(&String::new()));
    }

    #[test]
    fn test_verify_with_wrong_key() {
        let signer = TokenSigner::generate();
        let other = generate_keypair();
        let token = signer.encode(&sample_properties()).unwrap();

        let result = decode_token(&token, Some(&other.verifying_key()));
        assert!(matches!(result, Err(TokenError::FingerprintMismatch { .. })));
    }

    #[test]
    fn test_tampered_payload() {
        let signer = TokenSigner::generate();
        let token = signer.encode(&sample_properties()).unwrap();
        let segments: Vec<&str> = token.split('.').collect();

        let mut forged = Properties::new();
        forged.insert("db.url".to_string(), "jdbc:evil".to_string());
        let forged_payload =
            URL_SAFE_NO_PAD.encode(serde_json_canonicalizer::to_vec(&forged).unwrap());
        let tampered = format!("{}.{}.{}", segments[0], forged_payload, segments[2]);

        let result = decode_token(&tampered, Some(&signer.verifying_key()));
        assert!(matches!(result, Err(TokenError::BadSignature)));
    }

    #[test]
    fn test_empty_mapping() {
        let signer = TokenSigner::generate();
        let token = signer.encode(&Properties::new()).unwrap();
        let decoded = decode_token(&token, Some(&signer.verifying_key())).unwrap();
        assert!(decoded.properties.is_empty());
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(matches!(
            decode_token("abc", None),
            Err(TokenError::Malformed(_))
        ));
        assert!(matches!(
            decode_token("a.b.c.d", None),
            Err(TokenError::Malformed(_))
        ));
        assert!(matches!(
            decode_token("!!.??.--", None),
            Err(TokenError::Base64(_))
        ));
    }

    #[test]
    fn test_unsupported_algorithm() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"stagecfg+token","kid":"x"}"#);
        let payload = URL_SAFE_NO_PAD.encode(b"{}");
        let token = format!("{header}.{payload}.");
        assert!(matches!(
            decode_token(&token, None),
            Err(TokenError::UnsupportedAlgorithm { .. })
        ));
    }

    #[test]
    fn test_signing_key_round_trip() {
        let signer = TokenSigner::generate();
        let encoded = encode_signing_key(&generate_keypair());
        assert!(TokenSigner::from_base64(&encoded).is_ok());

        let public = encode_verifying_key(&signer.verifying_key());
        let decoded = decode_verifying_key(&public).unwrap();
        assert_eq!(compute_key_fingerprint(&decoded), signer.fingerprint());

        let short = STANDARD.encode([0u8; 16]);
        assert!(matches!(
            decode_signing_key(&short),
            Err(TokenError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let key = generate_keypair().verifying_key();
        let fingerprint = compute_key_fingerprint(&key);
        assert_eq!(fingerprint.len(), 64);
        assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
