//! Session Credential codec: compact three-segment tokens whose middle segment
//! carries a base64-encoded JSON claims object.
//!
//! Decoding here is claim extraction only. Callers that want proof of origin
//! opt in via [`verify_signature`]; the gate treats any decode failure the same
//! as a wrong role, so malformed input is never distinguishable from the outside.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::Sha256;

/// Claim key whose value names the account's role.
pub const ROLE_CLAIM: &str = "role";

const SEGMENT_COUNT: usize = 3;

// Decoder for credential segments. Producers differ on alphabet and padding,
// so segments are normalized to the standard alphabet first and padding is
// accepted either way.
const SEGMENT_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const FORGE_ENGINE: GeneralPurpose = base64::engine::general_purpose::URL_SAFE_NO_PAD;

type HmacSha256 = Hmac<Sha256>;

/// Decoded claims object of a Session Credential.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Role claim, when present and a string.
    pub fn role(&self) -> Option<&str> {
        self.0.get(ROLE_CLAIM).and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// Why a credential could not be decoded. The gate collapses all of these into
/// a single denial; the distinction exists for tests and the inspection tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("credential is not a three-segment token")]
    Structure,
    #[error("claims segment is not valid base64")]
    Encoding,
    #[error("claims segment is not a JSON object")]
    Payload,
}

/// Decode the claims object out of `credential` without verifying its signature.
///
/// The input is split on `.` and must yield exactly three segments. The middle
/// segment is normalized from the URL-safe alphabet to the standard one,
/// base64-decoded with padding accepted either way, then parsed as a JSON
/// object. Decoding never mutates the input and is free of side effects.
pub fn decode_claims(credential: &str) -> Result<Claims, DecodeError> {
    let segments: Vec<&str> = credential.split('.').collect();
    if segments.len() != SEGMENT_COUNT {
        return Err(DecodeError::Structure);
    }
    let bytes = decode_segment(segments[1])?;
    let map: Map<String, Value> = serde_json::from_slice(&bytes).map_err(|_| DecodeError::Payload)?;
    Ok(Claims(map))
}

/// Check the third segment against an HMAC-SHA256 of the first two, using a
/// constant-time comparison. Any structural defect reads as a failed check.
pub fn verify_signature(credential: &str, key: &[u8]) -> bool {
    let segments: Vec<&str> = credential.split('.').collect();
    if segments.len() != SEGMENT_COUNT {
        return false;
    }
    let expected = hmac_sha256(format!("{}.{}", segments[0], segments[1]).as_bytes(), key);
    match decode_segment(segments[2]) {
        Ok(actual) => constant_time_eq(&expected, &actual),
        Err(_) => false,
    }
}

/// Build an unsigned credential around `claims`, for demos and tests.
pub fn forge(claims: &Value) -> String {
    let (header, payload) = forge_prefix(claims);
    format!("{header}.{payload}.unsigned")
}

/// Build a credential around `claims` signed with HMAC-SHA256 under `key`.
pub fn forge_signed(claims: &Value, key: &[u8]) -> String {
    let (header, payload) = forge_prefix(claims);
    let tag = hmac_sha256(format!("{header}.{payload}").as_bytes(), key);
    format!("{header}.{payload}.{}", FORGE_ENGINE.encode(tag))
}

fn forge_prefix(claims: &Value) -> (String, String) {
    let header = FORGE_ENGINE.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = FORGE_ENGINE.encode(claims.to_string());
    (header, payload)
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, DecodeError> {
    let normalized = segment.replace('-', "+").replace('_', "/");
    SEGMENT_ENGINE.decode(normalized).map_err(|_| DecodeError::Encoding)
}

fn hmac_sha256(message: &[u8], key: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("hmac accepts keys of any length");
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
