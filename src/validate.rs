use std::fmt;
use std::io::{self, Write};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;

use crate::claims::Claims;
use crate::secret::{self, SecretEncoding};

/// Algorithms accepted on verification; they all key off the same HMAC secret.
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Why a token failed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    Malformed,
    Expired,
    NotYetValid,
    WrongAlgorithm,
    BadSignature,
    UndecodableSecret(String),
    Other(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Malformed => write!(f, "Provided value was not a recognizable JWT"),
            Rejection::Expired => write!(f, "JWT is expired"),
            Rejection::NotYetValid => write!(f, "JWT is not valid yet"),
            Rejection::WrongAlgorithm => write!(f, "JWT is not signed with an HMAC algorithm"),
            Rejection::BadSignature => write!(f, "JWT signature does not match the secret"),
            Rejection::UndecodableSecret(e) => write!(f, "Provided secret could not be decoded: {e}"),
            Rejection::Other(e) => write!(f, "JWT failed validation: {e}"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ValidateError {
    #[error("token rejected: {0}")]
    Rejected(Rejection),

    #[error("writing output: {0}")]
    Io(#[from] io::Error),
}

#[derive(Deserialize)]
struct DeclaredHeader {
    alg: String,
}

/// Reads the `alg` a token claims for itself without trusting anything else in it.
fn declared_algorithm(token: &str) -> Option<String> {
    let header = token.split('.').next()?;
    let bytes = URL_SAFE_NO_PAD.decode(header).ok()?;
    serde_json::from_slice::<DeclaredHeader>(&bytes)
        .ok()
        .map(|h| h.alg)
}

fn classify(token: &str, err: &jsonwebtoken::errors::Error) -> Rejection {
    match err.kind() {
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Utf8(_) => Rejection::Malformed,
        // headers naming an algorithm the library has no variant for (e.g. "none")
        // fail to deserialize rather than failing the algorithm check
        ErrorKind::Json(_) => match declared_algorithm(token) {
            Some(alg) if !alg.starts_with("HS") => Rejection::WrongAlgorithm,
            _ => Rejection::Malformed,
        },
        ErrorKind::ExpiredSignature => Rejection::Expired,
        ErrorKind::ImmatureSignature => Rejection::NotYetValid,
        ErrorKind::InvalidAlgorithm => Rejection::WrongAlgorithm,
        ErrorKind::InvalidSignature => Rejection::BadSignature,
        _ => Rejection::Other(err.to_string()),
    }
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = HMAC_ALGORITHMS.to_vec();
    validation.leeway = 0;
    validation.validate_nbf = true;
    validation.required_spec_claims.clear();
    validation
}

/// Verifies `token` against raw key bytes, returning its claims.
///
/// `exp` and `nbf` are enforced when present, and an `iat` in the future is
/// treated like an `nbf` in the future.
pub fn verify(token: &str, key: &[u8]) -> Result<Claims, Rejection> {
    let data = jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(key), &validation())
        .map_err(|e| classify(token, &e))?;

    let now = jsonwebtoken::get_current_timestamp();
    if let Some(iat) = data.claims.get("iat").and_then(Value::as_f64) {
        if iat > now as f64 {
            return Err(Rejection::NotYetValid);
        }
    }

    Ok(data.claims)
}

/// Decodes the secret as instructed and verifies the token with it.
pub fn validate(token: &str, secret: &str, encoding: SecretEncoding) -> Result<Claims, Rejection> {
    let key = secret::decode_secret(secret, encoding)
        .map_err(|e| Rejection::UndecodableSecret(e.to_string()))?;
    verify(token, &key)
}

/// Diagnostic only: whether the token would verify had the secret been read the
/// other way round. Never feeds back into the validation result.
pub fn verifies_with_inverted_encoding(token: &str, secret: &str, encoding: SecretEncoding) -> bool {
    validate(token, secret, encoding.inverted()).is_ok()
}

fn encoding_hint(encoding: SecretEncoding) -> &'static str {
    match encoding {
        SecretEncoding::Base64 => {
            "Provided secret was base64 encoded, but the JWT was signed with the encoded secret instead of the decoded bytes"
        }
        SecretEncoding::Raw => {
            "Provided secret was not encoded, but the JWT was signed with the base64 decoded bytes instead."
        }
    }
}

/// Validates `token` and prints its claims as indented JSON to `out`.
///
/// On failure the reason, and a hint if the secret encoding looks inverted,
/// are written to `diag` and [`ValidateError::Rejected`] is returned.
#[tracing::instrument(skip_all, fields(encoding = ?encoding))]
pub fn show_claims<W: Write, D: Write>(
    token: &str,
    secret: &str,
    encoding: SecretEncoding,
    out: &mut W,
    diag: &mut D,
) -> Result<(), ValidateError> {
    match validate(token, secret, encoding) {
        Ok(claims) => {
            tracing::debug!("token verified with {} claims", claims.len());
            serde_json::to_writer_pretty(&mut *out, &claims).map_err(io::Error::from)?;
            writeln!(out)?;
            Ok(())
        }
        Err(reason) => {
            tracing::debug!(?reason, "token rejected");
            writeln!(diag, "{reason}")?;

            if verifies_with_inverted_encoding(token, secret, encoding) {
                writeln!(diag, "{}", encoding_hint(encoding))?;
            }

            Err(ValidateError::Rejected(reason))
        }
    }
}
