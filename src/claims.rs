use std::io::Read;
use std::path::PathBuf;

use jiff::SignedDuration;
use serde_json::{Map, Value};

/// The claims carried in a token: an arbitrary JSON object.
pub type Claims = Map<String, Value>;

/// Where the claims to sign are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimsSource {
    Stdin,
    File(PathBuf),
    Inline(String),
}

#[derive(thiserror::Error, Debug)]
pub enum ClaimsError {
    #[error("reading claims from {source_name}: {error}")]
    Read {
        source_name: String,
        #[source]
        error: std::io::Error,
    },

    #[error("claims must be a JSON object: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("lifetime of {0} overflows the expiry timestamp")]
    LifetimeOverflow(SignedDuration),
}

impl ClaimsSource {
    /// Picks the source the way the flags combine: an explicit file other than
    /// `-` wins, then a non-empty inline blob, then stdin.
    pub fn select(claims_file: &str, inline: Option<&str>) -> Self {
        match (claims_file, inline) {
            (path, _) if path != "-" => ClaimsSource::File(PathBuf::from(path)),
            (_, Some(blob)) if !blob.is_empty() => ClaimsSource::Inline(blob.to_owned()),
            _ => ClaimsSource::Stdin,
        }
    }

    fn name(&self) -> String {
        match self {
            ClaimsSource::Stdin => "stdin".to_owned(),
            ClaimsSource::File(path) => format!("'{}'", path.display()),
            ClaimsSource::Inline(_) => "--claims".to_owned(),
        }
    }

    /// Reads the raw claims bytes; `stdin` is only consumed for [`ClaimsSource::Stdin`].
    pub fn read_with<R: Read>(&self, mut stdin: R) -> Result<Vec<u8>, ClaimsError> {
        let read_err = |error| ClaimsError::Read {
            source_name: self.name(),
            error,
        };

        match self {
            ClaimsSource::Stdin => {
                let mut buf = Vec::new();
                stdin.read_to_end(&mut buf).map_err(read_err)?;
                Ok(buf)
            }
            ClaimsSource::File(path) => std::fs::read(path).map_err(read_err),
            ClaimsSource::Inline(blob) => Ok(blob.as_bytes().to_vec()),
        }
    }
}

pub fn parse_claims(bytes: &[u8]) -> Result<Claims, ClaimsError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Sets `iat` to `now` and `exp` to `now + lifetime`, replacing any values the
/// caller supplied.
pub fn stamp(claims: &mut Claims, now: i64, lifetime: SignedDuration) -> Result<(), ClaimsError> {
    let exp = now
        .checked_add(lifetime.as_secs())
        .ok_or(ClaimsError::LifetimeOverflow(lifetime))?;

    claims.insert("iat".to_owned(), Value::from(now));
    claims.insert("exp".to_owned(), Value::from(exp));
    Ok(())
}
