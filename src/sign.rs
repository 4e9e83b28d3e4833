use std::io::Read;

use jiff::SignedDuration;
use jsonwebtoken::{Algorithm, EncodingKey, Header};

use crate::claims::{self, Claims, ClaimsError, ClaimsSource};
use crate::secret::{self, SecretEncoding};

#[derive(thiserror::Error, Debug)]
pub enum SignError {
    #[error(transparent)]
    Claims(#[from] ClaimsError),

    #[error("secret is not valid base64: {0}")]
    Secret(#[from] base64::DecodeError),

    #[error("token encoding failed: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),
}

/// Signs `claims` as an HS256 token keyed with `key`.
pub fn sign(claims: &Claims, key: &[u8]) -> Result<String, jsonwebtoken::errors::Error> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(key),
    )
}

/// Everything needed to produce one token.
#[derive(Clone)]
pub struct SignRequest<'a> {
    pub source: &'a ClaimsSource,
    pub secret: &'a str,
    pub encoding: SecretEncoding,
    pub lifetime: SignedDuration,
    /// Unix seconds used as `iat`.
    pub now: i64,
}

/// Reads the claims, stamps `iat`/`exp`, decodes the secret and signs.
#[tracing::instrument(skip_all, fields(source = ?request.source, lifetime = %request.lifetime))]
pub fn sign_claims<R: Read>(request: &SignRequest<'_>, stdin: R) -> Result<String, SignError> {
    // Read and parse the claims object.
    let raw = request.source.read_with(stdin)?;
    let mut claims = claims::parse_claims(&raw)?;
    tracing::debug!("read {} claims", claims.len());

    // Setup iat and exp, overriding whatever the caller sent.
    claims::stamp(&mut claims, request.now, request.lifetime)?;

    // Decode the secret into key bytes and sign.
    let key = secret::decode_secret(request.secret, request.encoding)?;
    let token = sign(&claims, &key)?;

    tracing::info!(exp = ?claims.get("exp"), "signed token");
    Ok(token)
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{DecodingKey, Validation};
    use serde_json::json;

    use super::*;

    fn request<'a>(source: &'a ClaimsSource, secret: &'a str, encoding: SecretEncoding) -> SignRequest<'a> {
        SignRequest {
            source,
            secret,
            encoding,
            lifetime: SignedDuration::from_mins(20),
            now: jsonwebtoken::get_current_timestamp() as i64,
        }
    }

    #[test]
    fn signs_hs256_with_decoded_secret() {
        let source = ClaimsSource::Inline(r#"{"sub":"alice"}"#.to_owned());
        let req = request(&source, "c2VjcmV0", SecretEncoding::Base64);
        let token = sign_claims(&req, std::io::empty()).unwrap();

        assert_eq!(token.split('.').count(), 3);
        assert_eq!(jsonwebtoken::decode_header(&token).unwrap().alg, Algorithm::HS256);

        let data = jsonwebtoken::decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();

        let claims = data.claims;
        assert_eq!(claims["sub"], json!("alice"));
        assert_eq!(claims["iat"], json!(req.now));
        assert_eq!(claims["exp"], json!(req.now + 1200));
    }

    #[test]
    fn raw_secret_signs_with_string_bytes() {
        let source = ClaimsSource::Inline("{}".to_owned());
        let req = request(&source, "plain secret", SecretEncoding::Raw);
        let token = sign_claims(&req, std::io::empty()).unwrap();

        let decoded = jsonwebtoken::decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"plain secret"),
            &Validation::new(Algorithm::HS256),
        );
        assert!(decoded.is_ok());
    }

    #[test]
    fn reads_claims_from_stdin() {
        let req = request(&ClaimsSource::Stdin, "c2VjcmV0", SecretEncoding::Base64);
        let token = sign_claims(&req, &br#"{"role":"admin"}"#[..]).unwrap();

        let data = jsonwebtoken::decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(data.claims["role"], json!("admin"));
    }

    #[test]
    fn bad_base64_secret_fails() {
        let source = ClaimsSource::Inline("{}".to_owned());
        let req = request(&source, "%%%", SecretEncoding::Base64);
        let err = sign_claims(&req, std::io::empty()).unwrap_err();
        assert!(matches!(err, SignError::Secret(_)));
    }

    #[test]
    fn unparseable_claims_fail_before_the_secret_is_touched() {
        let source = ClaimsSource::Inline("[]".to_owned());
        let req = request(&source, "%%%", SecretEncoding::Base64);
        let err = sign_claims(&req, std::io::empty()).unwrap_err();
        assert!(matches!(err, SignError::Claims(ClaimsError::Parse(_))));
    }
}
