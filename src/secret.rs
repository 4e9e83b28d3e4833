use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zeroize::Zeroizing;

/// How the secret given on the command line maps to HMAC key bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretEncoding {
    /// Standard padded base64; the decoded bytes are the key.
    Base64,
    /// The UTF-8 bytes of the string are the key.
    Raw,
}

impl SecretEncoding {
    pub fn from_flag(base64: bool) -> Self {
        if base64 {
            SecretEncoding::Base64
        } else {
            SecretEncoding::Raw
        }
    }

    /// The opposite assumption, used when probing for a mixed-up secret.
    pub fn inverted(self) -> Self {
        match self {
            SecretEncoding::Base64 => SecretEncoding::Raw,
            SecretEncoding::Raw => SecretEncoding::Base64,
        }
    }
}

/// Key bytes, wiped when dropped.
pub type SecretBytes = Zeroizing<Vec<u8>>;

pub fn decode_secret(secret: &str, encoding: SecretEncoding) -> Result<SecretBytes, base64::DecodeError> {
    match encoding {
        SecretEncoding::Base64 => STANDARD.decode(secret).map(Zeroizing::new),
        SecretEncoding::Raw => Ok(Zeroizing::new(secret.as_bytes().to_vec())),
    }
}
