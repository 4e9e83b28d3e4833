use std::fmt;

use jiff::SignedDuration;

use crate::args::Args;
use crate::claims::ClaimsSource;
use crate::secret::SecretEncoding;

/// What a single invocation does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Sign {
        source: ClaimsSource,
        lifetime: SignedDuration,
    },
    Validate {
        token: String,
    },
}

/// Settings for one run, resolved from the command line.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub secret: String,
    pub encoding: SecretEncoding,
    pub mode: Mode,
}

impl Config {
    /// Returns `None` when no secret was given, in which case there is nothing
    /// to do but show usage.
    pub fn from_args(args: &Args) -> Option<Self> {
        if args.secret.is_empty() {
            return None;
        }

        let mode = match args.jwt.as_deref() {
            Some(token) if !token.is_empty() => Mode::Validate {
                token: token.to_owned(),
            },
            _ => Mode::Sign {
                source: ClaimsSource::select(&args.claims_file, args.claims.as_deref()),
                lifetime: args.exp,
            },
        };

        Some(Config {
            secret: args.secret.clone(),
            encoding: SecretEncoding::from_flag(args.base64),
            mode,
        })
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("secret", &"<redacted>")
            .field("encoding", &self.encoding)
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::args::normalize;

    fn config(args: &[&str]) -> Option<Config> {
        let args = Args::try_parse_from(normalize(std::iter::once("jwt-sign").chain(args.iter().copied()))).unwrap();
        Config::from_args(&args)
    }

    #[test]
    fn empty_secret_means_usage() {
        assert!(config(&["-secret="]).is_none());
        assert!(config(&["-jwt", "a.b.c", "-base64=false"]).is_none());
    }

    #[test]
    fn default_is_signing_from_stdin() {
        let config = config(&["-secret", "c2VjcmV0"]).unwrap();
        assert_eq!(config.encoding, SecretEncoding::Base64);
        assert_eq!(
            config.mode,
            Mode::Sign {
                source: ClaimsSource::Stdin,
                lifetime: SignedDuration::from_mins(20),
            }
        );
    }

    #[test]
    fn jwt_flag_selects_validation() {
        let config = config(&["-secret", "k", "-base64=false", "-jwt", "a.b.c"]).unwrap();
        assert_eq!(config.encoding, SecretEncoding::Raw);
        assert_eq!(
            config.mode,
            Mode::Validate {
                token: "a.b.c".to_owned()
            }
        );
    }

    #[test]
    fn inline_claims_and_lifetime() {
        let config = config(&["-secret", "k", "-claims", r#"{"sub":"alice"}"#, "-exp", "1h"]).unwrap();
        assert_eq!(
            config.mode,
            Mode::Sign {
                source: ClaimsSource::Inline(r#"{"sub":"alice"}"#.to_owned()),
                lifetime: SignedDuration::from_hours(1),
            }
        );
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let config = config(&["-secret", "hunter2"]).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
