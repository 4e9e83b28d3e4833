use std::ffi::OsString;

use clap::ArgAction;
use jiff::SignedDuration;

/// Command line arguments. Long flags may also be spelled with a single dash
/// (`-secret=...`), see [`normalize`].
#[derive(clap::Parser)]
#[command(
    name = "jwt-sign",
    version,
    about = "Sign JSON claims into an HS256 JWT, or validate a JWT and show its claims",
    long_about = None
)]
pub struct Args {
    #[arg(
        long = "claims-file",
        value_name = "FILE",
        default_value = "-",
        conflicts_with = "claims",
        help = "A JSON file with the claims the JWT will have; '-' reads stdin"
    )]
    pub claims_file: String,

    #[arg(
        long,
        env = "JWT_SECRET",
        hide_env_values = true,
        default_value = "",
        help = "The secret used to sign or verify the JWT. Must be non-empty"
    )]
    pub secret: String,

    #[arg(
        long,
        value_name = "JSON",
        help = "JSON blob to set claims. Cannot be used with --claims-file"
    )]
    pub claims: Option<String>,

    #[arg(
        long,
        action = ArgAction::Set,
        value_parser = parse_bool,
        num_args = 0..=1,
        require_equals = true,
        default_value_t = true,
        default_missing_value = "true",
        value_name = "BOOL",
        help = "Whether the secret is base64 encoded; use --base64=false for a plain secret"
    )]
    pub base64: bool,

    #[arg(
        long,
        value_name = "DURATION",
        default_value = "20m",
        allow_hyphen_values = true,
        value_parser = parse_lifetime,
        help = "Token lifetime, e.g. 90s, 20m, 1h30m"
    )]
    pub exp: SignedDuration,

    #[arg(
        long,
        value_name = "TOKEN",
        help = "Validate this JWT and show its claims instead of signing"
    )]
    pub jwt: Option<String>,

    #[arg(
        short = 'v',
        long,
        conflicts_with = "quiet",
        action = ArgAction::Count,
        help = "Log more detail to stderr; repeat for more"
    )]
    pub verbose: u8,

    #[arg(short = 'q', long, help = "Only log errors")]
    pub quiet: bool,
}

/// Long flags that can be given Go-style with a single dash.
const LONG_FLAGS: [&str; 6] = ["claims-file", "secret", "claims", "base64", "exp", "jwt"];

/// Flags that consume the following argument when given without `=`.
const VALUE_FLAGS: [&str; 5] = ["claims-file", "secret", "claims", "exp", "jwt"];

/// Rewrites `-name[=value]` to `--name[=value]` for the known long flags, so the
/// single-dash spelling keeps working. A value given as the next word is folded
/// into `--name=value`, so it is taken verbatim even when it starts with `-`.
/// Everything after `--` is left alone.
pub fn normalize<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut out = Vec::new();
    let mut pending: Option<String> = None;
    let mut passthrough = false;

    for (i, arg) in args.into_iter().enumerate() {
        let arg: OsString = arg.into();

        if let Some(name) = pending.take() {
            let mut joined = OsString::from(format!("--{name}="));
            joined.push(&arg);
            out.push(joined);
            continue;
        }

        if i == 0 || passthrough {
            out.push(arg);
            continue;
        }

        let Some(text) = arg.to_str() else {
            out.push(arg);
            continue;
        };

        if text == "--" {
            passthrough = true;
            out.push(arg);
            continue;
        }

        let flag = text.strip_prefix("--").or_else(|| text.strip_prefix('-'));
        let Some(flag) = flag else {
            out.push(arg);
            continue;
        };

        let (name, has_value) = match flag.split_once('=') {
            Some((name, _)) => (name, true),
            None => (flag, false),
        };

        if !LONG_FLAGS.contains(&name) {
            out.push(arg);
            continue;
        }

        if !has_value && VALUE_FLAGS.contains(&name) {
            pending = Some(name.to_owned());
            continue;
        }

        out.push(OsString::from(format!("--{flag}")));
    }

    // a trailing value flag with nothing after it; let clap report it
    if let Some(name) = pending {
        out.push(OsString::from(format!("--{name}")));
    }

    out
}

/// Booleans spelled the way Go's `strconv.ParseBool` accepts them.
pub fn parse_bool(s: &str) -> Result<bool, String> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(format!("invalid boolean '{s}'")),
    }
}

pub fn parse_lifetime(s: &str) -> Result<SignedDuration, String> {
    s.trim()
        .parse::<SignedDuration>()
        .map_err(|e| format!("invalid duration '{s}': {e}"))
}
