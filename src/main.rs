mod args;
mod claims;
mod config;
mod secret;
mod sign;
mod validate;

use std::io::{self, Write};

use anyhow::Context;
use clap::CommandFactory;
use clap::Parser;

use crate::args::Args;
use crate::config::{Config, Mode};
use crate::sign::SignRequest;
use crate::validate::ValidateError;

/// Exit status for a token that failed validation.
const EXIT_REJECTED: i32 = -1;
/// Exit status for any other failure.
const EXIT_FAILURE: i32 = 1;

fn setup_tracing(args: &Args) {
    let level = if args.quiet {
        tracing::Level::ERROR
    } else {
        match args.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    };

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("failed to set global tracing subscriber");
}

fn run(config: &Config) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match &config.mode {
        Mode::Validate { token } => {
            // Diagnostics go to stderr, claims to stdout.
            let stderr = io::stderr();
            let mut diag = stderr.lock();
            validate::show_claims(token, &config.secret, config.encoding, &mut out, &mut diag)?;
        }
        Mode::Sign { source, lifetime } => {
            let request = SignRequest {
                source,
                secret: &config.secret,
                encoding: config.encoding,
                lifetime: *lifetime,
                now: i64::try_from(jsonwebtoken::get_current_timestamp())
                    .context("system clock is out of range")?,
            };

            // Sign and print the token.
            let token = sign::sign_claims(&request, io::stdin().lock())
                .context("failed to sign claims")?;
            writeln!(out, "{token}").context("writing token")?;
        }
    }

    Ok(())
}

fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<ValidateError>() {
        Some(ValidateError::Rejected(_)) => EXIT_REJECTED,
        _ => EXIT_FAILURE,
    }
}

fn main() {
    // Parse command line arguments, accepting Go-style single-dash flags.
    let args = Args::parse_from(args::normalize(std::env::args_os()));
    setup_tracing(&args);

    let Some(config) = Config::from_args(&args) else {
        // Nothing to sign or verify with; show usage and leave quietly.
        if let Err(e) = Args::command().print_help() {
            tracing::error!("printing usage: {e}");
        }
        return;
    };
    tracing::debug!(?config, "starting");

    // Map the failure, if any, to an exit code.
    if let Err(e) = run(&config) {
        let code = exit_code(&e);
        if code == EXIT_REJECTED {
            // The reason has already been written for the user.
            tracing::debug!("{e:#}");
        } else {
            tracing::error!("{e:#}");
        }
        std::process::exit(code);
    }
}
