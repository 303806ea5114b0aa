//! `fcddnsd token` subcommands

use crate::FcddnsExitCode;
use crate::cli::TokenCommand;
use anyhow::{Context, Result};
use fcddns_core::{Credential, CredentialSigner, CredentialValidator, ExpiryPolicy};
use std::io::BufRead;
use std::net::Ipv4Addr;
use std::process::ExitCode;

pub fn run(command: TokenCommand) -> ExitCode {
    let result = match command {
        TokenCommand::Sign {
            secret,
            domain,
            host,
            slot,
            ip,
            expires_in_days,
        } => sign(&secret, &domain, &host, slot, ip, expires_in_days),
        TokenCommand::Verify {
            secret,
            enforce_expiry,
            token,
        } => read_token(&token).and_then(|token| verify(&secret, &token, enforce_expiry)),
    };

    match result {
        Ok(output) => {
            println!("{output}");
            FcddnsExitCode::CleanShutdown.into()
        }
        Err(e) => {
            eprintln!("{e:#}");
            FcddnsExitCode::ConfigError.into()
        }
    }
}

/// Issue a credential and return the encoded token
pub fn sign(
    secret: &str,
    domain: &str,
    host: &str,
    slot: u32,
    ip: Option<String>,
    expires_in_days: Option<i64>,
) -> Result<String> {
    if secret.is_empty() {
        anyhow::bail!("a signing secret is required (--secret or FCDDNS_JWT_SECRET)");
    }

    let mut credential = Credential::new(host, domain).with_slot(slot);
    if let Some(ip) = ip {
        ip.parse::<Ipv4Addr>()
            .with_context(|| format!("--ip must be an IPv4 address, got {ip}"))?;
        credential = credential.with_ip(ip);
    }

    let token = CredentialSigner::new(secret.as_bytes())
        .sign(&credential, expires_in_days.map(chrono::Duration::days))?;
    Ok(token)
}

/// Verify a token and describe its claims
pub fn verify(secret: &str, token: &str, enforce_expiry: bool) -> Result<String> {
    let expiry = if enforce_expiry {
        ExpiryPolicy::Enforce
    } else {
        ExpiryPolicy::Never
    };

    let credential = CredentialValidator::new(secret.as_bytes(), expiry)
        .validate(token)
        .map_err(|e| match e {
            fcddns_core::Error::InvalidCredential(cause) => {
                anyhow::anyhow!("valid: false ({cause})")
            }
            other => anyhow::anyhow!("valid: false ({other})"),
        })?;

    Ok(format!(
        "host: {}\ndomain: {}\nslot: {}\nip: {}\nfqdn: {}\nvalid: true",
        credential.host,
        credential.domain,
        credential.slot,
        credential.ip.as_deref().unwrap_or(""),
        credential.fqdn()
    ))
}

/// `-` reads the first line of stdin
fn read_token(arg: &str) -> Result<String> {
    if arg != "-" {
        return Ok(arg.trim().to_string());
    }

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read token from stdin")?;
    Ok(line.trim().to_string())
}
