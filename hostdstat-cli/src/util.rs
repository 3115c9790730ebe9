//! Shared utility functions used across command modules.

use std::path::Path;

use hostdstat_core::Settings;
use hostdstat_core::host::{Credentials, Host};
use secrecy::SecretString;

use crate::error::CliError;

/// Loads settings from the `--config` path or the default location
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings, CliError> {
    Settings::load_or_default(config_path)
        .map_err(|e| CliError::Config(format!("Failed to load settings: {e}")))
}

/// Splits `address[:port]`, leaving bracketed or bare IPv6 addresses intact
pub fn parse_host_spec(spec: &str, default_port: u16) -> Result<(String, u16), CliError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(CliError::Input("empty host".to_string()));
    }

    if let Some(rest) = spec.strip_prefix('[') {
        let (address, tail) = rest
            .split_once(']')
            .ok_or_else(|| CliError::Input(format!("unterminated '[' in `{spec}`")))?;
        let port = match tail.strip_prefix(':') {
            Some(port) => parse_port(port, spec)?,
            None if tail.is_empty() => default_port,
            None => return Err(CliError::Input(format!("unexpected `{tail}` in `{spec}`"))),
        };
        return Ok((address.to_string(), port));
    }

    match spec.split_once(':') {
        Some((address, port)) if !port.contains(':') => {
            Ok((address.to_string(), parse_port(port, spec)?))
        }
        _ => Ok((spec.to_string(), default_port)),
    }
}

fn parse_port(port: &str, spec: &str) -> Result<u16, CliError> {
    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(CliError::Input(format!("invalid port in `{spec}`"))),
        Ok(port) => Ok(port),
    }
}

/// Host specs from hosts-file text: one per line, blank lines and `#`
/// comments ignored
pub fn parse_hosts_file(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split_once('#').map_or(line, |(before, _)| before).trim())
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Builds hosts from specs, skipping duplicates of an earlier address and port
pub fn hosts_from_specs(
    specs: &[String],
    default_port: u16,
    username: &str,
    password: &SecretString,
) -> Result<Vec<Host>, CliError> {
    let mut hosts: Vec<Host> = Vec::with_capacity(specs.len());
    for spec in specs {
        let (address, port) = parse_host_spec(spec, default_port)?;
        if hosts.iter().any(|h| h.address == address && h.port == port) {
            tracing::debug!(host = %address, port, "Skipping duplicate host");
            continue;
        }
        hosts.push(
            Host::new(address, Credentials::with_secret(username, password.clone())).with_port(port),
        );
    }
    Ok(hosts)
}

/// Password from the argument/environment, or an interactive prompt
pub fn resolve_password(password: Option<&str>, username: &str) -> Result<SecretString, CliError> {
    if let Some(pwd) = password {
        return Ok(SecretString::from(pwd.to_string()));
    }
    eprint!("Enter SSH password for '{username}': ");
    rpassword::read_password()
        .map(SecretString::from)
        .map_err(|e| CliError::Password(format!("Failed to read password: {e}")))
}
