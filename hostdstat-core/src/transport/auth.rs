//! Authentication method negotiation
//!
//! The order is fixed: password when offered, keyboard-interactive
//! otherwise (every prompt answered with the password). A server that
//! reports no methods at all gets a direct password attempt, which is
//! refused up front for an empty password.

use crate::error::{HostdError, HostdResult};

/// Authentication methods a server may advertise
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthMethod {
    /// `password`
    Password,
    /// `keyboard-interactive`
    KeyboardInteractive,
    /// `publickey`
    PublicKey,
    /// `hostbased`
    HostBased,
    /// Anything else, kept by wire name
    Other(String),
}

impl AuthMethod {
    /// Parses a method from its SSH wire name
    #[must_use]
    pub fn from_wire_name(name: &str) -> Self {
        match name.trim() {
            "password" => Self::Password,
            "keyboard-interactive" => Self::KeyboardInteractive,
            "publickey" => Self::PublicKey,
            "hostbased" => Self::HostBased,
            other => Self::Other(other.to_string()),
        }
    }

    /// Parses a comma separated method list such as `publickey,password`
    #[must_use]
    pub fn parse_list(list: &str) -> Vec<Self> {
        list.split(',')
            .filter(|s| !s.trim().is_empty())
            .map(Self::from_wire_name)
            .collect()
    }
}

/// The authentication step the connector should perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthPlan {
    /// Plain password authentication
    Password,
    /// Challenge/response, answering each prompt with the password
    KeyboardInteractive,
}

/// Chooses how to authenticate.
///
/// `offered` is `None` when the server declined to report its methods.
///
/// # Errors
///
/// Returns [`HostdError::Authentication`] when the password is empty and no
/// methods were reported, or when neither password nor keyboard-interactive
/// is offered.
pub fn select_auth_plan(
    host: &str,
    offered: Option<&[AuthMethod]>,
    password: &str,
) -> HostdResult<AuthPlan> {
    let Some(methods) = offered else {
        if password.is_empty() {
            return Err(HostdError::auth(host, "empty password not supported"));
        }
        return Ok(AuthPlan::Password);
    };

    if methods.contains(&AuthMethod::Password) {
        Ok(AuthPlan::Password)
    } else if methods.contains(&AuthMethod::KeyboardInteractive) {
        Ok(AuthPlan::KeyboardInteractive)
    } else {
        Err(HostdError::auth(host, "no compatible method"))
    }
}

/// Answers for one keyboard-interactive round
#[must_use]
pub fn keyboard_interactive_responses(password: &str, prompts: usize) -> Vec<String> {
    vec![password.to_string(); prompts]
}
