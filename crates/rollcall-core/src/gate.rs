//! Access gate: the account-creation predicate.

use tracing::info;

use crate::{Error, Result};

/// Reason carried by [`Error::PermissionDenied`] when the gate rejects.
pub const UNAUTHORIZED_EMAIL: &str = "Unauthorized email";

/// Admits only accounts whose email belongs to one organisational domain.
///
/// The domain is matched exactly against everything after the last `@`,
/// ignoring ASCII case. Subdomains and look-alike suffixes do not match.
#[derive(Debug, Clone)]
pub struct AccessGate {
  domain: String,
}

impl AccessGate {
  /// `domain` may be given with or without a leading `@`.
  pub fn new(domain: impl Into<String>) -> Self {
    let domain = domain.into();
    let domain = domain.trim().trim_start_matches('@').to_owned();
    Self { domain }
  }

  pub fn domain(&self) -> &str { &self.domain }

  pub fn admits(&self, email: &str) -> bool {
    match email.rsplit_once('@') {
      Some((local, domain)) => {
        !local.is_empty()
          && !self.domain.is_empty()
          && domain.eq_ignore_ascii_case(&self.domain)
      }
      None => false,
    }
  }

  /// Allow or reject creation of an account for `email`.
  pub fn check(&self, email: &str) -> Result<()> {
    if self.admits(email) {
      return Ok(());
    }
    info!("Unauthorized email: {email}");
    Err(Error::PermissionDenied(UNAUTHORIZED_EMAIL.to_owned()))
  }
}
