//! Shared identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// Blake3 hex digest of a rendered descriptor. Serializes as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Fingerprint {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The services every generated environment manages.
pub mod services {
    pub const DB: &str = "db";
    pub const WORDPRESS: &str = "wordpress";
    pub const PHPMYADMIN: &str = "phpmyadmin";
    pub const MAILPIT: &str = "mailpit";
    pub const WPCLI: &str = "wpcli";

    /// Every managed service, in the order status is reported.
    pub const ALL: [&str; 5] = [DB, WORDPRESS, PHPMYADMIN, MAILPIT, WPCLI];
}
