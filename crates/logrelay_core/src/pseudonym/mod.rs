pub mod salt;
pub mod token;

pub use salt::*;
pub use token::*;

use crate::config::RelayConfig;
use crate::error::Result;

/// Construct a SaltProvider from relay config, honoring its assurance mode
pub fn from_config(cfg: &RelayConfig) -> Result<salt::SaltProvider> {
    salt::SaltProvider::from_secret(cfg.secret.as_deref(), cfg.fallback_salt_allowed)
}
