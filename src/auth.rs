//! Role lookup for bearer tokens.
//!
//! Tokens are never stored in clear: the configuration holds their SHA-256
//! hex digests. With no tokens configured every caller is treated as admin.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::AuthConfig;

/// Caller role, ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Read-only access.
    Viewer,
    /// Field officer: may write measurements.
    Petugas,
    /// Full access, including substation CRUD, import, and maintenance.
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Viewer => "viewer",
            Self::Petugas => "petugas",
            Self::Admin => "admin",
        })
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No bearer token on a request that needs one.
    MissingToken,
    /// Token does not match any configured digest.
    UnknownToken,
    /// Token is valid but its role is too weak.
    Forbidden { required: Role, actual: Role },
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingToken => write!(f, "missing bearer token"),
            Self::UnknownToken => write!(f, "unknown token"),
            Self::Forbidden { required, actual } => {
                write!(f, "role {actual} may not perform this action (requires {required})")
            }
        }
    }
}

/// SHA-256 hex digest of a token, as stored in the configuration.
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

/// Digest-to-role map built from [`AuthConfig`].
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    roles: HashMap<String, Role>,
}

impl TokenRegistry {
    pub fn from_config(cfg: &AuthConfig) -> Self {
        let roles = cfg
            .tokens
            .iter()
            .map(|t| (t.sha256.trim().to_ascii_lowercase(), t.role))
            .collect();
        Self { roles }
    }

    /// Returns `true` when at least one token is configured.
    pub fn is_enabled(&self) -> bool {
        !self.roles.is_empty()
    }

    /// Resolves an `Authorization` header value to a role and checks it
    /// against `required`.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthError`] when the token is missing, unknown, or its
    /// role ranks below `required`.
    pub fn authorize(&self, header: Option<&str>, required: Role) -> Result<Role, AuthError> {
        if !self.is_enabled() {
            return Ok(Role::Admin);
        }
        let token = header
            .and_then(|h| h.trim().strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingToken)?;
        let actual = *self
            .roles
            .get(&hash_token(token))
            .ok_or(AuthError::UnknownToken)?;
        if actual < required {
            return Err(AuthError::Forbidden { required, actual });
        }
        Ok(actual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenConfig;

    fn registry() -> TokenRegistry {
        TokenRegistry::from_config(&AuthConfig {
            tokens: vec![
                TokenConfig {
                    role: Role::Viewer,
                    sha256: hash_token("view-token"),
                },
                TokenConfig {
                    role: Role::Petugas,
                    sha256: hash_token("field-token").to_ascii_uppercase(),
                },
            ],
        })
    }

    #[test]
    fn known_digest() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn disabled_registry_grants_admin() {
        let reg = TokenRegistry::default();
        assert!(!reg.is_enabled());
        assert_eq!(reg.authorize(None, Role::Admin), Ok(Role::Admin));
    }

    #[test]
    fn role_ordering() {
        assert!(Role::Viewer < Role::Petugas);
        assert!(Role::Petugas < Role::Admin);
    }

    #[test]
    fn role_display_pads() {
        assert_eq!(format!("{:<8}|", Role::Admin), "admin   |");
        assert_eq!(format!("{:>7}", Role::Viewer), " viewer");
    }

    #[test]
    fn authorize_checks_token_and_role() {
        let reg = registry();
        assert_eq!(
            reg.authorize(None, Role::Viewer),
            Err(AuthError::MissingToken)
        );
        assert_eq!(
            reg.authorize(Some("Bearer nope"), Role::Viewer),
            Err(AuthError::UnknownToken)
        );
        assert_eq!(
            reg.authorize(Some("Bearer view-token"), Role::Viewer),
            Ok(Role::Viewer)
        );
        assert_eq!(
            reg.authorize(Some("Bearer view-token"), Role::Petugas),
            Err(AuthError::Forbidden {
                required: Role::Petugas,
                actual: Role::Viewer
            })
        );
        // Digests are matched case-insensitively.
        assert_eq!(
            reg.authorize(Some("Bearer field-token"), Role::Viewer),
            Ok(Role::Petugas)
        );
    }
}
