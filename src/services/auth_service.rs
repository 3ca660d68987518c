// services/auth_service.rs
use base64::{engine::general_purpose::STANDARD as base64, Engine as _};
use std::sync::RwLock;
use tracing::{info, warn};

use crate::errors::{AppError, Result};

/// Checks the `Authorization: Basic` credential the payment network sends
/// with every RPC call. The secret can be rotated while the server runs.
pub struct MerchantAuth {
    login: String,
    secret: RwLock<String>,
}

impl MerchantAuth {
    pub fn new(login: impl Into<String>, secret: impl Into<String>) -> Self {
        MerchantAuth {
            login: login.into(),
            secret: RwLock::new(secret.into()),
        }
    }

    /// Never panics; any malformed or mismatched credential is `false`.
    pub fn authorize(&self, header: Option<&str>) -> bool {
        let Some((login, password)) = header.and_then(decode_basic) else {
            warn!("Rejected RPC call: missing or malformed Basic credential");
            return false;
        };

        if login != self.login {
            warn!("Rejected RPC call: unexpected login");
            return false;
        }

        let secret = match self.secret.read() {
            Ok(secret) => secret,
            Err(_) => return false,
        };

        if password != *secret {
            warn!("Rejected RPC call: secret mismatch");
            return false;
        }

        true
    }

    pub fn rotate_secret(&self, new_secret: &str) -> Result<()> {
        let new_secret = new_secret.trim();
        if new_secret.is_empty() {
            return Err(AppError::invalid_data("secret must not be empty"));
        }

        let mut secret = self
            .secret
            .write()
            .map_err(|_| AppError::service("merchant secret lock poisoned"))?;
        *secret = new_secret.to_string();

        info!("Merchant secret rotated");
        Ok(())
    }
}

fn decode_basic(header: &str) -> Option<(String, String)> {
    let (scheme, encoded) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = base64.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (login, password) = decoded.split_once(':')?;
    Some((login.to_string(), password.to_string()))
}
