// config.rs
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::{AppError, Result};
use crate::models::receipt::ReceiptItem;
use crate::models::tier::{TierTable, DEFAULT_TIERS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    MongoDb,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreKind::Memory),
            "mongodb" | "mongo" => Ok(StoreKind::MongoDb),
            other => Err(format!("unknown store '{}', expected memory or mongodb", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub merchant_id: String,
    pub secret_key: String,
    pub auth_login: String,
    pub checkout_url: String,
    pub callback_url: String,
    pub callback_timeout_ms: u64,
    pub tiers: TierTable,
    pub receipt: ReceiptItem,
    pub bridge_timeout: Duration,
    pub transaction_timeout_ms: i64,
    pub retention_days: u64,
    pub retention_sweep_interval: Duration,
    pub store: StoreKind,
    pub database_url: String,
    pub database_name: String,
    pub port: u16,
    pub host: String,
}

fn required(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::configuration(format!("{} must be set", name)))
}

fn or_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parsed<T>(name: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = or_default(name, default);
    raw.trim()
        .parse()
        .map_err(|e| AppError::configuration(format!("{}='{}': {}", name, raw, e)))
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let tiers = TierTable::parse(&or_default("PAYMENT_TIERS", DEFAULT_TIERS))
            .map_err(|e| AppError::configuration(format!("PAYMENT_TIERS: {}", e)))?;

        Ok(AppConfig {
            merchant_id: required("PAYMENT_MERCHANT_ID")?,
            secret_key: required("PAYMENT_SECRET_KEY")?,
            auth_login: or_default("PAYMENT_AUTH_LOGIN", "Paycom"),
            checkout_url: or_default("PAYMENT_CHECKOUT_URL", "https://checkout.paycom.uz"),
            callback_url: or_default("PAYMENT_CALLBACK_URL", ""),
            callback_timeout_ms: parsed("PAYMENT_CALLBACK_TIMEOUT_MS", "15000")?,
            tiers,
            receipt: ReceiptItem {
                code: or_default("PAYMENT_ITEM_CODE", "10899002001000000"),
                package_code: or_default("PAYMENT_PACKAGE_CODE", "1545643"),
                vat_percent: parsed("PAYMENT_VAT_PERCENT", "0")?,
            },
            bridge_timeout: Duration::from_millis(parsed("PAYMENT_BRIDGE_TIMEOUT_MS", "5000")?),
            transaction_timeout_ms: parsed("PAYMENT_TRANSACTION_TIMEOUT_MS", "0")?,
            retention_days: parsed("PAYMENT_RETENTION_DAYS", "7")?,
            retention_sweep_interval: Duration::from_secs(parsed(
                "PAYMENT_RETENTION_SWEEP_SECS",
                "3600",
            )?),
            store: parsed("TRANSACTION_STORE", "memory")?,
            database_url: required("DATABASE_URL")?,
            database_name: or_default("DATABASE_NAME", "eduplatform"),
            port: parsed("PORT", "10000")?,
            host: or_default("HOST", "0.0.0.0"),
        })
    }

    pub fn get_config_info(&self) -> serde_json::Value {
        serde_json::json!({
            "merchant_id_set": !self.merchant_id.is_empty(),
            "auth_login": self.auth_login,
            "checkout_url": self.checkout_url,
            "callback_url": self.callback_url,
            "tiers": self.tiers.iter().collect::<Vec<_>>(),
            "store": format!("{:?}", self.store),
            "bridge_timeout_ms": self.bridge_timeout.as_millis() as u64,
            "transaction_timeout_ms": self.transaction_timeout_ms,
            "retention_days": self.retention_days,
            "port": self.port,
            "host": self.host,
        })
    }
}
