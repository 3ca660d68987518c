// services/checkout_service.rs
use base64::{engine::general_purpose::STANDARD as base64, Engine as _};
use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::{AppError, Result};
use crate::models::receipt::ReceiptItem;
use crate::models::tier::{Tier, TierTable};
use crate::models::transaction::ACCOUNT_FIELD;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Uz,
    Ru,
    En,
}

impl Locale {
    pub fn as_str(self) -> &'static str {
        match self {
            Locale::Uz => "uz",
            Locale::Ru => "ru",
            Locale::En => "en",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    pub merchant_id: String,
    pub checkout_url: String,
    pub callback_url: String,
    pub callback_timeout_ms: u64,
    pub tiers: TierTable,
    pub receipt: ReceiptItem,
}

/// What the end user is about to buy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub amount: i64,
    pub login: String,
    pub locale: Locale,
}

/// Builds the redirect link and the auto-submit form that send the end user
/// to the hosted checkout page.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    settings: CheckoutSettings,
}

fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty()
        || trimmed.contains(['{', '}', '$'])
        || trimmed.eq_ignore_ascii_case("undefined")
        || trimmed.eq_ignore_ascii_case("null")
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl CheckoutService {
    pub fn new(settings: CheckoutSettings) -> Self {
        CheckoutService { settings }
    }

    fn host(&self) -> &str {
        self.settings.checkout_url.trim_end_matches('/')
    }

    fn resolve(&self, request: &CheckoutRequest) -> Result<Tier> {
        if self.settings.merchant_id.trim().is_empty() {
            return Err(AppError::configuration("merchant identity is not configured"));
        }
        if self.settings.checkout_url.trim().is_empty() {
            return Err(AppError::configuration("checkout host is not configured"));
        }

        let tier = self.settings.tiers.find(request.amount).ok_or_else(|| {
            AppError::checkout(format!("amount {} is not a configured tier", request.amount))
        })?;

        if is_placeholder(&request.login) || request.login.contains([';', '=']) {
            return Err(AppError::checkout(format!(
                "account {} '{}' is not a usable value",
                ACCOUNT_FIELD, request.login
            )));
        }

        Ok(tier)
    }

    /// `m=..;a=..;ac.Login=..;l=..;c=..;ct=..`; the callback pair is left out
    /// when no callback URL is configured.
    pub fn param_string(&self, request: &CheckoutRequest) -> Result<String> {
        let tier = self.resolve(request)?;

        let mut params = vec![
            ("m".to_string(), self.settings.merchant_id.clone()),
            ("a".to_string(), tier.amount.to_string()),
            (format!("ac.{}", ACCOUNT_FIELD), request.login.clone()),
            ("l".to_string(), request.locale.as_str().to_string()),
        ];
        if !self.settings.callback_url.trim().is_empty() {
            params.push(("c".to_string(), self.settings.callback_url.clone()));
            params.push(("ct".to_string(), self.settings.callback_timeout_ms.to_string()));
        }

        if let Some((key, value)) = params.iter().find(|(_, value)| is_placeholder(value)) {
            warn!("Refusing checkout link with unresolved {}='{}'", key, value);
            return Err(AppError::checkout(format!("parameter {} has an unresolved value", key)));
        }

        Ok(params
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(";"))
    }

    pub fn checkout_url(&self, request: &CheckoutRequest) -> Result<String> {
        let params = self.param_string(request)?;
        let encoded = base64.encode(&params);

        let decoded = base64
            .decode(&encoded)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok());
        if decoded.as_deref() != Some(params.as_str()) {
            return Err(AppError::checkout("encoded checkout parameters did not round-trip"));
        }

        info!("Built checkout link for {} ({})", request.login, request.amount);
        Ok(format!("{}/{}", self.host(), encoded))
    }

    pub fn checkout_form(&self, request: &CheckoutRequest) -> Result<String> {
        let tier = self.resolve(request)?;
        let detail = serde_json::to_string(&self.settings.receipt.detail(&tier))?;

        let mut fields = vec![
            ("merchant".to_string(), self.settings.merchant_id.clone()),
            ("amount".to_string(), tier.amount.to_string()),
            (format!("account[{}]", ACCOUNT_FIELD), request.login.clone()),
            ("lang".to_string(), request.locale.as_str().to_string()),
        ];
        if !self.settings.callback_url.trim().is_empty() {
            fields.push(("callback".to_string(), self.settings.callback_url.clone()));
            fields.push((
                "callback_timeout".to_string(),
                self.settings.callback_timeout_ms.to_string(),
            ));
        }
        if let Some((name, value)) = fields.iter().find(|(_, value)| is_placeholder(value)) {
            warn!("Refusing checkout form with unresolved {}='{}'", name, value);
            return Err(AppError::checkout(format!("field {} has an unresolved value", name)));
        }
        fields.push(("description".to_string(), ReceiptItem::title(&tier)));
        fields.push(("detail".to_string(), base64.encode(detail)));

        let inputs: String = fields
            .iter()
            .map(|(name, value)| {
                format!(
                    "    <input type=\"hidden\" name=\"{}\" value=\"{}\"/>\n",
                    escape_html(name),
                    escape_html(value)
                )
            })
            .collect();

        info!("Built checkout form for {} ({})", request.login, request.amount);
        Ok(format!(
            "<!DOCTYPE html>\n<html>\n<body>\n  <form id=\"checkout\" method=\"POST\" action=\"{}/\">\n{}  </form>\n  <script>document.getElementById('checkout').submit();</script>\n</body>\n</html>\n",
            escape_html(self.host()),
            inputs
        ))
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    pub fn settings() -> CheckoutSettings {
        CheckoutSettings {
            merchant_id: "5e730e8e0b852a417aa49ceb".to_string(),
            checkout_url: "https://checkout.paycom.uz".to_string(),
            callback_url: "https://edu.example.uz/payments/return".to_string(),
            callback_timeout_ms: 15000,
            tiers: TierTable::default(),
            receipt: ReceiptItem {
                code: "10899002001000000".to_string(),
                package_code: "1545643".to_string(),
                vat_percent: 0,
            },
        }
    }

    fn request(amount: i64, login: &str) -> CheckoutRequest {
        CheckoutRequest {
            amount,
            login: login.to_string(),
            locale: Locale::Ru,
        }
    }

    #[test]
    fn param_string_has_fixed_order() {
        let service = CheckoutService::new(settings());
        let params = service.param_string(&request(25_000_000, "userA")).unwrap();
        assert_eq!(
            params,
            "m=5e730e8e0b852a417aa49ceb;a=25000000;ac.Login=userA;l=ru;c=https://edu.example.uz/payments/return;ct=15000"
        );
    }

    #[test]
    fn callback_is_omitted_when_unset() {
        let mut settings = settings();
        settings.callback_url = String::new();
        let params = CheckoutService::new(settings)
            .param_string(&request(25_000_000, "userA"))
            .unwrap();
        assert!(!params.contains("c="));
        assert!(!params.contains("ct="));
    }

    #[test]
    fn url_carries_base64_params() {
        let service = CheckoutService::new(settings());
        let req = request(67_500_000, "userB");
        let url = service.checkout_url(&req).unwrap();

        let encoded = url.strip_prefix("https://checkout.paycom.uz/").unwrap();
        let decoded = String::from_utf8(base64.decode(encoded).unwrap()).unwrap();
        assert_eq!(decoded, service.param_string(&req).unwrap());
    }

    #[test]
    fn unknown_tier_is_rejected() {
        let err = CheckoutService::new(settings())
            .checkout_url(&request(99_999_999, "userA"))
            .unwrap_err();
        assert!(matches!(err, AppError::CheckoutError(_)));
    }

    #[test]
    fn missing_merchant_is_a_configuration_error() {
        let mut settings = settings();
        settings.merchant_id = "  ".to_string();
        let service = CheckoutService::new(settings);

        assert!(matches!(
            service.checkout_url(&request(25_000_000, "userA")),
            Err(AppError::ConfigurationError(_))
        ));
        assert!(matches!(
            service.checkout_form(&request(25_000_000, "userA")),
            Err(AppError::ConfigurationError(_))
        ));
    }

    #[test]
    fn placeholder_values_are_rejected() {
        let service = CheckoutService::new(settings());
        for login in ["", "undefined", "null", "${login}", "{{user}}", "a;b", "a=b"] {
            assert!(service.checkout_url(&request(25_000_000, login)).is_err(), "{}", login);
        }

        let mut settings = settings();
        settings.callback_url = "https://edu.example.uz/${path}".to_string();
        assert!(CheckoutService::new(settings)
            .checkout_url(&request(25_000_000, "userA"))
            .is_err());
    }

    #[test]
    fn form_rejects_unresolved_callback() {
        let mut settings = settings();
        settings.callback_url = "https://edu.example.uz/${path}".to_string();
        let service = CheckoutService::new(settings);

        let err = service
            .checkout_form(&request(25_000_000, "userA"))
            .unwrap_err();
        assert!(matches!(err, AppError::CheckoutError(_)));
        assert!(service.checkout_url(&request(25_000_000, "userA")).is_err());
    }

    #[test]
    fn form_posts_every_field() {
        let html = CheckoutService::new(settings())
            .checkout_form(&request(120_000_000, "userA"))
            .unwrap();

        assert!(html.contains("action=\"https://checkout.paycom.uz/\""));
        for name in [
            "merchant",
            "amount",
            "account[Login]",
            "lang",
            "callback",
            "callback_timeout",
            "description",
            "detail",
        ] {
            assert!(html.contains(&format!("name=\"{}\"", name)), "{}", name);
        }
        assert!(html.contains("value=\"120000000\""));
        assert!(html.contains(".submit()"));
    }

    #[test]
    fn form_detail_is_base64_receipt() {
        let html = CheckoutService::new(settings())
            .checkout_form(&request(25_000_000, "userA"))
            .unwrap();

        let marker = "name=\"detail\" value=\"";
        let start = html.find(marker).unwrap() + marker.len();
        let end = start + html[start..].find('"').unwrap();
        let detail: serde_json::Value =
            serde_json::from_slice(&base64.decode(&html[start..end]).unwrap()).unwrap();
        assert_eq!(detail["items"][0]["price"], 25_000_000);
    }

    #[test]
    fn html_is_escaped() {
        assert_eq!(escape_html("<a href=\"x\">&'"), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
