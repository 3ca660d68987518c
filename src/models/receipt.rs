// models/receipt.rs
use serde_json::{json, Value};

use crate::models::tier::Tier;

/// Fiscal item codes printed on the receipt the network issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptItem {
    pub code: String,
    pub package_code: String,
    pub vat_percent: u32,
}

impl ReceiptItem {
    pub fn title(tier: &Tier) -> String {
        format!("Subscription for {} days", tier.days)
    }

    pub fn detail(&self, tier: &Tier) -> Value {
        json!({
            "receipt_type": 0,
            "items": [{
                "title": Self::title(tier),
                "price": tier.amount,
                "count": 1,
                "code": self.code,
                "package_code": self.package_code,
                "vat_percent": self.vat_percent,
            }],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_lists_one_item_priced_at_the_tier() {
        let item = ReceiptItem {
            code: "10899002001000000".to_string(),
            package_code: "1545643".to_string(),
            vat_percent: 12,
        };
        let detail = item.detail(&Tier { amount: 67_500_000, days: 90 });

        assert_eq!(detail["receipt_type"], 0);
        let items = detail["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["price"], 67_500_000);
        assert_eq!(items[0]["vat_percent"], 12);
        assert_eq!(items[0]["title"], "Subscription for 90 days");
    }
}
