// models/tier.rs
use serde::Serialize;

pub const DEFAULT_TIERS: &str = "25000000:30,67500000:90,120000000:180";

/// One purchasable amount (minor currency units) and the subscription length it buys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tier {
    pub amount: i64,
    pub days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierTable {
    tiers: Vec<Tier>,
}

impl TierTable {
    pub fn new(tiers: Vec<Tier>) -> Result<Self, String> {
        if tiers.is_empty() {
            return Err("tier table is empty".to_string());
        }
        for (i, tier) in tiers.iter().enumerate() {
            if tier.amount <= 0 {
                return Err(format!("tier amount must be positive, got {}", tier.amount));
            }
            if tier.days == 0 {
                return Err(format!("tier {} grants zero days", tier.amount));
            }
            if tiers[..i].iter().any(|t| t.amount == tier.amount) {
                return Err(format!("duplicate tier amount {}", tier.amount));
            }
        }
        Ok(TierTable { tiers })
    }

    /// Parses `amount:days,amount:days`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let tiers = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let (amount, days) = entry
                    .split_once(':')
                    .ok_or_else(|| format!("tier '{}' must look like amount:days", entry))?;
                let amount = amount
                    .trim()
                    .parse::<i64>()
                    .map_err(|e| format!("tier amount '{}': {}", amount, e))?;
                let days = days
                    .trim()
                    .parse::<u32>()
                    .map_err(|e| format!("tier days '{}': {}", days, e))?;
                Ok(Tier { amount, days })
            })
            .collect::<Result<Vec<_>, String>>()?;

        TierTable::new(tiers)
    }

    pub fn find(&self, amount: i64) -> Option<Tier> {
        self.tiers.iter().copied().find(|tier| tier.amount == amount)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tier> {
        self.tiers.iter()
    }
}

impl Default for TierTable {
    fn default() -> Self {
        TierTable {
            tiers: vec![
                Tier { amount: 25_000_000, days: 30 },
                Tier { amount: 67_500_000, days: 90 },
                Tier { amount: 120_000_000, days: 180 },
            ],
        }
    }
}
