/// Monetization strategies
///
/// Six independently toggled strategies, each with its own typed config.
/// The database stores the config as JSON keyed by strategy; parsing goes
/// through [`StrategyConfig::parse`], so a malformed admin update is rejected
/// before it reaches storage and readers never see untyped JSON.
///
/// - [`cache`]: TTL cache abstraction for the settings snapshot
/// - [`reader`]: cached settings access with explicit invalidation
/// - [`commission`]: platform commission split
///
/// # Example
///
/// ```
/// use train_shared::monetization::{StrategyConfig, StrategyKey};
/// use serde_json::json;
///
/// let config = StrategyConfig::parse(
///     StrategyKey::PlatformCommission,
///     json!({ "commission_rate": 0.15 }),
/// )
/// .unwrap();
///
/// assert!(matches!(config, StrategyConfig::PlatformCommission(c) if c.commission_rate == 0.15));
/// ```

pub mod cache;
pub mod commission;
pub mod reader;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;

/// Error type for monetization settings
#[derive(Debug, thiserror::Error)]
pub enum MonetizationError {
    #[error("Unknown monetization strategy: {0}")]
    UnknownStrategy(String),

    #[error("Invalid config for {key}: {message}")]
    InvalidConfig { key: StrategyKey, message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Strategy identifier, matching `monetization_settings.strategy_key`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKey {
    PlatformCommission,
    CompanySubscriptions,
    PremiumTrainers,
    DataQualityGuarantee,
    FeaturedListings,
    ApiAccess,
}

impl StrategyKey {
    /// Every strategy in display order
    pub const ALL: [StrategyKey; 6] = [
        StrategyKey::PlatformCommission,
        StrategyKey::CompanySubscriptions,
        StrategyKey::PremiumTrainers,
        StrategyKey::DataQualityGuarantee,
        StrategyKey::FeaturedListings,
        StrategyKey::ApiAccess,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKey::PlatformCommission => "platform_commission",
            StrategyKey::CompanySubscriptions => "company_subscriptions",
            StrategyKey::PremiumTrainers => "premium_trainers",
            StrategyKey::DataQualityGuarantee => "data_quality_guarantee",
            StrategyKey::FeaturedListings => "featured_listings",
            StrategyKey::ApiAccess => "api_access",
        }
    }
}

impl std::fmt::Display for StrategyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKey {
    type Err = MonetizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StrategyKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| MonetizationError::UnknownStrategy(s.to_string()))
    }
}

/// `platform_commission`: share of each task payment kept by the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommissionConfig {
    /// Base rate in 0..=1
    pub commission_rate: f64,
}

impl Default for CommissionConfig {
    fn default() -> Self {
        Self { commission_rate: 0.20 }
    }
}

/// `company_subscriptions`: paid plans for clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompanySubscriptionsConfig {
    pub trial_days: u32,
}

/// `premium_trainers`: paid plans for trainers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PremiumTrainersConfig {
    /// Cap on how far a plan's `payment_bonus` may lower the commission rate
    pub max_payment_bonus: f64,
}

/// One quality tier of the `data_quality_guarantee` strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QualityTier {
    pub name: String,

    /// Price multiplier applied to the task payment
    pub multiplier: f64,

    /// Number of independent reviewers per item
    pub reviewers: u32,
}

/// `data_quality_guarantee`: multi-reviewer quality tiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QualityGuaranteeConfig {
    pub tiers: Vec<QualityTier>,
}

impl QualityGuaranteeConfig {
    /// Case-insensitive tier lookup
    pub fn tier(&self, name: &str) -> Option<&QualityTier> {
        self.tiers
            .iter()
            .find(|tier| tier.name.eq_ignore_ascii_case(name))
    }
}

/// `featured_listings`: paid placement for tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeaturedListingsConfig {
    pub featured_price_cents: i64,
    pub urgent_price_cents: i64,
    pub duration_days: u32,
}

/// `api_access`: programmatic access for clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiAccessConfig {
    pub price_monthly_cents: i64,
    pub requests_per_month: u64,
}

/// Typed strategy configuration, one variant per [`StrategyKey`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StrategyConfig {
    PlatformCommission(CommissionConfig),
    CompanySubscriptions(CompanySubscriptionsConfig),
    PremiumTrainers(PremiumTrainersConfig),
    DataQualityGuarantee(QualityGuaranteeConfig),
    FeaturedListings(FeaturedListingsConfig),
    ApiAccess(ApiAccessConfig),
}

impl StrategyConfig {
    /// Parses and validates the JSON config stored for `key`
    pub fn parse(key: StrategyKey, value: JsonValue) -> Result<Self, MonetizationError> {
        let invalid = |message: String| MonetizationError::InvalidConfig { key, message };
        let from_json = |e: serde_json::Error| invalid(e.to_string());

        let config = match key {
            StrategyKey::PlatformCommission => {
                StrategyConfig::PlatformCommission(serde_json::from_value(value).map_err(from_json)?)
            }
            StrategyKey::CompanySubscriptions => {
                StrategyConfig::CompanySubscriptions(serde_json::from_value(value).map_err(from_json)?)
            }
            StrategyKey::PremiumTrainers => {
                StrategyConfig::PremiumTrainers(serde_json::from_value(value).map_err(from_json)?)
            }
            StrategyKey::DataQualityGuarantee => {
                StrategyConfig::DataQualityGuarantee(serde_json::from_value(value).map_err(from_json)?)
            }
            StrategyKey::FeaturedListings => {
                StrategyConfig::FeaturedListings(serde_json::from_value(value).map_err(from_json)?)
            }
            StrategyKey::ApiAccess => {
                StrategyConfig::ApiAccess(serde_json::from_value(value).map_err(from_json)?)
            }
        };

        config.validate().map_err(invalid)?;
        Ok(config)
    }

    /// Strategy this config belongs to
    pub fn key(&self) -> StrategyKey {
        match self {
            StrategyConfig::PlatformCommission(_) => StrategyKey::PlatformCommission,
            StrategyConfig::CompanySubscriptions(_) => StrategyKey::CompanySubscriptions,
            StrategyConfig::PremiumTrainers(_) => StrategyKey::PremiumTrainers,
            StrategyConfig::DataQualityGuarantee(_) => StrategyKey::DataQualityGuarantee,
            StrategyConfig::FeaturedListings(_) => StrategyKey::FeaturedListings,
            StrategyConfig::ApiAccess(_) => StrategyKey::ApiAccess,
        }
    }

    /// Serializes back to the stored JSON form
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            StrategyConfig::PlatformCommission(c) => {
                if !(0.0..=1.0).contains(&c.commission_rate) {
                    return Err("commission_rate must be between 0 and 1".to_string());
                }
            }
            StrategyConfig::CompanySubscriptions(_) => {}
            StrategyConfig::PremiumTrainers(c) => {
                if !(0.0..=1.0).contains(&c.max_payment_bonus) {
                    return Err("max_payment_bonus must be between 0 and 1".to_string());
                }
            }
            StrategyConfig::DataQualityGuarantee(c) => {
                if c.tiers.is_empty() {
                    return Err("at least one tier is required".to_string());
                }
                for tier in &c.tiers {
                    if tier.name.trim().is_empty() {
                        return Err("tier name must not be empty".to_string());
                    }
                    if tier.multiplier < 1.0 {
                        return Err(format!("tier {} multiplier must be at least 1", tier.name));
                    }
                    if tier.reviewers == 0 {
                        return Err(format!("tier {} needs at least one reviewer", tier.name));
                    }
                }
            }
            StrategyConfig::FeaturedListings(c) => {
                if c.featured_price_cents < 0 || c.urgent_price_cents < 0 {
                    return Err("prices must not be negative".to_string());
                }
                if c.duration_days == 0 {
                    return Err("duration_days must be positive".to_string());
                }
            }
            StrategyConfig::ApiAccess(c) => {
                if c.price_monthly_cents < 0 {
                    return Err("price_monthly_cents must not be negative".to_string());
                }
            }
        }

        Ok(())
    }
}

/// One strategy's parsed state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategySetting {
    pub key: StrategyKey,
    pub enabled: bool,
    pub config: StrategyConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strategy_key_round_trips_through_str() {
        for key in StrategyKey::ALL {
            assert_eq!(key.as_str().parse::<StrategyKey>().unwrap(), key);
        }
        assert!(matches!(
            "loyalty_points".parse::<StrategyKey>(),
            Err(MonetizationError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_parse_each_seeded_config() {
        let seeded = [
            (StrategyKey::PlatformCommission, json!({"commission_rate": 0.20})),
            (StrategyKey::CompanySubscriptions, json!({"trial_days": 14})),
            (StrategyKey::PremiumTrainers, json!({"max_payment_bonus": 0.10})),
            (
                StrategyKey::DataQualityGuarantee,
                json!({"tiers": [{"name": "gold", "multiplier": 2.0, "reviewers": 3}]}),
            ),
            (
                StrategyKey::FeaturedListings,
                json!({"featured_price_cents": 2900, "urgent_price_cents": 4900, "duration_days": 7}),
            ),
            (
                StrategyKey::ApiAccess,
                json!({"price_monthly_cents": 9900, "requests_per_month": 100000}),
            ),
        ];

        for (key, value) in seeded {
            let config = StrategyConfig::parse(key, value.clone()).unwrap();
            assert_eq!(config.key(), key);
            assert_eq!(config.to_json(), value);
        }
    }

    #[test]
    fn test_parse_rejects_wrong_shape() {
        let err = StrategyConfig::parse(StrategyKey::PlatformCommission, json!({"trial_days": 14}))
            .unwrap_err();
        assert!(matches!(
            err,
            MonetizationError::InvalidConfig { key: StrategyKey::PlatformCommission, .. }
        ));
    }

    #[test]
    fn test_parse_rejects_out_of_range_values() {
        assert!(StrategyConfig::parse(
            StrategyKey::PlatformCommission,
            json!({"commission_rate": 1.5})
        )
        .is_err());
        assert!(StrategyConfig::parse(StrategyKey::DataQualityGuarantee, json!({"tiers": []})).is_err());
        assert!(StrategyConfig::parse(
            StrategyKey::DataQualityGuarantee,
            json!({"tiers": [{"name": "cheap", "multiplier": 0.5, "reviewers": 1}]})
        )
        .is_err());
        assert!(StrategyConfig::parse(
            StrategyKey::FeaturedListings,
            json!({"featured_price_cents": 100, "urgent_price_cents": 200, "duration_days": 0})
        )
        .is_err());
    }

    #[test]
    fn test_quality_tier_lookup_is_case_insensitive() {
        let config = QualityGuaranteeConfig {
            tiers: vec![QualityTier {
                name: "Verified".to_string(),
                multiplier: 1.5,
                reviewers: 2,
            }],
        };

        assert_eq!(config.tier("verified").map(|t| t.reviewers), Some(2));
        assert!(config.tier("gold").is_none());
    }
}
