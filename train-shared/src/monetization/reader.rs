/// Cached access to monetization settings
///
/// [`SettingsReader`] loads every strategy row from a [`SettingsSource`],
/// parses it into a [`SettingsSnapshot`] and keeps that snapshot in a
/// [`SettingsCache`]. Admin writes call [`SettingsReader::invalidate`]; other
/// readers pick up changes once the TTL runs out.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use train_shared::monetization::reader::SettingsReader;
/// use train_shared::monetization::StrategyKey;
///
/// # async fn example(pool: sqlx::PgPool) -> Result<(), train_shared::monetization::MonetizationError> {
/// let settings = SettingsReader::postgres(pool, Duration::from_secs(300));
///
/// if settings.is_enabled(StrategyKey::PlatformCommission).await? {
///     let policy = settings.commission_policy().await?;
///     println!("commission rate: {}", policy.rate);
/// }
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::cache::{SettingsCache, TtlCache};
use super::commission::CommissionPolicy;
use super::{MonetizationError, QualityTier, StrategyConfig, StrategyKey, StrategySetting};
use crate::models::monetization::MonetizationSettingRow;

/// Where settings rows come from
#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn load(&self) -> Result<Vec<MonetizationSettingRow>, MonetizationError>;
}

/// Reads `monetization_settings` from PostgreSQL
pub struct PgSettingsSource {
    pool: PgPool,
}

impl PgSettingsSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsSource for PgSettingsSource {
    async fn load(&self) -> Result<Vec<MonetizationSettingRow>, MonetizationError> {
        Ok(MonetizationSettingRow::list_all(&self.pool).await?)
    }
}

/// Parsed view of every strategy at one point in time
#[derive(Debug, Clone, Default)]
pub struct SettingsSnapshot {
    settings: HashMap<StrategyKey, StrategySetting>,
}

impl SettingsSnapshot {
    /// Builds a snapshot, skipping rows with unknown keys or unparseable config
    pub fn from_rows(rows: Vec<MonetizationSettingRow>) -> Self {
        let mut settings = HashMap::new();

        for row in rows {
            let key = match row.strategy_key.parse::<StrategyKey>() {
                Ok(key) => key,
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring monetization row");
                    continue;
                }
            };

            match StrategyConfig::parse(key, row.config) {
                Ok(config) => {
                    settings.insert(
                        key,
                        StrategySetting {
                            key,
                            enabled: row.is_enabled,
                            config,
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(strategy = %key, error = %e, "Treating strategy as disabled");
                }
            }
        }

        Self { settings }
    }

    pub fn get(&self, key: StrategyKey) -> Option<&StrategySetting> {
        self.settings.get(&key)
    }

    /// Missing strategies count as disabled
    pub fn is_enabled(&self, key: StrategyKey) -> bool {
        self.get(key).map(|s| s.enabled).unwrap_or(false)
    }

    fn enabled_config(&self, key: StrategyKey) -> Option<&StrategyConfig> {
        self.get(key).filter(|s| s.enabled).map(|s| &s.config)
    }

    /// Commission inputs honouring both the commission and premium strategies
    pub fn commission_policy(&self) -> CommissionPolicy {
        let rate = match self.enabled_config(StrategyKey::PlatformCommission) {
            Some(StrategyConfig::PlatformCommission(c)) => c.commission_rate,
            _ => return CommissionPolicy::disabled(),
        };

        let max_bonus = match self.enabled_config(StrategyKey::PremiumTrainers) {
            Some(StrategyConfig::PremiumTrainers(c)) => c.max_payment_bonus,
            _ => 0.0,
        };

        CommissionPolicy { rate, max_bonus }
    }

    /// Looks up a quality tier; `None` when the guarantee is off or the tier is unknown
    pub fn quality_tier(&self, name: &str) -> Option<QualityTier> {
        match self.enabled_config(StrategyKey::DataQualityGuarantee) {
            Some(StrategyConfig::DataQualityGuarantee(c)) => c.tier(name).cloned(),
            _ => None,
        }
    }
}

/// Cached, shareable settings reader
#[derive(Clone)]
pub struct SettingsReader {
    source: Arc<dyn SettingsSource>,
    cache: Arc<dyn SettingsCache<Arc<SettingsSnapshot>>>,
}

impl SettingsReader {
    pub fn new(source: Arc<dyn SettingsSource>, ttl: Duration) -> Self {
        Self {
            source,
            cache: Arc::new(TtlCache::new(ttl)),
        }
    }

    /// Reader backed by the `monetization_settings` table
    pub fn postgres(pool: PgPool, ttl: Duration) -> Self {
        Self::new(Arc::new(PgSettingsSource::new(pool)), ttl)
    }

    /// Current snapshot, loading from the source on a cache miss
    pub async fn snapshot(&self) -> Result<Arc<SettingsSnapshot>, MonetizationError> {
        if let Some(snapshot) = self.cache.get() {
            return Ok(snapshot);
        }

        let generation = self.cache.generation();
        let rows = self.source.load().await?;
        let snapshot = Arc::new(SettingsSnapshot::from_rows(rows));

        if !self.cache.insert(generation, snapshot.clone()) {
            tracing::debug!("Settings changed during load; snapshot not cached");
        }

        tracing::debug!(strategies = snapshot.settings.len(), "Loaded monetization settings");

        Ok(snapshot)
    }

    pub async fn is_enabled(&self, key: StrategyKey) -> Result<bool, MonetizationError> {
        Ok(self.snapshot().await?.is_enabled(key))
    }

    pub async fn commission_policy(&self) -> Result<CommissionPolicy, MonetizationError> {
        Ok(self.snapshot().await?.commission_policy())
    }

    pub async fn quality_tier(&self, name: &str) -> Result<Option<QualityTier>, MonetizationError> {
        Ok(self.snapshot().await?.quality_tier(name))
    }

    /// Forces the next read to hit the source
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::{json, Value as JsonValue};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct MemorySource {
        rows: Mutex<Vec<MonetizationSettingRow>>,
        loads: AtomicUsize,
    }

    impl MemorySource {
        fn new(rows: Vec<MonetizationSettingRow>) -> Arc<Self> {
            Arc::new(Self {
                rows: Mutex::new(rows),
                loads: AtomicUsize::new(0),
            })
        }

        fn set_enabled(&self, key: &str, enabled: bool) {
            let mut rows = self.rows.lock().unwrap();
            for row in rows.iter_mut().filter(|r| r.strategy_key == key) {
                row.is_enabled = enabled;
            }
        }
    }

    #[async_trait]
    impl SettingsSource for MemorySource {
        async fn load(&self) -> Result<Vec<MonetizationSettingRow>, MonetizationError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.lock().unwrap().clone())
        }
    }

    fn row(key: &str, enabled: bool, config: JsonValue) -> MonetizationSettingRow {
        MonetizationSettingRow {
            strategy_key: key.to_string(),
            strategy_name: key.to_string(),
            is_enabled: enabled,
            config,
            notes: None,
            enabled_at: None,
            updated_at: Utc::now(),
        }
    }

    fn seeded_rows() -> Vec<MonetizationSettingRow> {
        vec![
            row("platform_commission", true, json!({"commission_rate": 0.20})),
            row("premium_trainers", true, json!({"max_payment_bonus": 0.10})),
            row(
                "data_quality_guarantee",
                false,
                json!({"tiers": [{"name": "gold", "multiplier": 2.0, "reviewers": 3}]}),
            ),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn test_snapshot_is_cached_until_ttl() {
        let source = MemorySource::new(seeded_rows());
        let reader = SettingsReader::new(source.clone(), Duration::from_secs(300));

        assert!(reader.is_enabled(StrategyKey::PlatformCommission).await.unwrap());
        source.set_enabled("platform_commission", false);

        // Stale but within TTL
        assert!(reader.is_enabled(StrategyKey::PlatformCommission).await.unwrap());
        assert_eq!(source.loads.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(!reader.is_enabled(StrategyKey::PlatformCommission).await.unwrap());
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let source = MemorySource::new(seeded_rows());
        let reader = SettingsReader::new(source.clone(), Duration::from_secs(300));

        reader.snapshot().await.unwrap();
        source.set_enabled("data_quality_guarantee", true);
        reader.invalidate();

        let tier = reader.quality_tier("GOLD").await.unwrap().unwrap();
        assert_eq!(tier.reviewers, 3);
        assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    }

    /// Source that reads its rows, then waits for `release` before returning
    struct GatedSource {
        rows: Mutex<Vec<MonetizationSettingRow>>,
        started: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl SettingsSource for GatedSource {
        async fn load(&self) -> Result<Vec<MonetizationSettingRow>, MonetizationError> {
            let rows = self.rows.lock().unwrap().clone();
            self.started.notify_one();
            self.release.notified().await;
            Ok(rows)
        }
    }

    #[tokio::test]
    async fn test_invalidate_during_load_discards_stale_snapshot() {
        let mut rows = seeded_rows();
        rows[0].is_enabled = false;
        let source = Arc::new(GatedSource {
            rows: Mutex::new(rows),
            started: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let reader = SettingsReader::new(source.clone(), Duration::from_secs(300));

        let loading = tokio::spawn({
            let reader = reader.clone();
            async move { reader.is_enabled(StrategyKey::PlatformCommission).await }
        });
        source.started.notified().await;

        // Admin enables commission while the old rows are in flight
        source.rows.lock().unwrap()[0].is_enabled = true;
        reader.invalidate();
        source.release.notify_one();

        assert!(!loading.await.unwrap().unwrap());

        source.release.notify_one();
        assert!(reader.is_enabled(StrategyKey::PlatformCommission).await.unwrap());
    }

    #[test]
    fn test_commission_policy_from_snapshot() {
        let snapshot = SettingsSnapshot::from_rows(seeded_rows());
        let policy = snapshot.commission_policy();
        assert_eq!(policy, CommissionPolicy { rate: 0.20, max_bonus: 0.10 });

        let mut rows = seeded_rows();
        rows[1].is_enabled = false;
        let policy = SettingsSnapshot::from_rows(rows).commission_policy();
        assert_eq!(policy.max_bonus, 0.0);
    }

    #[test]
    fn test_disabled_strategies_and_bad_rows() {
        let snapshot = SettingsSnapshot::from_rows(vec![
            row("platform_commission", false, json!({"commission_rate": 0.20})),
            row("premium_trainers", true, json!({"max_payment_bonus": "lots"})),
            row("loyalty_points", true, json!({})),
        ]);

        assert_eq!(snapshot.commission_policy(), CommissionPolicy::disabled());
        assert!(!snapshot.is_enabled(StrategyKey::PremiumTrainers));
        assert!(snapshot.quality_tier("gold").is_none());
    }
}
