/// Platform commission split
///
/// When `platform_commission` is enabled the platform keeps
/// `round(gross * rate)` of each task payment. A trainer's premium plan
/// lowers the rate by its `payment_bonus`, capped by the
/// `premium_trainers.max_payment_bonus` setting, and the rate never drops
/// below zero.

use serde::Serialize;

/// Rate inputs in effect for one submission
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CommissionPolicy {
    /// Base commission rate, 0 when the strategy is disabled
    pub rate: f64,

    /// Largest plan bonus honoured, 0 when premium plans are disabled
    pub max_bonus: f64,
}

/// Result of splitting a gross payment
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CommissionSplit {
    pub gross_cents: i64,
    pub rate: f64,
    pub commission_cents: i64,
    pub trainer_payout_cents: i64,
}

impl CommissionPolicy {
    /// No commission at all
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Rate after applying the trainer's plan bonus
    pub fn effective_rate(&self, plan_bonus: f64) -> f64 {
        let bonus = plan_bonus.max(0.0).min(self.max_bonus);
        (self.rate - bonus).max(0.0)
    }

    /// Splits `gross_cents` into platform commission and trainer payout
    pub fn split(&self, gross_cents: i64, plan_bonus: f64) -> CommissionSplit {
        let rate = self.effective_rate(plan_bonus);
        let commission_cents = ((gross_cents as f64) * rate).round() as i64;
        let commission_cents = commission_cents.clamp(0, gross_cents.max(0));

        CommissionSplit {
            gross_cents,
            rate,
            commission_cents,
            trainer_payout_cents: gross_cents - commission_cents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_policy_pays_everything() {
        let split = CommissionPolicy::disabled().split(1500, 0.05);
        assert_eq!(split.commission_cents, 0);
        assert_eq!(split.trainer_payout_cents, 1500);
    }

    #[test]
    fn test_split_rounds_commission() {
        let policy = CommissionPolicy { rate: 0.20, max_bonus: 0.0 };
        let split = policy.split(1234, 0.0);

        // 246.8 rounds to 247
        assert_eq!(split.commission_cents, 247);
        assert_eq!(split.trainer_payout_cents, 987);
        assert_eq!(split.commission_cents + split.trainer_payout_cents, split.gross_cents);
    }

    #[test]
    fn test_plan_bonus_is_capped() {
        let policy = CommissionPolicy { rate: 0.20, max_bonus: 0.10 };

        assert!((policy.effective_rate(0.05) - 0.15).abs() < 1e-9);
        assert!((policy.effective_rate(0.50) - 0.10).abs() < 1e-9);
        assert!((policy.effective_rate(-1.0) - 0.20).abs() < 1e-9);
    }

    #[test]
    fn test_rate_never_negative() {
        let policy = CommissionPolicy { rate: 0.05, max_bonus: 0.10 };
        assert_eq!(policy.effective_rate(0.10), 0.0);
        assert_eq!(policy.split(1000, 0.10).commission_cents, 0);
    }
}
