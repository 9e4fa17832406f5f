//! Platform fee calculation.
//!
//! Pure and deterministic: the same function serves live checkout and the
//! quote endpoint, and never touches the database.

use serde::Serialize;

use crate::{FeeSchedule, money::MINOR_PER_MAJOR};

/// Preview of what a purchase of `amount` would cost.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FeeQuote {
    pub amount: i64,
    pub fee: i64,
    pub total: i64,
}

impl FeeQuote {
    pub fn new(amount_minor: i64, campus: Option<&str>, schedule: &FeeSchedule) -> Self {
        let fee = calculate_fee(amount_minor, campus, schedule);
        Self {
            amount: amount_minor,
            fee,
            total: amount_minor.saturating_add(fee),
        }
    }
}

/// Returns the platform fee in kobo for an `amount_minor` subtotal bought on
/// `campus`.
///
/// The amount is bucketed into the schedule tiers, the tier fee is scaled by
/// the campus multiplier (default `1.0`), clamped to `[min_fee, max_fee]` and
/// rounded to the nearest kobo.
pub fn calculate_fee(amount_minor: i64, campus: Option<&str>, schedule: &FeeSchedule) -> i64 {
    let tier_fee = schedule
        .tiers
        .iter()
        .find(|tier| match tier.below {
            Some(below) => amount_minor < below.saturating_mul(MINOR_PER_MAJOR),
            None => true,
        })
        .or_else(|| schedule.tiers.last())
        .map(|tier| tier.fee)
        .unwrap_or(schedule.min_fee);

    let multiplier = campus
        .map(|c| c.trim().to_lowercase())
        .and_then(|c| {
            schedule
                .campus_multipliers
                .iter()
                .find(|(name, _)| name.to_lowercase() == c)
                .map(|(_, m)| *m)
        })
        .filter(|m| m.is_finite() && *m >= 0.0)
        .unwrap_or(1.0);

    let scaled = (tier_fee * MINOR_PER_MAJOR) as f64 * multiplier;
    let min_minor = schedule.min_fee * MINOR_PER_MAJOR;
    let max_minor = schedule.max_fee.max(schedule.min_fee) * MINOR_PER_MAJOR;

    (scaled.round() as i64).clamp(min_minor, max_minor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Money;

    fn naira(n: i64) -> i64 {
        Money::from_major(n).minor()
    }

    #[test]
    fn amounts_fall_into_tiers() {
        let schedule = FeeSchedule::default();
        assert_eq!(calculate_fee(naira(300), None, &schedule), naira(1_000));
        assert_eq!(calculate_fee(naira(14_999), None, &schedule), naira(1_000));
        assert_eq!(calculate_fee(naira(15_000), None, &schedule), naira(1_500));
        assert_eq!(calculate_fee(naira(60_000), None, &schedule), naira(2_500));
        assert_eq!(calculate_fee(naira(250_000), None, &schedule), naira(3_500));
    }

    #[test]
    fn campus_multiplier_scales_and_clamps() {
        let mut schedule = FeeSchedule::default();
        schedule.campus_multipliers.insert("UNILAG".to_string(), 1.25);
        schedule.campus_multipliers.insert("OAU".to_string(), 0.1);
        schedule.campus_multipliers.insert("UI".to_string(), 3.0);

        assert_eq!(
            calculate_fee(naira(20_000), Some("unilag"), &schedule),
            187_500
        );
        // 1000 * 0.1 = 100 < min_fee
        assert_eq!(calculate_fee(naira(100), Some("OAU"), &schedule), naira(500));
        // 3500 * 3 = 10500 > max_fee
        assert_eq!(
            calculate_fee(naira(500_000), Some("UI"), &schedule),
            naira(5_000)
        );
        assert_eq!(
            calculate_fee(naira(100), Some("unknown"), &schedule),
            naira(1_000)
        );
    }

    #[test]
    fn quote_adds_fee_to_amount() {
        let quote = FeeQuote::new(naira(1_000), None, &FeeSchedule::default());
        assert_eq!(quote.fee, naira(1_000));
        assert_eq!(quote.total, naira(2_000));
    }

    #[test]
    fn fractional_results_round_to_kobo() {
        let mut schedule = FeeSchedule::default();
        schedule.campus_multipliers.insert("futa".to_string(), 0.666_666);
        // 100000 kobo * 0.666666 = 66666.6
        assert_eq!(calculate_fee(naira(10), Some("futa"), &schedule), 66_667);
    }
}
