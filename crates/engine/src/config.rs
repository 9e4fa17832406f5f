//! Ledger settings.
//!
//! All amounts here are expressed in whole naira (major units), which is how
//! operators write them in `settings.toml`; the engine converts them to kobo
//! when it uses them.

use std::{collections::HashMap, path::PathBuf};

use serde::Deserialize;

use crate::money::MINOR_PER_MAJOR;

/// One fee bucket: every amount strictly below `below` pays `fee`.
///
/// The last tier of a schedule should leave `below` unset to catch everything
/// above the previous thresholds.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FeeTier {
    pub below: Option<i64>,
    pub fee: i64,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    pub tiers: Vec<FeeTier>,
    pub min_fee: i64,
    pub max_fee: i64,
    /// Per-campus multiplier applied to the tier fee; campuses not listed use
    /// `1.0`.
    pub campus_multipliers: HashMap<String, f64>,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            tiers: vec![
                FeeTier {
                    below: Some(15_000),
                    fee: 1_000,
                },
                FeeTier {
                    below: Some(50_000),
                    fee: 1_500,
                },
                FeeTier {
                    below: Some(100_000),
                    fee: 2_500,
                },
                FeeTier {
                    below: None,
                    fee: 3_500,
                },
            ],
            min_fee: 500,
            max_fee: 5_000,
            campus_multipliers: HashMap::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSON-lines audit file. `None` keeps the audit trail in tracing only.
    pub audit_log: Option<PathBuf>,
    pub min_deposit: i64,
    pub min_withdrawal: i64,
    pub withdrawal_fee: i64,
    pub fees: FeeSchedule,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            audit_log: None,
            min_deposit: 100,
            min_withdrawal: 1_000,
            withdrawal_fee: 50,
            fees: FeeSchedule::default(),
        }
    }
}

impl LedgerConfig {
    pub(crate) fn min_deposit_minor(&self) -> i64 {
        self.min_deposit * MINOR_PER_MAJOR
    }

    pub(crate) fn min_withdrawal_minor(&self) -> i64 {
        self.min_withdrawal * MINOR_PER_MAJOR
    }

    pub(crate) fn withdrawal_fee_minor(&self) -> i64 {
        self.withdrawal_fee * MINOR_PER_MAJOR
    }
}
