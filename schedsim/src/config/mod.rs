//! Simulation configuration loading and validation.
//!
//! The expected YAML structure is:
//! ```yaml
//! policy: mlfq                  # or fixed-priority
//! levels: 3
//! quanta: [150, 170, unbounded] # one entry per level, level 0 first
//! global_promotion_interval: 7000   # or "off"
//! random_promotion:                 # or "off"
//!   interval: 7000
//!   fraction: 0.3
//! seed: 69
//! throughput_unit: 1000
//! ```
//!
//! Every key is optional.  Missing keys fall back to [`SimConfig::default`],
//! and a missing `quanta` list is derived from `levels` and `policy`.

use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::engine::error::ConfigurationError;
use crate::policy::Quantum;
use crate::task::Ticks;

// ── Defaults ──────────────────────────────────────────────────────────────────

pub const DEFAULT_LEVELS: usize = 3;
pub const DEFAULT_PROMOTION_INTERVAL: Ticks = 7_000;
pub const DEFAULT_RANDOM_FRACTION: f64 = 0.3;
pub const DEFAULT_SEED: u64 = 69;
/// One second when ticks are milliseconds.
pub const DEFAULT_THROUGHPUT_UNIT: Ticks = 1_000;

// ── Policy kind ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    #[serde(alias = "fixed_priority", alias = "rr")]
    FixedPriority,
    Mlfq,
}

impl FromStr for PolicyKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed-priority" | "fixed_priority" | "rr" => Ok(PolicyKind::FixedPriority),
            "mlfq" => Ok(PolicyKind::Mlfq),
            other => Err(ConfigurationError::UnknownPolicy(other.to_string())),
        }
    }
}

impl std::fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyKind::FixedPriority => f.write_str("fixed-priority"),
            PolicyKind::Mlfq => f.write_str("mlfq"),
        }
    }
}

// ── Public configuration ──────────────────────────────────────────────────────

/// Randomized partial promotion settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RandomPromotion {
    pub interval: Ticks,
    /// Share of eligible tasks promoted per tick, in `(0, 1]`.
    pub fraction: f64,
}

/// Everything a run needs besides the workload.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub policy: PolicyKind,
    pub levels: usize,
    /// One quantum per level, level 0 first.
    pub quanta: Vec<Quantum>,
    /// MLFQ only.  `None` disables global promotion.
    pub global_promotion_interval: Option<Ticks>,
    /// MLFQ only.  `None` disables randomized promotion.
    pub random_promotion: Option<RandomPromotion>,
    /// Seed for the randomized-promotion source.
    pub seed: u64,
    /// Ticks per throughput unit (`1000` → tasks per second for ms ticks).
    pub throughput_unit: Ticks,
}

impl Default for SimConfig {
    /// Reference MLFQ design: three levels, quanta 150 / 170 / unbounded,
    /// both promotion timers every 7000 ticks, 30 % randomized promotion.
    fn default() -> Self {
        Self {
            policy: PolicyKind::Mlfq,
            levels: DEFAULT_LEVELS,
            quanta: default_quanta(PolicyKind::Mlfq, DEFAULT_LEVELS),
            global_promotion_interval: Some(DEFAULT_PROMOTION_INTERVAL),
            random_promotion: Some(RandomPromotion {
                interval: DEFAULT_PROMOTION_INTERVAL,
                fraction: DEFAULT_RANDOM_FRACTION,
            }),
            seed: DEFAULT_SEED,
            throughput_unit: DEFAULT_THROUGHPUT_UNIT,
        }
    }
}

impl SimConfig {
    /// Fixed-priority round-robin with the same finite quantum on every level.
    pub fn fixed_priority(levels: usize, quantum: Ticks) -> Self {
        Self {
            policy: PolicyKind::FixedPriority,
            levels,
            quanta: vec![Quantum::Finite(quantum); levels],
            global_promotion_interval: None,
            random_promotion: None,
            ..Self::default()
        }
    }

    /// MLFQ with the given per-level quanta and both promotion timers off.
    pub fn mlfq(quanta: Vec<Quantum>) -> Self {
        Self {
            policy: PolicyKind::Mlfq,
            levels: quanta.len(),
            quanta,
            global_promotion_interval: None,
            random_promotion: None,
            ..Self::default()
        }
    }

    /// Switch policy, re-deriving quanta when they were still the defaults of
    /// the previous policy.
    pub fn with_policy(mut self, policy: PolicyKind) -> Self {
        if self.quanta == default_quanta(self.policy, self.levels) {
            self.quanta = default_quanta(policy, self.levels);
        }
        self.policy = policy;
        self
    }

    /// Set every finite-able level to `quantum`.  Under MLFQ the lowest level
    /// stays unbounded.
    pub fn with_uniform_quantum(mut self, quantum: Ticks) -> Self {
        let lowest = self.levels.saturating_sub(1);
        for (level, q) in self.quanta.iter_mut().enumerate() {
            if self.policy == PolicyKind::Mlfq && level == lowest {
                continue;
            }
            *q = Quantum::Finite(quantum);
        }
        self
    }

    /// Construction-time checks.  The engine never starts with a config that
    /// fails here.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.levels == 0 {
            return Err(ConfigurationError::ZeroLevels);
        }
        if self.quanta.len() != self.levels {
            return Err(ConfigurationError::QuantumCountMismatch {
                expected: self.levels,
                actual: self.quanta.len(),
            });
        }
        if let Some(level) = self.quanta.iter().position(|q| *q == Quantum::Finite(0)) {
            return Err(ConfigurationError::NonPositiveQuantum { level });
        }
        if self.global_promotion_interval == Some(0) {
            return Err(ConfigurationError::ZeroPromotionInterval { timer: "global" });
        }
        if let Some(rp) = self.random_promotion {
            if rp.interval == 0 {
                return Err(ConfigurationError::ZeroPromotionInterval { timer: "randomized" });
            }
            if !(rp.fraction > 0.0 && rp.fraction <= 1.0) {
                return Err(ConfigurationError::InvalidPromotionFraction(rp.fraction));
            }
        }
        if self.throughput_unit == 0 {
            return Err(ConfigurationError::ZeroThroughputUnit);
        }
        Ok(())
    }

    /// Parse `path` and build a validated config.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, the YAML is structurally
    /// invalid, a keyword is unknown, or [`validate`](Self::validate) fails.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading simulation configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;
        let config = Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))?;

        info!(
            policy = %config.policy,
            levels = config.levels,
            quanta = ?config.quanta,
            global_promotion = ?config.global_promotion_interval,
            random_promotion = ?config.random_promotion,
            seed = config.seed,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parse a YAML document (see the module docs for the layout).
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: SimConfigFile = serde_yaml::from_str(content).context("Failed to parse YAML")?;
        let config = file.into_config()?;
        config.validate()?;
        config.warn_on_suspicious_timers();
        Ok(config)
    }

    fn warn_on_suspicious_timers(&self) {
        if self.policy != PolicyKind::Mlfq {
            if self.global_promotion_interval.is_some() || self.random_promotion.is_some() {
                debug!(policy = %self.policy, "promotion timers are ignored by this policy");
            }
            return;
        }
        if let (Some(global), Some(rp)) = (self.global_promotion_interval, self.random_promotion) {
            if rp.interval >= global {
                warn!(
                    random_interval = rp.interval,
                    global_interval = global,
                    "randomized promotion interval is not shorter than the global one"
                );
            }
        }
    }
}

/// Default per-level quanta for `levels` levels.
///
/// * Fixed priority: 150 on every level.
/// * MLFQ: 150, 170, 190, … with the lowest level unbounded.
pub fn default_quanta(policy: PolicyKind, levels: usize) -> Vec<Quantum> {
    match policy {
        PolicyKind::FixedPriority => vec![Quantum::Finite(150); levels],
        PolicyKind::Mlfq => (0..levels)
            .map(|level| {
                if level + 1 == levels {
                    Quantum::Unbounded
                } else {
                    Quantum::Finite(150 + 20 * level as Ticks)
                }
            })
            .collect(),
    }
}

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SimConfigFile {
    policy: Option<PolicyKind>,
    levels: Option<usize>,
    quanta: Option<Vec<TicksOrKeyword>>,
    global_promotion_interval: Option<TicksOrKeyword>,
    random_promotion: Option<RandomPromotionEntry>,
    seed: Option<u64>,
    throughput_unit: Option<Ticks>,
}

/// A tick count, or a keyword such as `unbounded` / `off`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TicksOrKeyword {
    Ticks(Ticks),
    Keyword(String),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RandomPromotionEntry {
    Settings { interval: Ticks, fraction: f64 },
    Keyword(String),
}

fn is_off(keyword: &str) -> bool {
    matches!(keyword, "off" | "disabled" | "none")
}

impl SimConfigFile {
    fn into_config(self) -> Result<SimConfig> {
        let defaults = SimConfig::default();
        let policy = self.policy.unwrap_or(defaults.policy);

        let quanta = match self.quanta {
            Some(entries) => entries
                .into_iter()
                .map(|e| match e {
                    TicksOrKeyword::Ticks(t) => Ok(Quantum::Finite(t)),
                    TicksOrKeyword::Keyword(k) if k == "unbounded" => Ok(Quantum::Unbounded),
                    TicksOrKeyword::Keyword(k) => bail!("unknown quantum keyword '{k}'"),
                })
                .collect::<Result<Vec<_>>>()?,
            None => default_quanta(policy, self.levels.unwrap_or(defaults.levels)),
        };
        let levels = self.levels.unwrap_or(quanta.len());

        let global_promotion_interval = match self.global_promotion_interval {
            None => defaults.global_promotion_interval,
            Some(TicksOrKeyword::Ticks(t)) => Some(t),
            Some(TicksOrKeyword::Keyword(k)) if is_off(&k) => None,
            Some(TicksOrKeyword::Keyword(k)) => {
                bail!("unknown global_promotion_interval keyword '{k}'")
            }
        };

        let random_promotion = match self.random_promotion {
            None => defaults.random_promotion,
            Some(RandomPromotionEntry::Settings { interval, fraction }) => {
                Some(RandomPromotion { interval, fraction })
            }
            Some(RandomPromotionEntry::Keyword(k)) if is_off(&k) => None,
            Some(RandomPromotionEntry::Keyword(k)) => {
                bail!("unknown random_promotion keyword '{k}'")
            }
        };

        Ok(SimConfig {
            policy,
            levels,
            quanta,
            global_promotion_interval,
            random_promotion,
            seed: self.seed.unwrap_or(defaults.seed),
            throughput_unit: self.throughput_unit.unwrap_or(defaults.throughput_unit),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
