use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::GenerateError;

/// Tunable weights and limits for a generation run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Bias the objective toward placing as many sessions as possible.
    pub maximize_fill: bool,
    /// Objective weight per placed session.
    pub assign_reward: f64,
    /// Objective weight per hour a faculty member falls short of their minimum.
    pub min_violation_penalty: f64,
    /// Every session must be placed and every minimum met, or the run fails.
    pub strict: bool,
    /// Weight on the busiest faculty member's load. Ignored under `maximize_fill`.
    pub balance_weight: f64,
    /// Reward multiplier applied under `maximize_fill`.
    pub fill_boost: f64,
    pub time_limit_secs: Option<f64>,
    pub threads: i32,
    pub random_seed: i32,
    pub mip_rel_gap: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            maximize_fill: false,
            assign_reward: 10.0,
            min_violation_penalty: 100.0,
            strict: false,
            balance_weight: 0.5,
            fill_boost: 10.0,
            time_limit_secs: Some(60.0),
            threads: 1,
            random_seed: 1234,
            mip_rel_gap: 1e-6,
        }
    }
}

impl GeneratorConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, GenerateError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| GenerateError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&raw)
            .map_err(|e| GenerateError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), GenerateError> {
        let weights = [
            ("assign_reward", self.assign_reward),
            ("min_violation_penalty", self.min_violation_penalty),
            ("balance_weight", self.balance_weight),
            ("fill_boost", self.fill_boost),
            ("mip_rel_gap", self.mip_rel_gap),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(GenerateError::Config(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if let Some(limit) = self.time_limit_secs {
            if !limit.is_finite() || limit <= 0.0 {
                return Err(GenerateError::Config(format!(
                    "time_limit_secs must be positive, got {limit}"
                )));
            }
        }
        if self.threads < 1 {
            return Err(GenerateError::Config("threads must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Reward per placed session as seen by the objective.
    pub fn fill_reward(&self) -> f64 {
        if self.maximize_fill {
            self.assign_reward * self.fill_boost
        } else {
            self.assign_reward
        }
    }

    pub fn effective_balance_weight(&self) -> f64 {
        if self.maximize_fill { 0.0 } else { self.balance_weight }
    }
}
