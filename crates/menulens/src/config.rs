use std::fs;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::policy::{AllocationPolicy, BcgPolicy, ElasticityPolicy, MatchPolicy};
use crate::{LensError, LensResult};

pub const CONFIG_PATH_ENV: &str = "MENULENS_CONFIG";

/// Every tunable threshold of an analysis run.
///
/// Any section or field left out of a JSON config falls back to the `*_V1`
/// policy defaults. Unknown keys are rejected so typos never silently revert
/// to a default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub matching: MatchPolicy,
    pub allocation: AllocationPolicy,
    pub bcg: BcgPolicy,
    pub elasticity: ElasticityPolicy,
}

impl AnalysisConfig {
    pub fn from_json_str(content: &str) -> LensResult<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|error| LensError::config_invalid(&error.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_path(path: &Path) -> LensResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|error| LensError::config_unreadable(path, &error.to_string()))?;
        Self::from_json_str(&content)
    }

    /// Loads the file named by `MENULENS_CONFIG`, or the defaults when unset.
    pub fn from_env() -> LensResult<Self> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => Self::from_json_path(&PathBuf::from(path)),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> LensResult<()> {
        let matching = &self.matching;
        unit_interval("matching.min_similarity", matching.min_similarity)?;
        unit_interval("matching.medium_similarity", matching.medium_similarity)?;
        if matching.min_similarity > matching.medium_similarity {
            return Err(LensError::config_invalid(
                "matching.min_similarity must not exceed matching.medium_similarity.",
            ));
        }

        if self.allocation.workers == 0 {
            return Err(LensError::config_invalid(
                "allocation.workers must be at least 1.",
            ));
        }
        if self.allocation.notable_adjustment < Decimal::ZERO {
            return Err(LensError::config_invalid(
                "allocation.notable_adjustment must not be negative.",
            ));
        }

        unit_interval("bcg.popularity_threshold", self.bcg.popularity_threshold)?;
        unit_interval("bcg.revenue_threshold", self.bcg.revenue_threshold)?;

        self.validate_elasticity()
    }

    fn validate_elasticity(&self) -> LensResult<()> {
        let policy = &self.elasticity;
        if policy.min_window_days < 0 {
            return Err(LensError::config_invalid(
                "elasticity.min_window_days must not be negative.",
            ));
        }
        if policy.period_days < 1 {
            return Err(LensError::config_invalid(
                "elasticity.period_days must be at least 1.",
            ));
        }
        if policy.min_pairs < 3 {
            return Err(LensError::config_invalid(
                "elasticity.min_pairs must be at least 3 for a regression to be defined.",
            ));
        }
        if !policy.min_price_cv.is_finite() || policy.min_price_cv < 0.0 {
            return Err(LensError::config_invalid(
                "elasticity.min_price_cv must be a non-negative number.",
            ));
        }
        for (field, bound) in [
            ("elasticity.alcohol_bound", policy.alcohol_bound),
            ("elasticity.staple_bound", policy.staple_bound),
            ("elasticity.general_bound", policy.general_bound),
        ] {
            if !bound.is_finite() || bound <= 0.0 {
                return Err(LensError::config_invalid(&format!(
                    "{field} must be a positive number."
                )));
            }
        }

        unit_interval("elasticity.high_min_r_squared", policy.high_min_r_squared)?;
        unit_interval("elasticity.medium_min_r_squared", policy.medium_min_r_squared)?;
        unit_interval("elasticity.high_max_p_value", policy.high_max_p_value)?;
        unit_interval("elasticity.medium_max_p_value", policy.medium_max_p_value)?;
        if policy.high_min_r_squared < policy.medium_min_r_squared
            || policy.high_max_p_value > policy.medium_max_p_value
        {
            return Err(LensError::config_invalid(
                "elasticity HIGH tier thresholds must be at least as strict as MEDIUM.",
            ));
        }
        Ok(())
    }
}

fn unit_interval(field: &str, value: f64) -> LensResult<()> {
    if (0.0..=1.0).contains(&value) {
        return Ok(());
    }
    Err(LensError::config_invalid(&format!(
        "{field} must be between 0 and 1, got {value}."
    )))
}
