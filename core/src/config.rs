//! Tuning constants and validated search settings.
//!
//! Compile-time defaults live here; runtime values come from CLI flags in the
//! `cari-indexer` and `cari-server` binaries and are checked by
//! [`SearchConfig::new`] before any search runs.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Dirichlet prior strength for query-likelihood scoring.
///
/// Larger values lean harder on collection statistics, which favours longer
/// documents less. 2000 is the customary value for short-document corpora.
pub const DEFAULT_MU: f64 = 2000.0;

/// Number of results returned when the caller does not ask for a count.
pub const DEFAULT_TOP_K: usize = 10;

/// Upper bound on results served over HTTP.
pub const MAX_TOP_K: usize = 100;

/// Extensions picked up when walking a corpus directory.
pub const DEFAULT_EXTENSIONS: &[&str] = &["txt"];

/// Version stamped into `meta.json`; bump when the snapshot layout changes.
pub const SNAPSHOT_VERSION: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    pub mu: f64,
    pub top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { mu: DEFAULT_MU, top_k: DEFAULT_TOP_K }
    }
}

impl SearchConfig {
    /// Validate raw caller input. `top_k` is signed so that negative counts
    /// coming from the outside are rejected instead of wrapping.
    pub fn new(mu: f64, top_k: i64) -> Result<Self> {
        Ok(Self { mu: validate_mu(mu)?, top_k: validate_top_k(top_k)? })
    }
}

pub fn validate_mu(mu: f64) -> Result<f64> {
    if !mu.is_finite() || mu <= 0.0 {
        return Err(Error::InvalidConfiguration(format!("mu must be a positive finite number, got {mu}")));
    }
    Ok(mu)
}

pub fn validate_top_k(top_k: i64) -> Result<usize> {
    usize::try_from(top_k)
        .map_err(|_| Error::InvalidConfiguration(format!("top_k must not be negative, got {top_k}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = SearchConfig::default();
        assert_eq!(SearchConfig::new(cfg.mu, cfg.top_k as i64).unwrap(), cfg);
    }

    #[test]
    fn rejects_bad_mu_and_negative_k() {
        assert!(matches!(SearchConfig::new(0.0, 10), Err(Error::InvalidConfiguration(_))));
        assert!(matches!(SearchConfig::new(-5.0, 10), Err(Error::InvalidConfiguration(_))));
        assert!(matches!(SearchConfig::new(f64::NAN, 10), Err(Error::InvalidConfiguration(_))));
        assert!(matches!(SearchConfig::new(2000.0, -1), Err(Error::InvalidConfiguration(_))));
        assert_eq!(SearchConfig::new(2000.0, 0).unwrap().top_k, 0);
    }
}
