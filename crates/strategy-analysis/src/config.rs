//! Analysis configuration

use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::strategy::Move;

/// Per-round payoffs of the Prisoner's Dilemma
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PayoffMatrix {
    /// Mutual cooperation
    pub reward: f64,
    /// Defecting against a cooperator
    pub temptation: f64,
    /// Cooperating against a defector
    pub sucker: f64,
    /// Mutual defection
    pub punishment: f64,
}

impl Default for PayoffMatrix {
    fn default() -> Self {
        Self { reward: 3.0, temptation: 5.0, sucker: 0.0, punishment: 1.0 }
    }
}

impl PayoffMatrix {
    /// Returns (score_a, score_b)
    pub fn scores(&self, a: Move, b: Move) -> (f64, f64) {
        match (a, b) {
            (Move::Cooperate, Move::Cooperate) => (self.reward, self.reward),
            (Move::Cooperate, Move::Defect) => (self.sucker, self.temptation),
            (Move::Defect, Move::Cooperate) => (self.temptation, self.sucker),
            (Move::Defect, Move::Defect) => (self.punishment, self.punishment),
        }
    }
}

/// Parameters for the noisy long-run analysis
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Probability that an intended move is flipped before it is recorded
    pub noise: f64,
    #[serde(default)]
    pub payoffs: PayoffMatrix,
}

impl AnalysisConfig {
    /// Noise level used for the reference tables
    pub fn standard() -> Self {
        Self { noise: 0.01, payoffs: PayoffMatrix::default() }
    }

    pub fn with_noise(noise: f64) -> Result<Self> {
        let config = Self { noise, ..Self::standard() };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_noise(self.noise)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::encoding(format!("analysis config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::standard()
    }
}

pub(crate) fn validate_noise(noise: f64) -> Result<()> {
    if noise > 0.0 && noise < 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidNoise { noise })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_payoffs() {
        let p = PayoffMatrix::default();
        assert_eq!(p.scores(Move::Cooperate, Move::Cooperate), (3.0, 3.0));
        assert_eq!(p.scores(Move::Cooperate, Move::Defect), (0.0, 5.0));
        assert_eq!(p.scores(Move::Defect, Move::Cooperate), (5.0, 0.0));
        assert_eq!(p.scores(Move::Defect, Move::Defect), (1.0, 1.0));
    }

    #[test]
    fn test_noise_bounds() {
        assert!(AnalysisConfig::with_noise(0.05).is_ok());
        assert!(matches!(AnalysisConfig::with_noise(0.0), Err(Error::InvalidNoise { .. })));
        assert!(matches!(AnalysisConfig::with_noise(1.0), Err(Error::InvalidNoise { .. })));
        assert!(matches!(AnalysisConfig::with_noise(f64::NAN), Err(Error::InvalidNoise { .. })));
    }

    #[test]
    fn test_from_json_defaults_payoffs() {
        let config = AnalysisConfig::from_json(r#"{"noise": 0.02}"#).unwrap();
        assert_eq!(config.noise, 0.02);
        assert_eq!(config.payoffs, PayoffMatrix::default());

        let err = AnalysisConfig::from_json(r#"{"noise": 2.0}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidNoise { .. }));
    }
}
