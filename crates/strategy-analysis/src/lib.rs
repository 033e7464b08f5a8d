//! Strategy Analysis for the Iterated Prisoner's Dilemma
//!
//! Classifies deterministic memory-3 strategies by the structure of the
//! transition graphs they induce:
//! - defensibility (no exploitable negative-payoff cycle)
//! - efficiency (self-play always recovers mutual cooperation)
//! - distinguishability (a cooperator can tell it apart from itself)
//!
//! plus automaton minimization and long-run payoffs under noise.
//! This crate is compiled to:
//! - Native (for the `ipd-analyze` CLI)
//! - WASM (for the strategy explorer frontend)

mod error;
mod config;
mod state;
mod graph;
mod weighted;
mod strategy;
mod partial;
mod automaton;
pub mod classify;
pub mod stationary;
pub mod batch;

#[cfg(feature = "wasm")]
mod wasm;

pub use error::{Error, Result};
pub use config::{AnalysisConfig, PayoffMatrix};
pub use state::{State, StateSpace};
pub use graph::{Attributes, DirectedGraph, DotOptions};
pub use weighted::DirectedWeightedGraph;
pub use strategy::{Move, Strategy, REFERENCE_STRATEGIES};
pub use partial::{Action, Completions, PartialStrategy};
pub use automaton::{Automaton, Minimized};
pub use classify::{
    classify, component_escalation_depths, is_defensible, is_distinguishable, is_efficient,
    Classification, Recovery,
};
pub use stationary::OutcomeFrequencies;

/// Payoff under the standard matrix
/// Returns (score_a, score_b)
pub fn payoff(a: Move, b: Move) -> (f64, f64) {
    PayoffMatrix::default().scores(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payoff_matrix() {
        assert_eq!(payoff(Move::Cooperate, Move::Cooperate), (3.0, 3.0));
        assert_eq!(payoff(Move::Cooperate, Move::Defect), (0.0, 5.0));
        assert_eq!(payoff(Move::Defect, Move::Cooperate), (5.0, 0.0));
        assert_eq!(payoff(Move::Defect, Move::Defect), (1.0, 1.0));
    }
}
