//! WASM bindings for the strategy explorer frontend

#![cfg(feature = "wasm")]

use wasm_bindgen::prelude::*;
use crate::automaton::Automaton;
use crate::classify::classify;
use crate::config::AnalysisConfig;
use crate::partial::PartialStrategy;
use crate::stationary::{long_run, OutcomeFrequencies};
use crate::strategy::{Strategy, REFERENCE_STRATEGIES};

/// Parse an encoding, or a reference name such as `"wsls"`
fn parse_strategy(text: &str) -> Result<Strategy, JsError> {
    if let Some(s) = Strategy::reference(text, Default::default()) {
        return Ok(s);
    }
    text.parse::<Strategy>()
        .map_err(|e| JsError::new(&format!("Invalid strategy: {}", e)))
}

fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue, JsError> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
}

/// Classify a strategy
///
/// # Returns
/// `{strategy, defensible, efficient, distinguishable, memory_length,
/// automaton_states}`
#[wasm_bindgen]
pub fn classify_strategy(encoding: &str) -> Result<JsValue, JsError> {
    let strategy = parse_strategy(encoding)?;
    to_js(&classify(&strategy))
}

/// Minimal automaton: `{partition, automaton}`
#[wasm_bindgen]
pub fn minimize_strategy(encoding: &str) -> Result<JsValue, JsError> {
    let strategy = parse_strategy(encoding)?;
    to_js(&Automaton::from_strategy(&strategy).minimize())
}

#[derive(serde::Serialize)]
struct StationaryOutcomes {
    frequencies: OutcomeFrequencies,
    focal_payoff: f64,
    opponent_payoff: f64,
}

/// Long-run outcome frequencies and payoffs of `focal` against `opponent`
#[wasm_bindgen]
pub fn stationary_outcomes(focal: &str, opponent: &str, noise: f64) -> Result<JsValue, JsError> {
    let focal = parse_strategy(focal)?;
    let opponent = parse_strategy(opponent)?;
    let config = AnalysisConfig::with_noise(noise).map_err(|e| JsError::new(&e.to_string()))?;
    let frequencies = long_run(&focal, &opponent, &config).map_err(|e| JsError::new(&e.to_string()))?;
    let (focal_payoff, opponent_payoff) = frequencies.expected_payoffs(&config.payoffs);
    to_js(&StationaryOutcomes { frequencies, focal_payoff, opponent_payoff })
}

/// DOT text of the self-play graph, or of the graph against `opponent`
#[wasm_bindgen]
pub fn transition_graph_dot(
    encoding: &str,
    opponent: Option<String>,
    remove_isolated: bool,
) -> Result<String, JsError> {
    let strategy = parse_strategy(encoding)?;
    let opponent = opponent.as_deref().map(parse_strategy).transpose()?;
    strategy
        .to_dot(opponent.as_ref(), remove_isolated)
        .map_err(|e| JsError::new(&e.to_string()))
}

#[derive(serde::Serialize)]
struct DefensibilityResult {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    defensible: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Check a partial strategy (`c`, `d`, `_`, `*`)
///
/// Returns `{valid: true, defensible}` or `{valid: false, error: "..."}`.
/// Never throws.
#[wasm_bindgen]
pub fn check_partial_defensibility(encoding: &str) -> JsValue {
    let result = match encoding.parse::<PartialStrategy>() {
        Ok(p) => DefensibilityResult { valid: true, defensible: Some(p.is_defensible()), error: None },
        Err(e) => DefensibilityResult { valid: false, defensible: None, error: Some(e.to_string()) },
    };
    serde_wasm_bindgen::to_value(&result).unwrap_or(JsValue::NULL)
}

#[derive(serde::Serialize)]
struct ReferenceInfo {
    id: String,
    description: String,
    encoding: String,
}

/// Reference strategies with their 64-state encodings
#[wasm_bindgen]
pub fn get_reference_strategies() -> Result<JsValue, JsError> {
    let infos: Vec<ReferenceInfo> = REFERENCE_STRATEGIES
        .iter()
        .filter_map(|(id, description)| {
            Strategy::reference(id, Default::default()).map(|s| ReferenceInfo {
                id: id.to_string(),
                description: description.to_string(),
                encoding: s.to_string(),
            })
        })
        .collect();
    to_js(&infos)
}
