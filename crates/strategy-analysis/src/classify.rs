//! Strategy classification
//!
//! Three verdicts, all computed from transition graphs over the state space:
//!
//! - **defensible**: no opponent can trap the strategy in a cycle whose
//!   relative payoff is negative.
//! - **efficient**: in self-play, every state eventually returns to mutual
//!   cooperation, even after one-round deviations out of absorbing cycles.
//! - **distinguishable**: against an unconditional cooperator, some
//!   deviation leads to a state that never recovers, so the two can be
//!   told apart.
//!
//! The last two share the escalating closure in [`escalate`].

use std::collections::BTreeMap;
use log::debug;
use serde::Serialize;
use crate::automaton::Automaton;
use crate::graph::DirectedGraph;
use crate::strategy::Strategy;

/// Outcome of the escalating closure
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Recovery {
    /// Every state can get back to mutual cooperation
    Recoverable,
    /// Mutual cooperation can reach this state, which cannot come back
    Unrecoverable(usize),
    /// No more perturbation links can be added and neither verdict holds
    Stalled,
}

/// Escalating closure over `graph`.
///
/// Each round marks every state that reaches node 0, then adds a
/// perturbation link `node -> node ^ mask` from each member of every sink
/// component. The closure ends when all states are marked, when node 0 can
/// reach an unmarked state, or when a round adds nothing.
pub fn escalate(mut graph: DirectedGraph, perturbations: &[usize]) -> Recovery {
    let n = graph.len();
    if n == 0 {
        return Recovery::Recoverable;
    }
    let mut judged = vec![false; n];
    judged[0] = true;

    let mut round = 0;
    loop {
        for (judged, reaches) in judged.iter_mut().zip(graph.reaching(0)) {
            *judged |= reaches;
        }
        if judged.iter().all(|j| *j) {
            debug!("escalation round {}: every state recovers", round);
            return Recovery::Recoverable;
        }

        let added = perturb_sinks(&mut graph, perturbations);
        debug!(
            "escalation round {}: {} judged, {} perturbation links added",
            round,
            judged.iter().filter(|j| **j).count(),
            added
        );

        let from_zero = graph.reachable_from(0);
        if let Some(node) = (0..n).find(|i| from_zero[*i] && !judged[*i]) {
            return Recovery::Unrecoverable(node);
        }
        if added == 0 {
            return Recovery::Stalled;
        }
        round += 1;
    }
}

/// One escalation step: link every member of each sink component to its
/// one-flip neighbours. Returns the number of links added.
fn perturb_sinks(graph: &mut DirectedGraph, perturbations: &[usize]) -> usize {
    let n = graph.len();
    let mut added = 0;
    for component in graph.sink_components() {
        for &node in &component {
            for &mask in perturbations {
                let to = node ^ mask;
                if to < n && !graph.has_link(node, to) {
                    graph.push_link(node, to);
                    added += 1;
                }
            }
        }
    }
    added
}

/// Escalation rounds needed before one terminal component of `graph` can
/// reach another.
///
/// Components are named by their smallest member. The key `(from, to)` maps
/// to the first round after which `from` reaches `to`. Pairs still apart
/// when a round adds no link are left out.
pub fn escalation_depths(mut graph: DirectedGraph, perturbations: &[usize]) -> BTreeMap<(usize, usize), usize> {
    let representatives: Vec<usize> = graph
        .terminal_components()
        .iter()
        .filter_map(|c| c.iter().min().copied())
        .collect();
    let mut pending: Vec<(usize, usize)> = representatives
        .iter()
        .flat_map(|&from| representatives.iter().map(move |&to| (from, to)))
        .filter(|(from, to)| from != to)
        .collect();

    let mut depths = BTreeMap::new();
    let mut round = 0;
    while !pending.is_empty() {
        round += 1;
        let added = perturb_sinks(&mut graph, perturbations);
        pending.retain(|&(from, to)| {
            if graph.is_accessible(from, to) {
                depths.insert((from, to), round);
                false
            } else {
                true
            }
        });
        debug!("depth round {}: {} pairs connected, {} pending", round, depths.len(), pending.len());
        if added == 0 {
            break;
        }
    }
    depths
}

/// [`escalation_depths`] of the self-play graph
pub fn component_escalation_depths(strategy: &Strategy) -> BTreeMap<(usize, usize), usize> {
    escalation_depths(strategy.transition_graph_with_self(), &strategy.space().perturbations())
}

pub fn is_defensible(strategy: &Strategy) -> bool {
    !strategy.weighted_transition_graph().has_negative_cycle()
}

pub fn is_efficient(strategy: &Strategy) -> bool {
    let perturbations = strategy.space().perturbations();
    escalate(strategy.transition_graph_with_self(), &perturbations) == Recovery::Recoverable
}

pub fn is_distinguishable(strategy: &Strategy) -> bool {
    let space = strategy.space();
    let graph = strategy.graph_with(&Strategy::all_cooperate(space));
    matches!(escalate(graph, &space.perturbations()), Recovery::Unrecoverable(_))
}

/// Every verdict for one strategy
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Classification {
    pub strategy: Strategy,
    pub defensible: bool,
    pub efficient: bool,
    pub distinguishable: bool,
    /// (own, others) rounds of history the action table reads
    pub memory_length: (usize, usize),
    /// States of the minimal equivalent automaton
    pub automaton_states: usize,
}

pub fn classify(strategy: &Strategy) -> Classification {
    let minimized = Automaton::from_strategy(strategy).minimize();
    Classification {
        strategy: strategy.clone(),
        defensible: is_defensible(strategy),
        efficient: is_efficient(strategy),
        distinguishable: is_distinguishable(strategy),
        memory_length: strategy.minimal_memory_length(),
        automaton_states: minimized.automaton.len(),
    }
}

impl Classification {
    /// Defensible, efficient and distinguishable at once
    pub fn is_successful(&self) -> bool {
        self.defensible && self.efficient && self.distinguishable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateSpace;
    use crate::strategy::tests::TFT_ATFT;

    fn verdicts(s: &Strategy) -> (bool, bool, bool) {
        (is_defensible(s), is_efficient(s), is_distinguishable(s))
    }

    #[test]
    fn test_all_defect() {
        let s = Strategy::all_defect(StateSpace::M3);
        assert_eq!(verdicts(&s), (true, false, true));
    }

    #[test]
    fn test_all_cooperate() {
        let s = Strategy::all_cooperate(StateSpace::M3);
        assert_eq!(verdicts(&s), (false, true, false));
    }

    #[test]
    fn test_tit_for_tat() {
        let s = Strategy::tit_for_tat(StateSpace::M3);
        assert_eq!(verdicts(&s), (true, false, false));
        let c = classify(&s);
        assert_eq!(c.memory_length, (0, 1));
        assert_eq!(c.automaton_states, 2);
    }

    #[test]
    fn test_win_stay_lose_shift() {
        let s = Strategy::win_stay_lose_shift(StateSpace::M3);
        assert_eq!(verdicts(&s), (false, true, true));
    }

    #[test]
    fn test_tft_atft() {
        let s: Strategy = TFT_ATFT.parse().unwrap();
        let c = classify(&s);
        assert!(c.is_successful());
        assert_eq!(c.memory_length, (2, 2));
    }

    #[test]
    fn test_tft_atft_variants() {
        for m2 in ["cdcddccdcdccdccd", "cdcdddcdcdccdccd", "cdcddccdcddcdccd", "cdcdddcdcddcdccd"] {
            let s = Strategy::from_shorter_memory(StateSpace::M3, 2, m2).unwrap();
            assert_eq!(verdicts(&s), (true, true, true), "{}", m2);
        }
    }

    #[test]
    fn test_extended_space_verdicts() {
        let space = StateSpace::M3_EXTENDED;
        assert_eq!(space.perturbations(), vec![1, 8, 64]);
        assert_eq!(verdicts(&Strategy::all_defect(space)), (true, false, true));
        assert_eq!(verdicts(&Strategy::all_cooperate(space)), (false, true, false));
        assert_eq!(verdicts(&Strategy::tit_for_tat(space)), (true, false, false));
        assert_eq!(verdicts(&Strategy::win_stay_lose_shift(space)), (false, false, true));

        let c = classify(&Strategy::tit_for_tat(space));
        assert_eq!(c.memory_length, (0, 1));
        assert!(!c.is_successful());
    }

    #[test]
    fn test_component_escalation_depths() {
        let s: Strategy = TFT_ATFT.parse().unwrap();
        let depths = component_escalation_depths(&s);
        let expected = BTreeMap::from([
            ((0, 21), 2),
            ((0, 63), 2),
            ((21, 0), 1),
            ((21, 63), 2),
            ((63, 0), 1),
            ((63, 21), 2),
        ]);
        assert_eq!(depths, expected);

        // a single terminal component has no pairs
        assert!(component_escalation_depths(&Strategy::win_stay_lose_shift(StateSpace::M3)).is_empty());
        assert!(component_escalation_depths(&Strategy::all_defect(StateSpace::M3)).is_empty());

        let tft = component_escalation_depths(&Strategy::tit_for_tat(StateSpace::M3));
        assert_eq!(tft.len(), 6);
        assert!(tft.values().all(|d| *d == 1));
    }

    #[test]
    fn test_escalation_depths_stall() {
        // the only flip leaves the graph, so nothing ever connects
        let mut g = DirectedGraph::new(2);
        g.add_link(0, 0).unwrap();
        g.add_link(1, 1).unwrap();
        assert!(escalation_depths(g.clone(), &[2]).is_empty());
        assert_eq!(escalation_depths(g, &[1]), BTreeMap::from([((0, 1), 1), ((1, 0), 1)]));
    }

    #[test]
    fn test_escalation_outcomes() {
        // 0 <-> 1 recovers without any perturbation
        let mut g = DirectedGraph::new(2);
        g.add_link(0, 1).unwrap();
        g.add_link(1, 0).unwrap();
        assert_eq!(escalate(g, &[1]), Recovery::Recoverable);

        // 0 is absorbing, 1 is absorbing, a flip takes 0 into 1
        let mut g = DirectedGraph::new(2);
        g.add_link(0, 0).unwrap();
        g.add_link(1, 1).unwrap();
        assert_eq!(escalate(g, &[1]), Recovery::Unrecoverable(1));

        // no flip ever leaves {2, 3}
        let mut g = DirectedGraph::new(4);
        for (from, to) in [(0, 0), (1, 0), (2, 3), (3, 2)] {
            g.add_link(from, to).unwrap();
        }
        assert_eq!(escalate(g, &[1]), Recovery::Stalled);
    }

    #[test]
    fn test_classification_serializes() {
        let c = classify(&Strategy::all_defect(StateSpace::M3));
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["strategy"], "d".repeat(64));
        assert_eq!(json["defensible"], true);
        assert_eq!(json["automaton_states"], 1);
    }
}
