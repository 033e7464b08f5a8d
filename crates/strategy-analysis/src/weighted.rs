//! Directed graphs with integer edge weights

use std::collections::HashMap;
use crate::error::{Error, Result};
use crate::graph::DirectedGraph;

/// A [`DirectedGraph`] with one weight per distinct edge.
///
/// Re-adding an edge overwrites its weight.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectedWeightedGraph {
    graph: DirectedGraph,
    weights: HashMap<(usize, usize), i64>,
}

impl DirectedWeightedGraph {
    pub fn new(n: usize) -> Self {
        Self { graph: DirectedGraph::new(n), weights: HashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    pub fn add_link(&mut self, from: usize, to: usize, weight: i64) -> Result<()> {
        self.graph.add_link_once(from, to)?;
        self.weights.insert((from, to), weight);
        Ok(())
    }

    pub(crate) fn push_link(&mut self, from: usize, to: usize, weight: i64) {
        if !self.graph.has_link(from, to) {
            self.graph.push_link(from, to);
        }
        self.weights.insert((from, to), weight);
    }

    pub fn weight(&self, from: usize, to: usize) -> Option<i64> {
        self.weights.get(&(from, to)).copied()
    }

    /// Unweighted view
    pub fn graph(&self) -> &DirectedGraph {
        &self.graph
    }

    fn weighted_edges(&self) -> impl Iterator<Item = (usize, usize, i64)> + '_ {
        self.graph
            .edges()
            .filter_map(|(from, to)| self.weight(from, to).map(|w| (from, to, w)))
    }

    /// Single-source shortest distances. `None` marks an unreachable node.
    ///
    /// Distances are accumulated as `i128`, so no simple path over `i64`
    /// weights can overflow. Fails with `NegativeCycleDetected` when a
    /// negative cycle is reachable from `from`.
    pub fn bellman_ford(&self, from: usize) -> Result<Vec<Option<i128>>> {
        if from >= self.len() {
            return Err(Error::InvalidStateIndex { index: from, size: self.len() });
        }
        let mut dist: Vec<Option<i128>> = vec![None; self.len()];
        dist[from] = Some(0);

        for _ in 1..self.len() {
            let mut relaxed = false;
            for (u, v, w) in self.weighted_edges() {
                let Some(du) = dist[u] else { continue };
                let through = du.saturating_add(i128::from(w));
                if dist[v].map_or(true, |dv| through < dv) {
                    dist[v] = Some(through);
                    relaxed = true;
                }
            }
            if !relaxed {
                break;
            }
        }

        for (u, v, w) in self.weighted_edges() {
            if let (Some(du), Some(dv)) = (dist[u], dist[v]) {
                if du.saturating_add(i128::from(w)) < dv {
                    return Err(Error::NegativeCycleDetected { origin: from });
                }
            }
        }
        Ok(dist)
    }

    /// Whole-graph negative cycle test (all-pairs closure)
    pub fn has_negative_cycle(&self) -> bool {
        let n = self.len();
        let mut dist: Vec<Vec<Option<i128>>> = vec![vec![None; n]; n];
        for (u, v, w) in self.weighted_edges() {
            dist[u][v] = Some(i128::from(w));
        }
        for (i, row) in dist.iter_mut().enumerate() {
            row[i] = Some(row[i].map_or(0, |w| w.min(0)));
            if row[i] < Some(0) {
                return true;
            }
        }

        for k in 0..n {
            for i in 0..n {
                let Some(dik) = dist[i][k] else { continue };
                for j in 0..n {
                    let Some(dkj) = dist[k][j] else { continue };
                    let through = dik.saturating_add(dkj);
                    if dist[i][j].map_or(true, |dij| through < dij) {
                        dist[i][j] = Some(through);
                    }
                }
                if dist[i][i] < Some(0) {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bellman_ford() {
        let mut g = DirectedWeightedGraph::new(5);
        for (from, to, w) in [(1, 0, 1), (0, 2, 2), (2, 1, 3), (0, 3, 4), (3, 4, 5), (4, 4, 6)] {
            g.add_link(from, to, w).unwrap();
        }
        let dist = g.bellman_ford(0).unwrap();
        assert_eq!(dist, vec![Some(0), Some(5), Some(2), Some(4), Some(9)]);
        assert_eq!(g.bellman_ford(4).unwrap(), vec![None, None, None, None, Some(0)]);
        assert!(!g.has_negative_cycle());
    }

    #[test]
    fn test_bellman_ford_negative_cycle() {
        let mut g = DirectedWeightedGraph::new(3);
        g.add_link(0, 1, 1).unwrap();
        g.add_link(1, 2, 1).unwrap();
        g.add_link(2, 0, -3).unwrap();
        assert!(matches!(g.bellman_ford(0), Err(Error::NegativeCycleDetected { origin: 0 })));
        assert!(g.has_negative_cycle());
    }

    #[test]
    fn test_last_write_wins() {
        let mut g = DirectedWeightedGraph::new(3);
        g.add_link(0, 1, 1).unwrap();
        g.add_link(1, 0, -2).unwrap();
        assert!(g.has_negative_cycle());
        g.add_link(1, 0, 2).unwrap();
        assert_eq!(g.weight(1, 0), Some(2));
        assert_eq!(g.graph().links(1), &[0]);
        assert!(!g.has_negative_cycle());
    }

    #[test]
    fn test_negative_self_loop() {
        let mut g = DirectedWeightedGraph::new(4);
        g.add_link(0, 1, -1).unwrap();
        g.add_link(1, 2, -1).unwrap();
        assert!(!g.has_negative_cycle());
        g.add_link(3, 3, -1).unwrap();
        assert!(g.has_negative_cycle());
    }

    #[test]
    fn test_unreachable_cycle_is_still_found() {
        let mut g = DirectedWeightedGraph::new(4);
        g.add_link(0, 1, 0).unwrap();
        g.add_link(2, 3, -1).unwrap();
        g.add_link(3, 2, 0).unwrap();
        assert!(g.bellman_ford(0).is_ok());
        assert!(g.has_negative_cycle());
    }

    #[test]
    fn test_extreme_weights() {
        let mut g = DirectedWeightedGraph::new(3);
        g.add_link(0, 1, i64::MAX).unwrap();
        g.add_link(1, 2, i64::MAX).unwrap();
        assert!(!g.has_negative_cycle());
        let max = i128::from(i64::MAX);
        assert_eq!(g.bellman_ford(0).unwrap(), vec![Some(0), Some(max), Some(2 * max)]);

        let mut g = DirectedWeightedGraph::new(2);
        g.add_link(0, 1, i64::MIN).unwrap();
        g.add_link(1, 0, i64::MIN).unwrap();
        assert!(g.has_negative_cycle());
        assert!(g.bellman_ford(0).is_err());
    }
}
