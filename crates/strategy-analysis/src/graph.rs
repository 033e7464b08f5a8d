//! Directed graphs over dense integer node ids
//!
//! Nodes are `0..n`. Adjacency lists keep insertion order and may hold
//! duplicate links; component analysis and DOT output treat a repeated link
//! as a single edge.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fmt::Write;
use crate::error::{Error, Result};

/// Attribute map attached to a DOT node or edge
pub type Attributes = BTreeMap<String, String>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectedGraph {
    links: Vec<Vec<usize>>,
}

impl DirectedGraph {
    pub fn new(n: usize) -> Self {
        Self { links: vec![Vec::new(); n] }
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    fn check(&self, node: usize) -> Result<()> {
        if node < self.len() {
            Ok(())
        } else {
            Err(Error::InvalidStateIndex { index: node, size: self.len() })
        }
    }

    /// Append `from -> to`. Duplicates are kept.
    pub fn add_link(&mut self, from: usize, to: usize) -> Result<()> {
        self.check(from)?;
        self.check(to)?;
        self.push_link(from, to);
        Ok(())
    }

    /// Unchecked append for builders that derive both ends from a state space
    pub(crate) fn push_link(&mut self, from: usize, to: usize) {
        debug_assert!(from < self.len() && to < self.len());
        self.links[from].push(to);
    }

    /// Append `from -> to` unless it is already present. Returns whether a
    /// link was added.
    pub fn add_link_once(&mut self, from: usize, to: usize) -> Result<bool> {
        if self.has_link(from, to) {
            return Ok(false);
        }
        self.add_link(from, to)?;
        Ok(true)
    }

    /// Successors of `from` in insertion order
    pub fn links(&self, from: usize) -> &[usize] {
        self.links.get(from).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_link(&self, from: usize, to: usize) -> bool {
        self.links(from).contains(&to)
    }

    pub fn has_self_loop(&self, node: usize) -> bool {
        self.has_link(node, node)
    }

    /// Distinct edges, grouped by source in ascending order
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.links.iter().enumerate().flat_map(|(from, succ)| {
            succ.iter()
                .enumerate()
                .filter(move |&(i, to)| !succ[..i].contains(to))
                .map(move |(_, to)| (from, *to))
        })
    }

    pub fn edge_count(&self) -> usize {
        self.edges().count()
    }

    /// Strongly connected components (iterative Tarjan).
    ///
    /// Components come out in reverse topological order; members of one
    /// component are in stack-pop order.
    pub fn sccs(&self) -> Vec<Vec<usize>> {
        const UNVISITED: usize = usize::MAX;
        let n = self.len();
        let mut index = vec![UNVISITED; n];
        let mut low = vec![0usize; n];
        let mut on_stack = vec![false; n];
        let mut stack = Vec::new();
        let mut frames: Vec<(usize, usize)> = Vec::new();
        let mut components = Vec::new();
        let mut counter = 0;

        for root in 0..n {
            if index[root] != UNVISITED {
                continue;
            }
            index[root] = counter;
            low[root] = counter;
            counter += 1;
            stack.push(root);
            on_stack[root] = true;
            frames.push((root, 0));

            while let Some(&(node, position)) = frames.last() {
                if let Some(&next) = self.links[node].get(position) {
                    let top = frames.len() - 1;
                    frames[top].1 += 1;
                    if index[next] == UNVISITED {
                        index[next] = counter;
                        low[next] = counter;
                        counter += 1;
                        stack.push(next);
                        on_stack[next] = true;
                        frames.push((next, 0));
                    } else if on_stack[next] {
                        low[node] = low[node].min(index[next]);
                    }
                    continue;
                }

                frames.pop();
                if let Some(&(parent, _)) = frames.last() {
                    low[parent] = low[parent].min(low[node]);
                }
                if low[node] == index[node] {
                    let mut component = Vec::new();
                    while let Some(member) = stack.pop() {
                        on_stack[member] = false;
                        component.push(member);
                        if member == node {
                            break;
                        }
                    }
                    components.push(component);
                }
            }
        }
        components
    }

    /// Nodes that can never be revisited: singleton components without a
    /// self-loop
    pub fn transient_nodes(&self) -> Vec<usize> {
        let mut nodes: Vec<usize> = self
            .sccs()
            .into_iter()
            .filter(|c| c.len() == 1 && !self.has_self_loop(c[0]))
            .map(|c| c[0])
            .collect();
        nodes.sort_unstable();
        nodes
    }

    /// Components that can be revisited: size above one, or a singleton with
    /// a self-loop
    pub fn terminal_components(&self) -> Vec<Vec<usize>> {
        self.sccs()
            .into_iter()
            .filter(|c| c.len() > 1 || self.has_self_loop(c[0]))
            .collect()
    }

    /// Terminal components with no link leaving the component
    pub fn sink_components(&self) -> Vec<Vec<usize>> {
        self.terminal_components()
            .into_iter()
            .filter(|c| {
                let members: HashSet<usize> = c.iter().copied().collect();
                c.iter().all(|m| self.links[*m].iter().all(|to| members.contains(to)))
            })
            .collect()
    }

    /// Nodes visited by a traversal starting at `from` (including `from`)
    pub fn reachable_from(&self, from: usize) -> Vec<bool> {
        traverse(&self.links, from)
    }

    /// Nodes from which `to` can be reached (including `to`)
    pub fn reaching(&self, to: usize) -> Vec<bool> {
        let mut reverse = vec![Vec::new(); self.len()];
        for (from, dest) in self.edges() {
            reverse[dest].push(from);
        }
        traverse(&reverse, to)
    }

    pub fn is_accessible(&self, from: usize, to: usize) -> bool {
        if from >= self.len() || to >= self.len() {
            return false;
        }
        self.reachable_from(from)[to]
    }

    /// Graph holding the edges present in both `self` and `other`
    pub fn common_subgraph(&self, other: &DirectedGraph) -> Result<DirectedGraph> {
        if self.len() != other.len() {
            return Err(Error::SpaceMismatch { expected: self.len(), got: other.len() });
        }
        let mut common = DirectedGraph::new(self.len());
        for (from, to) in self.edges() {
            if other.has_link(from, to) {
                common.add_link(from, to)?;
            }
        }
        Ok(common)
    }

    /// Render as DOT text
    pub fn to_dot(&self, options: &DotOptions) -> String {
        let mut incoming = vec![false; self.len()];
        for (_, to) in self.edges() {
            incoming[to] = true;
        }

        let mut out = String::from("digraph \"\" {\n");
        for node in 0..self.len() {
            if options.remove_isolated && self.links[node].is_empty() && !incoming[node] {
                continue;
            }
            let _ = writeln!(
                out,
                "  {} [ {}];",
                node,
                render_attributes(options.node_attributes.get(&node))
            );
        }
        for (from, to) in self.edges() {
            let _ = writeln!(
                out,
                "  {} -> {} [ {}];",
                from,
                to,
                render_attributes(options.edge_attributes.get(&(from, to)))
            );
        }
        out.push_str("}\n");
        out
    }
}

/// Options for [`DirectedGraph::to_dot`]
#[derive(Clone, Debug, Default)]
pub struct DotOptions {
    /// Skip nodes with neither incoming nor outgoing edges
    pub remove_isolated: bool,
    pub node_attributes: BTreeMap<usize, Attributes>,
    pub edge_attributes: BTreeMap<(usize, usize), Attributes>,
}

fn render_attributes(attributes: Option<&Attributes>) -> String {
    attributes
        .into_iter()
        .flatten()
        .map(|(k, v)| format!("{}=\"{}\"; ", k, v.replace('"', "\\\"")))
        .collect()
}

fn traverse(links: &[Vec<usize>], start: usize) -> Vec<bool> {
    let mut seen = vec![false; links.len()];
    if start >= links.len() {
        return seen;
    }
    let mut queue = VecDeque::from([start]);
    seen[start] = true;
    while let Some(node) = queue.pop_front() {
        for &next in &links[node] {
            if !seen[next] {
                seen[next] = true;
                queue.push_back(next);
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DirectedGraph {
        let mut g = DirectedGraph::new(5);
        for (from, to) in [(1, 0), (0, 2), (2, 1), (0, 3), (3, 4), (4, 4)] {
            g.add_link(from, to).unwrap();
        }
        g
    }

    fn sorted(mut components: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
        components.iter_mut().for_each(|c| c.sort_unstable());
        components.sort();
        components
    }

    #[test]
    fn test_sccs() {
        let g = sample();
        assert_eq!(sorted(g.sccs()), vec![vec![0, 1, 2], vec![3], vec![4]]);
        assert_eq!(g.sccs()[0], vec![4]);
    }

    #[test]
    fn test_transient_and_terminal() {
        let g = sample();
        assert_eq!(g.transient_nodes(), vec![3]);
        assert_eq!(sorted(g.terminal_components()), vec![vec![0, 1, 2], vec![4]]);
        assert_eq!(g.sink_components(), vec![vec![4]]);
    }

    #[test]
    fn test_accessibility() {
        let g = sample();
        assert!(g.is_accessible(0, 4));
        assert!(g.is_accessible(2, 2));
        assert!(!g.is_accessible(3, 0));
        assert!(!g.is_accessible(0, 9));
        assert_eq!(g.reaching(3), vec![true, true, true, true, false]);
    }

    #[test]
    fn test_add_link_range() {
        let mut g = DirectedGraph::new(3);
        assert!(matches!(g.add_link(0, 3), Err(Error::InvalidStateIndex { index: 3, size: 3 })));
        assert!(g.add_link_once(0, 1).unwrap());
        assert!(!g.add_link_once(0, 1).unwrap());
        g.add_link(0, 1).unwrap();
        assert_eq!(g.links(0), &[1, 1]);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn test_common_subgraph() {
        let g = sample();
        let mut h = DirectedGraph::new(5);
        h.add_link(0, 2).unwrap();
        h.add_link(2, 0).unwrap();
        h.add_link(4, 4).unwrap();
        let common = g.common_subgraph(&h).unwrap();
        assert_eq!(common.edges().collect::<Vec<_>>(), vec![(0, 2), (4, 4)]);
        assert!(g.common_subgraph(&DirectedGraph::new(4)).is_err());
    }

    #[test]
    fn test_dot_output() {
        let mut g = DirectedGraph::new(3);
        g.add_link(0, 1).unwrap();
        g.add_link(0, 1).unwrap();
        let mut options = DotOptions::default();
        options
            .node_attributes
            .insert(0, Attributes::from([("label".to_string(), "0_cccccc".to_string())]));

        let dot = g.to_dot(&options);
        assert_eq!(
            dot,
            "digraph \"\" {\n  0 [ label=\"0_cccccc\"; ];\n  1 [ ];\n  2 [ ];\n  0 -> 1 [ ];\n}\n"
        );

        options.remove_isolated = true;
        assert!(!g.to_dot(&options).contains("  2 ["));
    }
}
