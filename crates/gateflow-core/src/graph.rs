use std::collections::{HashMap, HashSet};

// ---------------------------------------------------------------------------
// DependencyGraph
// ---------------------------------------------------------------------------

/// Directed graph of branch-depends-on-branch edges.
///
/// Derived from the branch table and rebuildable at any time; the only
/// consumer is cascading unapproval, which needs the transitive set of
/// dependents of a branch.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    forward: HashMap<String, Vec<String>>,
    reverse: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `branch -> depends_on` and the reverse edge.
    pub fn add_edge(&mut self, branch: &str, depends_on: &str) {
        self.forward
            .entry(branch.to_string())
            .or_default()
            .push(depends_on.to_string());
        self.reverse
            .entry(depends_on.to_string())
            .or_default()
            .push(branch.to_string());
    }

    /// Branches that `branch` directly depends on.
    pub fn dependencies_of(&self, branch: &str) -> &[String] {
        self.forward.get(branch).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Branches that directly depend on `branch`.
    pub fn dependents_of(&self, branch: &str) -> &[String] {
        self.reverse.get(branch).map(Vec::as_slice).unwrap_or(&[])
    }

    /// All branches transitively depending on `branch`, in discovery order,
    /// excluding `branch` itself. Each node is visited at most once, so a
    /// cyclic graph terminates.
    pub fn all_dependents_of(&self, branch: &str) -> Vec<String> {
        let mut visited = HashSet::new();
        visited.insert(branch.to_string());
        let mut out = Vec::new();
        self.collect_dependents(branch, &mut visited, &mut out);
        out
    }

    fn collect_dependents(
        &self,
        branch: &str,
        visited: &mut HashSet<String>,
        out: &mut Vec<String>,
    ) {
        for dependent in self.dependents_of(branch) {
            if visited.insert(dependent.clone()) {
                out.push(dependent.clone());
                self.collect_dependents(dependent, visited, out);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_dependents() {
        let mut g = DependencyGraph::new();
        g.add_edge("b", "a");
        g.add_edge("c", "a");
        let deps = g.dependents_of("a");
        assert_eq!(deps, &["b".to_string(), "c".to_string()]);
        assert!(g.dependents_of("b").is_empty());
    }

    #[test]
    fn transitive_dependents_in_discovery_order() {
        // a <- b <- c, a <- d
        let mut g = DependencyGraph::new();
        g.add_edge("b", "a");
        g.add_edge("c", "b");
        g.add_edge("d", "a");
        let all = g.all_dependents_of("a");
        assert_eq!(all, vec!["b", "c", "d"]);
    }

    #[test]
    fn excludes_start_node() {
        let mut g = DependencyGraph::new();
        g.add_edge("b", "a");
        assert!(!g.all_dependents_of("a").contains(&"a".to_string()));
    }

    #[test]
    fn diamond_visits_each_once() {
        // a <- b <- d, a <- c <- d
        let mut g = DependencyGraph::new();
        g.add_edge("b", "a");
        g.add_edge("c", "a");
        g.add_edge("d", "b");
        g.add_edge("d", "c");
        let all = g.all_dependents_of("a");
        assert_eq!(all.iter().filter(|b| *b == "d").count(), 1);
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn cycle_terminates() {
        let mut g = DependencyGraph::new();
        g.add_edge("b", "a");
        g.add_edge("a", "b");
        let all = g.all_dependents_of("a");
        assert_eq!(all, vec!["b"]);
        let all = g.all_dependents_of("b");
        assert_eq!(all, vec!["a"]);
    }

    #[test]
    fn unknown_branch_has_no_dependents() {
        let g = DependencyGraph::new();
        assert!(g.all_dependents_of("ghost").is_empty());
    }
}
