//! Declared dependency edges between named resources.
//!
//! The graph is the contract between the composition root and the
//! provisioning engine: a dependent resource is never created before every
//! resource it depends on exists, and teardown walks the exact reverse of
//! the provisioning order.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// A dependency graph over named resources.
///
/// Nodes keep insertion order so that `provision_order` is deterministic
/// across runs: independent resources surface in the order they were
/// declared, not in hash order.
#[derive(Default)]
pub struct ResourceGraph {
    nodes: Vec<String>,
    dependencies: HashMap<String, BTreeSet<String>>,
}

impl ResourceGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            dependencies: HashMap::new(),
        }
    }

    /// Add a resource node. Adding an existing node is a no-op.
    pub fn add(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.nodes.contains(&name) {
            debug!("Declaring graph node: {}", name);
            self.dependencies.entry(name.clone()).or_default();
            self.nodes.push(name);
        }
    }

    /// Declare that `node` depends on `dependency`.
    ///
    /// Both endpoints are added to the graph if not already present.
    pub fn depends_on(&mut self, node: impl Into<String>, dependency: impl Into<String>) {
        let node = node.into();
        let dependency = dependency.into();
        self.add(node.clone());
        self.add(dependency.clone());
        debug!("Declaring edge: {} -> {}", node, dependency);
        self.dependencies.entry(node).or_default().insert(dependency);
    }

    /// Check whether a node is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }

    /// Direct dependencies of a node.
    pub fn dependencies_of(&self, name: &str) -> CoreResult<Vec<String>> {
        self.dependencies
            .get(name)
            .map(|deps| deps.iter().cloned().collect())
            .ok_or_else(|| CoreError::UnknownResource(name.to_string()))
    }

    /// All transitive dependencies of a node.
    pub fn ancestors(&self, name: &str) -> CoreResult<BTreeSet<String>> {
        if !self.contains(name) {
            return Err(CoreError::UnknownResource(name.to_string()));
        }
        let mut seen = BTreeSet::new();
        let mut stack = vec![name.to_string()];
        while let Some(current) = stack.pop() {
            if let Some(deps) = self.dependencies.get(&current) {
                for dep in deps {
                    if seen.insert(dep.clone()) {
                        stack.push(dep.clone());
                    }
                }
            }
        }
        Ok(seen)
    }

    /// Compute a deterministic topological ordering of all nodes.
    ///
    /// A node appears only after every node it depends on. Independent
    /// nodes appear in declaration order.
    pub fn provision_order(&self) -> CoreResult<Vec<String>> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut placed: BTreeSet<String> = BTreeSet::new();

        while order.len() < self.nodes.len() {
            let mut progressed = false;
            for node in &self.nodes {
                if placed.contains(node) {
                    continue;
                }
                let ready = self.dependencies[node]
                    .iter()
                    .all(|dep| placed.contains(dep));
                if ready {
                    placed.insert(node.clone());
                    order.push(node.clone());
                    progressed = true;
                }
            }
            if !progressed {
                let stuck: Vec<&str> = self
                    .nodes
                    .iter()
                    .filter(|n| !placed.contains(*n))
                    .map(|n| n.as_str())
                    .collect();
                return Err(CoreError::DependencyCycle(stuck.join(", ")));
            }
        }
        Ok(order)
    }

    /// Teardown order: the strict reverse of the provisioning order.
    pub fn teardown_order(&self) -> CoreResult<Vec<String>> {
        let mut order = self.provision_order()?;
        order.reverse();
        Ok(order)
    }

    /// Nodes that depend on `name`, directly or transitively.
    pub fn dependents_of(&self, name: &str) -> CoreResult<Vec<String>> {
        if !self.contains(name) {
            return Err(CoreError::UnknownResource(name.to_string()));
        }
        let mut dependents = Vec::new();
        for node in &self.nodes {
            if node != name && self.ancestors(node)?.contains(name) {
                dependents.push(node.clone());
            }
        }
        Ok(dependents)
    }

    /// Number of declared nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl std::fmt::Debug for ResourceGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceGraph")
            .field("nodes", &self.nodes)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology_graph() -> ResourceGraph {
        let mut graph = ResourceGraph::new();
        graph.add("network");
        graph.add("registry");
        graph.depends_on("cluster", "network");
        graph.depends_on("balancers", "network");
        graph.depends_on("service", "cluster");
        graph.depends_on("service", "balancers");
        graph.depends_on("service", "registry");
        graph
    }

    #[test]
    fn test_provision_order_respects_dependencies() {
        let graph = topology_graph();
        let order = graph.provision_order().unwrap();

        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert!(pos("network") < pos("cluster"));
        assert!(pos("network") < pos("balancers"));
        assert!(pos("cluster") < pos("service"));
        assert!(pos("balancers") < pos("service"));
        assert!(pos("registry") < pos("service"));
        assert_eq!(order.len(), 5);
    }

    #[test]
    fn test_provision_order_is_deterministic() {
        let first = topology_graph().provision_order().unwrap();
        for _ in 0..10 {
            assert_eq!(topology_graph().provision_order().unwrap(), first);
        }
    }

    #[test]
    fn test_teardown_order_is_strict_reverse() {
        let graph = topology_graph();
        let mut expected = graph.provision_order().unwrap();
        expected.reverse();
        assert_eq!(graph.teardown_order().unwrap(), expected);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let mut graph = ResourceGraph::new();
        graph.depends_on("a", "b");
        graph.depends_on("b", "c");
        graph.depends_on("c", "a");

        let err = graph.provision_order().unwrap_err();
        assert!(matches!(err, CoreError::DependencyCycle(_)));
    }

    #[test]
    fn test_ancestors_are_transitive() {
        let graph = topology_graph();
        let ancestors = graph.ancestors("service").unwrap();

        assert!(ancestors.contains("cluster"));
        assert!(ancestors.contains("balancers"));
        assert!(ancestors.contains("registry"));
        // network is reached only through cluster and balancers
        assert!(ancestors.contains("network"));
    }

    #[test]
    fn test_dependents_of_network() {
        let graph = topology_graph();
        let mut dependents = graph.dependents_of("network").unwrap();
        dependents.sort();

        assert_eq!(dependents, vec!["balancers", "cluster", "service"]);
    }

    #[test]
    fn test_unknown_resource() {
        let graph = topology_graph();
        assert!(matches!(
            graph.ancestors("missing"),
            Err(CoreError::UnknownResource(_))
        ));
    }
}
