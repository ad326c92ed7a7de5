//! Static dependency-cycle detection.
//!
//! Runs once before any resolution task is spawned.  The graph has one node
//! per service and an edge `a → b` whenever `a` requires a service name that
//! resolves to `b` under the normal lookup order (plugin-local first, then the
//! export owner).  Names that resolve to nothing are skipped; resolution
//! reports them on its own.  A service that fails before waiting on anything
//! (no factory, unknown requirement, missing library) has no outgoing edges,
//! so a loop through it is never reported.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::plugin::{Plugin, Service};

/// A service on a cycle, with one cycle through it (`a -> b -> a`).
pub(crate) struct CycleMember {
    pub service: Arc<Service>,
    pub cycle: Vec<String>,
}

/// Finds every service that can reach itself through its requirements.
pub(crate) fn find_cycles(
    plugins: &BTreeMap<String, Arc<Plugin>>,
    owners: &HashMap<String, String>,
    fails_immediately: impl Fn(&Plugin, &Service) -> bool,
) -> Vec<CycleMember> {
    let mut nodes: Vec<&Arc<Service>> = Vec::new();
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    for plugin in plugins.values() {
        for service in plugin.services() {
            index.insert((plugin.name(), service.name()), nodes.len());
            nodes.push(service);
        }
    }

    let n = nodes.len();
    let mut deps: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut in_degree: Vec<usize> = vec![0; n];

    for (i, service) in nodes.iter().enumerate() {
        let Some(plugin) = plugins.get(service.plugin()) else {
            continue;
        };
        let host: &Plugin = plugin;
        let node: &Service = service;
        if fails_immediately(host, node) {
            continue;
        }
        for name in service.config().service_requirements() {
            let target = if plugin.has(name) {
                index.get(&(plugin.name(), name))
            } else {
                owners
                    .get(name)
                    .and_then(|owner| index.get(&(owner.as_str(), name)))
            };
            if let Some(&j) = target {
                deps[i].push(j);
                dependents[j].push(i);
                in_degree[i] += 1;
            }
        }
    }

    // Kahn's algorithm: peel off everything that does not wait on a cycle.
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    while let Some(i) = queue.pop_front() {
        for &j in &dependents[i] {
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                queue.push_back(j);
            }
        }
    }

    // What remains either lies on a cycle or depends on one.
    let remaining: Vec<bool> = in_degree.iter().map(|&d| d > 0).collect();
    (0..n)
        .filter(|&i| remaining[i])
        .filter_map(|i| {
            cycle_through(i, &deps, &remaining).map(|path| CycleMember {
                service: Arc::clone(nodes[i]),
                cycle: path.into_iter().map(|j| nodes[j].name().to_string()).collect(),
            })
        })
        .collect()
}

/// Shortest path `start -> … -> start` inside the remaining subgraph.
fn cycle_through(start: usize, deps: &[Vec<usize>], remaining: &[bool]) -> Option<Vec<usize>> {
    let mut prev: HashMap<usize, usize> = HashMap::new();
    let mut seen: HashSet<usize> = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        for &dep in &deps[node] {
            if !remaining[dep] {
                continue;
            }
            if dep == start {
                let mut path = vec![node];
                let mut current = node;
                while current != start {
                    let Some(&p) = prev.get(&current) else { break };
                    path.push(p);
                    current = p;
                }
                path.reverse();
                path.push(start);
                return Some(path);
            }
            if seen.insert(dep) {
                prev.insert(dep, node);
                queue.push_back(dep);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(usize, usize)], n: usize) -> Vec<Vec<usize>> {
        let mut deps = vec![Vec::new(); n];
        for &(a, b) in edges {
            deps[a].push(b);
        }
        deps
    }

    #[test]
    fn test_cycle_through_finds_shortest_loop() {
        // 0 -> 1 -> 2 -> 0, plus 0 -> 2
        let deps = graph(&[(0, 1), (1, 2), (2, 0), (0, 2)], 3);
        let remaining = vec![true; 3];
        assert_eq!(cycle_through(0, &deps, &remaining), Some(vec![0, 2, 0]));
        assert_eq!(cycle_through(1, &deps, &remaining), Some(vec![1, 2, 0, 1]));
    }

    #[test]
    fn test_self_loop() {
        let deps = graph(&[(0, 0)], 1);
        assert_eq!(cycle_through(0, &deps, &[true]), Some(vec![0, 0]));
    }

    #[test]
    fn test_dependent_of_cycle_is_not_a_member() {
        // 2 depends on the 0 <-> 1 cycle but cannot reach itself.
        let deps = graph(&[(0, 1), (1, 0), (2, 0)], 3);
        let remaining = vec![true; 3];
        assert_eq!(cycle_through(2, &deps, &remaining), None);
        assert!(cycle_through(0, &deps, &remaining).is_some());
    }
}
