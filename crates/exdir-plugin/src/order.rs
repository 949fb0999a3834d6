//! Dependency ordering of plugins.
//!
//! For a capability and direction, plugin A runs before plugin B when A
//! lists B in its `*_before` set or B lists A in its `*_after` set.
//! Constraints naming plugins that do not provide the capability are
//! ignored. Among plugins free to run, the one registered first goes
//! first.

use std::collections::{BTreeSet, HashMap};

use crate::error::{PluginError, PluginResult};
use crate::plugin::{Capability, Direction, Plugin};

/// Indices into `plugins`, in execution order.
pub fn resolve_order(
    plugins: &[Plugin],
    capability: Capability,
    direction: Direction,
) -> PluginResult<Vec<usize>> {
    let enabled: Vec<usize> = (0..plugins.len())
        .filter(|&i| plugins[i].has(capability))
        .collect();
    let index_of: HashMap<&str, usize> =
        enabled.iter().map(|&i| (plugins[i].name(), i)).collect();

    let mut edges: BTreeSet<(usize, usize)> = BTreeSet::new();
    for &i in &enabled {
        let constraints = plugins[i].constraints();
        for other in constraints.before(direction) {
            if let Some(&j) = index_of.get(other.as_str()) {
                edges.insert((i, j));
            }
        }
        for other in constraints.after(direction) {
            if let Some(&j) = index_of.get(other.as_str()) {
                edges.insert((j, i));
            }
        }
    }

    let mut in_degree: HashMap<usize, usize> = enabled.iter().map(|&i| (i, 0)).collect();
    let mut successors: HashMap<usize, Vec<usize>> = HashMap::new();
    for &(from, to) in &edges {
        if from == to {
            continue;
        }
        successors.entry(from).or_default().push(to);
        *in_degree.entry(to).or_default() += 1;
    }
    // A plugin that must run before itself can never be scheduled.
    let self_loops: BTreeSet<usize> = edges
        .iter()
        .filter(|(from, to)| from == to)
        .map(|(from, _)| *from)
        .collect();

    let mut ready: BTreeSet<usize> = in_degree
        .iter()
        .filter(|(i, d)| **d == 0 && !self_loops.contains(*i))
        .map(|(i, _)| *i)
        .collect();
    let mut order = Vec::with_capacity(enabled.len());

    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &succ in successors.get(&next).map(Vec::as_slice).unwrap_or_default() {
            if let Some(d) = in_degree.get_mut(&succ) {
                *d -= 1;
                if *d == 0 && !self_loops.contains(&succ) {
                    ready.insert(succ);
                }
            }
        }
    }

    if order.len() < enabled.len() {
        let placed: BTreeSet<usize> = order.iter().copied().collect();
        let remaining = enabled
            .iter()
            .filter(|i| !placed.contains(*i))
            .map(|&i| plugins[i].name().to_string())
            .collect();
        return Err(PluginError::CircularDependency {
            capability,
            direction,
            plugins: remaining,
        });
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::DatasetStage;
    use exdir_types::ErrorKind;

    struct Passthrough;
    impl DatasetStage for Passthrough {}

    fn names(plugins: &[Plugin], order: &[usize]) -> Vec<String> {
        order.iter().map(|&i| plugins[i].name().to_string()).collect()
    }

    #[test]
    fn before_and_after_chain() {
        let plugins = vec![
            Plugin::new("a").write_before(["c"]).dataset(Passthrough),
            Plugin::new("b").write_after(["a"]).dataset(Passthrough),
            Plugin::new("c").write_after(["b"]).dataset(Passthrough),
        ];
        let order = resolve_order(&plugins, Capability::Dataset, Direction::Write).unwrap();
        assert_eq!(names(&plugins, &order), ["a", "b", "c"]);
    }

    #[test]
    fn registration_order_breaks_ties() {
        let plugins = vec![
            Plugin::new("z").dataset(Passthrough),
            Plugin::new("y").dataset(Passthrough),
            Plugin::new("x").write_before(["z"]).dataset(Passthrough),
        ];
        let order = resolve_order(&plugins, Capability::Dataset, Direction::Write).unwrap();
        assert_eq!(names(&plugins, &order), ["y", "x", "z"]);
    }

    #[test]
    fn directions_are_independent() {
        let plugins = vec![
            Plugin::new("a").read_after(["b"]).dataset(Passthrough),
            Plugin::new("b").dataset(Passthrough),
        ];
        let write = resolve_order(&plugins, Capability::Dataset, Direction::Write).unwrap();
        let read = resolve_order(&plugins, Capability::Dataset, Direction::Read).unwrap();
        assert_eq!(names(&plugins, &write), ["a", "b"]);
        assert_eq!(names(&plugins, &read), ["b", "a"]);
    }

    #[test]
    fn cycle_is_reported_with_its_members() {
        let plugins = vec![
            Plugin::new("free").dataset(Passthrough),
            Plugin::new("a").write_before(["b"]).dataset(Passthrough),
            Plugin::new("b").write_before(["a"]).dataset(Passthrough),
        ];
        let err = resolve_order(&plugins, Capability::Dataset, Direction::Write).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CircularDependency);
        match err {
            PluginError::CircularDependency { plugins, .. } => assert_eq!(plugins, ["a", "b"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let plugins = vec![Plugin::new("loop").write_after(["loop"]).dataset(Passthrough)];
        let err = resolve_order(&plugins, Capability::Dataset, Direction::Write).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CircularDependency);
    }

    #[test]
    fn constraints_on_other_capabilities_are_dropped() {
        // "b" has no dataset stage, so the cycle through it does not exist
        // for datasets.
        let plugins = vec![
            Plugin::new("a").write_before(["b"]).write_after(["b"]).dataset(Passthrough),
            Plugin::new("b").group(
                |_: &str, _: &std::path::Path| -> PluginResult<exdir_types::AttrMap> {
                    Ok(Default::default())
                },
            ),
        ];
        let order = resolve_order(&plugins, Capability::Dataset, Direction::Write).unwrap();
        assert_eq!(names(&plugins, &order), ["a"]);
        let order = resolve_order(&plugins, Capability::Group, Direction::Write).unwrap();
        assert_eq!(names(&plugins, &order), ["b"]);
    }
}
