//! Routine planning.
//!
//! Every rule in the namespace becomes a routine, and so does every other
//! named composite rule, so that the VM's rule depth is counted in calls.
//! Anonymous composite nodes are inlined into their single referrer, except
//! when they are shared by several referrers or close a cycle; those get
//! routines of their own so code size stays linear and emission terminates.

use std::collections::HashMap;

use indexmap::IndexMap;

use scrivener_bytecode::RoutineId;
use scrivener_grammar::{NodeId, RuleGraph};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    Grey,
    Black,
}

/// Which nodes are compiled as routines, and under which entry names.
#[derive(Debug)]
pub struct Plan {
    routines: Vec<NodeId>,
    index: HashMap<NodeId, RoutineId>,
    entries: IndexMap<String, RoutineId>,
}

impl Plan {
    /// Plan routines for everything reachable from `main` and the namespace.
    pub fn new(graph: &RuleGraph, main: NodeId) -> Self {
        let mut plan = Plan {
            routines: Vec::new(),
            index: HashMap::new(),
            entries: IndexMap::new(),
        };

        let roots: Vec<NodeId> = std::iter::once(main)
            .chain(graph.namespace().values().copied())
            .collect();
        for &root in &roots {
            plan.add(root);
        }

        let mut referrers: HashMap<NodeId, usize> = HashMap::new();
        let mut colors: HashMap<NodeId, Color> = HashMap::new();
        let mut back_edges = Vec::new();
        for &root in &roots {
            walk(graph, root, &mut colors, &mut referrers, &mut back_edges);
        }

        // Sorted by node so routine numbering is deterministic.
        let mut shared: Vec<NodeId> = referrers
            .iter()
            .filter(|&(&id, &count)| count > 1 && !graph.op(id).is_terminal())
            .map(|(&id, _)| id)
            .chain(back_edges)
            .chain(colors.keys().copied().filter(|&id| graph.is_rule(id)))
            .collect();
        shared.sort_unstable();
        for id in shared {
            plan.add(id);
        }

        for (name, id) in graph.namespace() {
            let routine = plan.index[id];
            plan.entries.insert(name.clone(), routine);
        }
        plan
    }

    fn add(&mut self, id: NodeId) {
        if self.index.contains_key(&id) {
            return;
        }
        let routine = RoutineId(self.routines.len() as u32);
        self.routines.push(id);
        self.index.insert(id, routine);
    }

    /// Root node of each routine, in routine order.
    pub fn routines(&self) -> &[NodeId] {
        &self.routines
    }

    pub fn routine(&self, id: NodeId) -> Option<RoutineId> {
        self.index.get(&id).copied()
    }

    pub fn entries(&self) -> &IndexMap<String, RoutineId> {
        &self.entries
    }
}

/// Iterative depth-first walk counting referrers and collecting the targets
/// of back edges. Every cycle contains at least one back edge.
fn walk(
    graph: &RuleGraph,
    root: NodeId,
    colors: &mut HashMap<NodeId, Color>,
    referrers: &mut HashMap<NodeId, usize>,
    back_edges: &mut Vec<NodeId>,
) {
    if colors.contains_key(&root) {
        return;
    }
    colors.insert(root, Color::Grey);
    let mut stack = vec![(root, graph.op(root).children(), 0usize)];

    while let Some((id, children, next)) = stack.last_mut() {
        let Some(&child) = children.get(*next) else {
            colors.insert(*id, Color::Black);
            stack.pop();
            continue;
        };
        *next += 1;
        *referrers.entry(child).or_default() += 1;
        match colors.get(&child) {
            Some(Color::Grey) => back_edges.push(child),
            Some(Color::Black) => {}
            None => {
                colors.insert(child, Color::Grey);
                stack.push((child, graph.op(child).children(), 0));
            }
        }
    }
}

/// Routine name for node `id`: the rule name, or the node id when anonymous.
pub fn routine_name(graph: &RuleGraph, id: NodeId) -> String {
    match graph.node(id).name() {
        Some(name) => name.to_string(),
        None => id.to_string(),
    }
}
