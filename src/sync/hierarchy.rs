//! Parent/child forests built from flat parent-id references.
//!
//! The same builder serves freshly fetched remote items and persisted
//! tracked items. Construction walks an index table without recursion. A
//! parent chain that loops back on itself is broken by promoting every
//! member of the loop to a root, and the loop is returned to the caller.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::{RemoteItem, TrackedItem};

/// An item that names itself and, optionally, its parent.
pub trait HierarchyItem {
    fn node_id(&self) -> &str;
    fn parent_node_id(&self) -> Option<&str>;
}

impl HierarchyItem for RemoteItem {
    fn node_id(&self) -> &str {
        &self.id
    }

    fn parent_node_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }
}

impl HierarchyItem for TrackedItem {
    fn node_id(&self) -> &str {
        &self.remote_id
    }

    fn parent_node_id(&self) -> Option<&str> {
        self.parent_remote_id.as_deref()
    }
}

/// An item together with its children. Serializes as the item's own fields
/// plus a `children` array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node<T> {
    #[serde(flatten)]
    pub item: T,
    pub children: Vec<Node<T>>,
}

/// A built forest plus the parent loops that had to be broken to build it.
#[derive(Debug, Clone, PartialEq)]
pub struct Forest<T> {
    pub roots: Vec<Node<T>>,
    /// Member ids of each loop, in parent-chain order
    pub cycles: Vec<Vec<String>>,
}

impl<T> Forest<T> {
    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    /// Number of items that sat on a parent loop.
    pub fn cycle_members(&self) -> usize {
        self.cycles.iter().map(Vec::len).sum()
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    New,
    OnPath,
    Done,
}

/// Builds a forest from flat items.
///
/// Items whose parent id is absent or unknown become roots; children keep
/// their input order. If two items share an id the later record replaces
/// the earlier one in place. Members of a parent loop become roots.
pub fn build_forest<T: HierarchyItem>(items: Vec<T>) -> Forest<T> {
    let mut slots: Vec<Option<T>> = Vec::with_capacity(items.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(items.len());

    for item in items {
        match index.get(item.node_id()) {
            Some(&slot) => slots[slot] = Some(item),
            None => {
                index.insert(item.node_id().to_string(), slots.len());
                slots.push(Some(item));
            }
        }
    }

    let mut parents: Vec<Option<usize>> = slots
        .iter()
        .map(|slot| {
            slot.as_ref()
                .and_then(|item| item.parent_node_id())
                .and_then(|parent| index.get(parent).copied())
        })
        .collect();

    let cycles = break_cycles(&mut parents, &slots);

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); slots.len()];
    let mut roots = Vec::new();
    for (idx, parent) in parents.iter().enumerate() {
        match parent {
            Some(parent) => children[*parent].push(idx),
            None => roots.push(idx),
        }
    }

    // Pre-order walk, then assemble in reverse so children exist before
    // their parent is built.
    let mut order = Vec::with_capacity(slots.len());
    let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
    while let Some(idx) = stack.pop() {
        order.push(idx);
        stack.extend(children[idx].iter().rev());
    }

    let mut built: Vec<Option<Node<T>>> = (0..slots.len()).map(|_| None).collect();
    for &idx in order.iter().rev() {
        let Some(item) = slots[idx].take() else {
            continue;
        };
        let kids = children[idx]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[idx] = Some(Node {
            item,
            children: kids,
        });
    }

    let roots = roots
        .iter()
        .filter_map(|&root| built[root].take())
        .collect();
    Forest { roots, cycles }
}

/// Cuts the parent link of every node on a loop and returns the loops.
fn break_cycles<T: HierarchyItem>(
    parents: &mut [Option<usize>],
    slots: &[Option<T>],
) -> Vec<Vec<String>> {
    let mut state = vec![Visit::New; parents.len()];
    let mut cycles = Vec::new();

    for start in 0..parents.len() {
        let mut path: Vec<usize> = Vec::new();
        let mut current = Some(start);

        while let Some(idx) = current {
            match state[idx] {
                Visit::Done => break,
                Visit::OnPath => {
                    let from = path.iter().position(|&p| p == idx).unwrap_or(0);
                    let mut ids = Vec::with_capacity(path.len() - from);
                    for &member in &path[from..] {
                        parents[member] = None;
                        if let Some(item) = slots[member].as_ref() {
                            ids.push(item.node_id().to_string());
                        }
                    }
                    cycles.push(ids);
                    break;
                }
                Visit::New => {
                    state[idx] = Visit::OnPath;
                    path.push(idx);
                    current = parents[idx];
                }
            }
        }

        for idx in path {
            state[idx] = Visit::Done;
        }
    }

    cycles
}

/// Builds the forest of persisted items for one vault.
///
/// Stored parent references can loop even when every listing was acyclic,
/// since a parent change is only written when the item itself is updated.
pub fn tracked_forest(vault_id: i64, items: Vec<TrackedItem>) -> Vec<Node<TrackedItem>> {
    let forest = build_forest(items);
    for cycle in &forest.cycles {
        tracing::warn!(
            vault_id,
            members = %cycle.join(", "),
            "Stored parent references form a loop, showing members as roots"
        );
    }
    forest.roots
}

/// Flattens a forest depth-first into `(depth, item)` pairs.
pub fn walk<T>(forest: &[Node<T>]) -> Vec<(usize, &T)> {
    let mut out = Vec::new();
    let mut stack: Vec<(usize, &Node<T>)> = forest.iter().rev().map(|n| (0, n)).collect();
    while let Some((depth, node)) = stack.pop() {
        out.push((depth, &node.item));
        stack.extend(node.children.iter().rev().map(|c| (depth + 1, c)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Item {
        id: String,
        parent: Option<String>,
        label: &'static str,
    }

    impl HierarchyItem for Item {
        fn node_id(&self) -> &str {
            &self.id
        }

        fn parent_node_id(&self) -> Option<&str> {
            self.parent.as_deref()
        }
    }

    fn item(id: &str, parent: Option<&str>) -> Item {
        Item {
            id: id.to_string(),
            parent: parent.map(String::from),
            label: "",
        }
    }

    fn ids<T: HierarchyItem>(nodes: &[Node<T>]) -> Vec<&str> {
        nodes.iter().map(|n| n.item.node_id()).collect()
    }

    #[test]
    fn test_builds_nested_forest() {
        let forest = build_forest(vec![
            item("doc", Some("sub")),
            item("root", None),
            item("sub", Some("root")),
            item("loose", None),
            item("doc2", Some("root")),
        ])
        .roots;

        assert_eq!(ids(&forest), vec!["root", "loose"]);
        assert_eq!(ids(&forest[0].children), vec!["sub", "doc2"]);
        assert_eq!(ids(&forest[0].children[0].children), vec!["doc"]);
    }

    #[test]
    fn test_unknown_parent_becomes_root() {
        let forest = build_forest(vec![item("a", Some("trash")), item("b", Some("gone"))]).roots;
        assert_eq!(ids(&forest), vec!["a", "b"]);
        assert!(forest.iter().all(|n| n.children.is_empty()));
    }

    #[test]
    fn test_empty_input() {
        let forest: Forest<Item> = build_forest(Vec::new());
        assert!(forest.roots.is_empty());
        assert!(!forest.has_cycles());
    }

    #[test]
    fn test_duplicate_id_last_record_wins() {
        let mut second = item("a", None);
        second.label = "second";
        let forest = build_forest(vec![item("a", None), item("b", None), second]).roots;

        assert_eq!(ids(&forest), vec!["a", "b"]);
        assert_eq!(forest[0].item.label, "second");
    }

    #[test]
    fn test_cycle_members_become_roots() {
        let forest = build_forest(vec![
            item("ok", None),
            item("a", Some("b")),
            item("b", Some("c")),
            item("c", Some("a")),
            item("leaf", Some("b")),
        ]);

        assert_eq!(forest.cycles.len(), 1);
        let mut members = forest.cycles[0].clone();
        members.sort();
        assert_eq!(members, vec!["a", "b", "c"]);
        assert_eq!(forest.cycle_members(), 3);

        assert_eq!(ids(&forest.roots), vec!["ok", "a", "b", "c"]);
        let b = forest.roots.iter().find(|n| n.item.id == "b").unwrap();
        assert_eq!(ids(&b.children), vec!["leaf"]);
        assert_eq!(walk(&forest.roots).len(), 5);
    }

    #[test]
    fn test_self_parent_is_a_cycle() {
        let forest = build_forest(vec![item("a", Some("a")), item("b", Some("a"))]);
        assert_eq!(forest.cycles, vec![vec!["a".to_string()]]);
        assert_eq!(ids(&forest.roots), vec!["a"]);
        assert_eq!(ids(&forest.roots[0].children), vec!["b"]);
    }

    #[test]
    fn test_separate_cycles_are_all_broken() {
        let forest = build_forest(vec![
            item("a", Some("b")),
            item("b", Some("a")),
            item("x", Some("y")),
            item("y", Some("x")),
        ]);

        assert_eq!(forest.cycles.len(), 2);
        assert_eq!(forest.roots.len(), 4);
    }

    #[test]
    fn test_long_chain() {
        let mut items = vec![item("n0", None)];
        for i in 1..1_000 {
            items.push(item(&format!("n{}", i), Some(&format!("n{}", i - 1))));
        }

        let forest = build_forest(items);
        assert!(!forest.has_cycles());
        let flat = walk(&forest.roots);
        assert_eq!(flat.len(), 1_000);
        assert_eq!(flat.last().unwrap().0, 999);
    }

    #[test]
    fn test_identical_input_gives_identical_forest() {
        let input = vec![item("r", None), item("c", Some("r"))];
        assert_eq!(build_forest(input.clone()), build_forest(input));
    }

    #[test]
    fn test_node_serializes_flattened_with_children() {
        let forest = build_forest(vec![item("r", None), item("c", Some("r"))]).roots;
        let json = serde_json::to_value(&forest).unwrap();

        assert_eq!(json[0]["id"], "r");
        assert_eq!(json[0]["children"][0]["id"], "c");
        assert_eq!(json[0]["children"][0]["parent"], "r");
        assert!(json[0]["children"][0]["children"]
            .as_array()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_walk_depths() {
        let forest = build_forest(vec![
            item("r", None),
            item("c1", Some("r")),
            item("g", Some("c1")),
            item("c2", Some("r")),
        ])
        .roots;

        let flat: Vec<(usize, &str)> = walk(&forest)
            .into_iter()
            .map(|(d, i)| (d, i.id.as_str()))
            .collect();
        assert_eq!(flat, vec![(0, "r"), (1, "c1"), (2, "g"), (1, "c2")]);
    }
}
