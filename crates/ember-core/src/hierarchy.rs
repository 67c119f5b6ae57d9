//! Parent/child hierarchy primitive.
//!
//! Nodes are plain values owned by whatever container stores the tree (the
//! ECS keeps one inside every entity). All tree operations go through the
//! [`NodeStore`] trait so the container decides how keys map to nodes.

use crate::error::HierarchyError;

/// Parent and ordered children of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyNode<K> {
    parent: Option<K>,
    children: Vec<K>,
}

impl<K: Copy + PartialEq> HierarchyNode<K> {
    pub fn new() -> Self {
        Self {
            parent: None,
            children: Vec::new(),
        }
    }

    /// The current parent, if attached.
    pub fn parent(&self) -> Option<K> {
        self.parent
    }

    /// Children in insertion order.
    pub fn children(&self) -> &[K] {
        &self.children
    }

    /// Drop every link. Used when the owner is torn down.
    pub fn clear(&mut self) {
        self.parent = None;
        self.children.clear();
    }

    fn remove_child(&mut self, child: K) {
        if let Some(pos) = self.children.iter().position(|c| *c == child) {
            self.children.remove(pos);
        }
    }
}

impl<K: Copy + PartialEq> Default for HierarchyNode<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Lookup from key to node, implemented by the owning container.
pub trait NodeStore<K: Copy + PartialEq> {
    fn node(&self, key: K) -> Option<&HierarchyNode<K>>;
    fn node_mut(&mut self, key: K) -> Option<&mut HierarchyNode<K>>;
}

/// Result of a reparent, handed back so the caller can run its own
/// "parent changed" notification synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentChange<K> {
    pub node: K,
    pub old: Option<K>,
    pub new: Option<K>,
}

impl<K: PartialEq> ParentChange<K> {
    /// Whether the parent actually changed.
    pub fn changed(&self) -> bool {
        self.old != self.new
    }
}

/// Move `node` under `parent` (or detach it when `parent` is `None`).
///
/// The node is appended after the new parent's existing children.
/// Rejects self-parenting and moves that would put a node under its own
/// descendant.
pub fn set_parent<K, S>(
    store: &mut S,
    node: K,
    parent: Option<K>,
) -> Result<ParentChange<K>, HierarchyError>
where
    K: Copy + PartialEq,
    S: NodeStore<K> + ?Sized,
{
    let old = store.node(node).ok_or(HierarchyError::MissingNode)?.parent;

    if let Some(p) = parent {
        if p == node {
            return Err(HierarchyError::SelfParent);
        }
        if store.node(p).is_none() {
            return Err(HierarchyError::MissingNode);
        }
        if is_descendant(store, p, node) {
            return Err(HierarchyError::Cycle);
        }
    }

    if old == parent {
        return Ok(ParentChange { node, old, new: parent });
    }

    if let Some(old_parent) = old.and_then(|o| store.node_mut(o)) {
        old_parent.remove_child(node);
    }
    if let Some(new_parent) = parent.and_then(|p| store.node_mut(p)) {
        new_parent.children.push(node);
    }
    if let Some(n) = store.node_mut(node) {
        n.parent = parent;
    }

    Ok(ParentChange { node, old, new: parent })
}

/// Detach `node` from its parent. Returns the previous parent.
pub fn detach<K, S>(store: &mut S, node: K) -> Option<K>
where
    K: Copy + PartialEq,
    S: NodeStore<K> + ?Sized,
{
    let old = store.node_mut(node)?.parent.take()?;
    if let Some(parent) = store.node_mut(old) {
        parent.remove_child(node);
    }
    Some(old)
}

/// Whether `node` sits somewhere below `ancestor`.
pub fn is_descendant<K, S>(store: &S, node: K, ancestor: K) -> bool
where
    K: Copy + PartialEq,
    S: NodeStore<K> + ?Sized,
{
    let mut current = store.node(node).and_then(|n| n.parent);
    while let Some(c) = current {
        if c == ancestor {
            return true;
        }
        current = store.node(c).and_then(|n| n.parent);
    }
    false
}

/// Topmost ancestor of `node` (the node itself when detached).
pub fn root_of<K, S>(store: &S, node: K) -> K
where
    K: Copy + PartialEq,
    S: NodeStore<K> + ?Sized,
{
    let mut root = node;
    while let Some(p) = store.node(root).and_then(|n| n.parent) {
        root = p;
    }
    root
}

/// Collect `root` and its descendants in pre-order.
///
/// `enter` is asked about every node before it is recorded; returning
/// `false` skips that node together with its whole subtree. The walk is a
/// snapshot, so callers are free to mutate the tree while processing it.
pub fn walk_subtree<K, S, F>(store: &S, root: K, mut enter: F) -> Vec<K>
where
    K: Copy + PartialEq,
    S: NodeStore<K> + ?Sized,
    F: FnMut(K) -> bool,
{
    let mut order = Vec::new();
    let mut stack = vec![root];
    while let Some(key) = stack.pop() {
        if !enter(key) {
            continue;
        }
        order.push(key);
        if let Some(node) = store.node(key) {
            stack.extend(node.children.iter().rev().copied());
        }
    }
    order
}

/// All descendants of `root` in pre-order, excluding `root` itself.
pub fn descendants<K, S>(store: &S, root: K) -> Vec<K>
where
    K: Copy + PartialEq,
    S: NodeStore<K> + ?Sized,
{
    let mut all = walk_subtree(store, root, |_| true);
    all.remove(0);
    all
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Tree(HashMap<u32, HierarchyNode<u32>>);

    impl Tree {
        fn with_nodes(n: u32) -> Self {
            let mut tree = Self::default();
            for i in 0..n {
                tree.0.insert(i, HierarchyNode::new());
            }
            tree
        }
    }

    impl NodeStore<u32> for Tree {
        fn node(&self, key: u32) -> Option<&HierarchyNode<u32>> {
            self.0.get(&key)
        }

        fn node_mut(&mut self, key: u32) -> Option<&mut HierarchyNode<u32>> {
            self.0.get_mut(&key)
        }
    }

    #[test]
    fn reparent_moves_between_children_lists() {
        let mut tree = Tree::with_nodes(3);
        set_parent(&mut tree, 2, Some(0)).unwrap();
        let change = set_parent(&mut tree, 2, Some(1)).unwrap();

        assert_eq!(change.old, Some(0));
        assert_eq!(change.new, Some(1));
        assert!(change.changed());
        assert!(tree.node(0).unwrap().children().is_empty());
        assert_eq!(tree.node(1).unwrap().children(), &[2]);
        assert_eq!(tree.node(2).unwrap().parent(), Some(1));
    }

    #[test]
    fn same_parent_is_not_a_change() {
        let mut tree = Tree::with_nodes(2);
        set_parent(&mut tree, 1, Some(0)).unwrap();
        let change = set_parent(&mut tree, 1, Some(0)).unwrap();
        assert!(!change.changed());
        assert_eq!(tree.node(0).unwrap().children(), &[1]);
    }

    #[test]
    fn rejects_cycles() {
        let mut tree = Tree::with_nodes(3);
        set_parent(&mut tree, 1, Some(0)).unwrap();
        set_parent(&mut tree, 2, Some(1)).unwrap();

        assert_eq!(set_parent(&mut tree, 0, Some(2)), Err(HierarchyError::Cycle));
        assert_eq!(set_parent(&mut tree, 0, Some(0)), Err(HierarchyError::SelfParent));
        assert_eq!(set_parent(&mut tree, 9, Some(0)), Err(HierarchyError::MissingNode));
    }

    #[test]
    fn preorder_walk_with_pruning() {
        //  0
        //  |- 1
        //  |   |- 3
        //  |- 2
        //      |- 4
        let mut tree = Tree::with_nodes(5);
        set_parent(&mut tree, 1, Some(0)).unwrap();
        set_parent(&mut tree, 2, Some(0)).unwrap();
        set_parent(&mut tree, 3, Some(1)).unwrap();
        set_parent(&mut tree, 4, Some(2)).unwrap();

        assert_eq!(walk_subtree(&tree, 0, |_| true), vec![0, 1, 3, 2, 4]);
        assert_eq!(walk_subtree(&tree, 0, |k| k != 2), vec![0, 1, 3]);
        assert_eq!(descendants(&tree, 1), vec![3]);
        assert_eq!(root_of(&tree, 4), 0);
    }

    #[test]
    fn detach_returns_old_parent() {
        let mut tree = Tree::with_nodes(2);
        set_parent(&mut tree, 1, Some(0)).unwrap();
        assert_eq!(detach(&mut tree, 1), Some(0));
        assert_eq!(detach(&mut tree, 1), None);
        assert!(tree.node(0).unwrap().children().is_empty());
    }
}
