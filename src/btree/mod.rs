//! B-tree implementation for in-memory ordered indexing
//!
//! This module provides a classic B-tree of configurable order `m`:
//! - Every node holds at most `m - 1` keys and every internal node with
//!   `k` keys has `k + 1` children
//! - Non-root nodes hold at least `ceil(m/2) - 1` keys
//! - All leaves sit at the same depth
//!
//! Insertion splits overflowing nodes on the way back up and grows the tree
//! at the root. Deletion borrows from a sibling (rotation) or merges with
//! one, cascading towards the root, and shrinks the tree when the root
//! runs out of keys.
//!
//! The tree is single-threaded; callers that share it must provide their
//! own locking.

mod check;
mod error;
mod node;
mod snapshot;
mod stats;
mod traversal;

pub use error::{BTreeError, BTreeResult};
pub use node::{Node, NodeId};
pub use snapshot::{NodeSnapshot, TreeSnapshot};
pub use stats::BTreeStats;
pub use traversal::{Label, LevelNode, LevelTraversal};

/// Key type for the B-tree
pub type Key = i64;

/// Order used when none is given (the smallest order whose nodes must stay
/// non-empty)
pub const DEFAULT_ORDER: usize = 3;

/// Most levels a tree may grow to
///
/// Unreachable for `m >= 3` (it would take over `2^63` keys). At `m = 2` a
/// split leaves an empty right half, so descending inserts add one level per
/// key; the cap bounds recursion depth and node count there.
pub const MAX_HEIGHT: usize = 64;

/// Position of a key inside the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator {
    /// Node holding the key
    pub node: NodeId,
    /// Index of the key within that node
    pub index: usize,
}

/// Result of inserting into a subtree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertOutcome {
    /// Key was already present; nothing changed
    Duplicate,
    /// Key was added and the subtree root kept its shape
    Inserted,
    /// Subtree root overflowed and was replaced by two nodes
    Split {
        left: NodeId,
        separator: Key,
        right: NodeId,
    },
}

/// B-tree data structure
///
/// Order `m` means:
/// - Nodes have at most `m` children and `m - 1` keys
/// - Non-root nodes have at least `ceil(m/2) - 1` keys
/// - The root may hold anywhere from `0` to `m - 1` keys
#[derive(Debug)]
pub struct BTree {
    /// Root node ID (an empty tree is a single empty leaf)
    root: NodeId,

    /// Tree order (max children per node)
    order: usize,

    /// Node storage
    nodes: Vec<Option<Node>>,

    /// Free list for recycling deleted nodes
    free_list: Vec<NodeId>,

    /// Total number of keys in the tree
    entry_count: usize,

    /// Structural change counters
    stats: BTreeStats,
}

impl BTree {
    /// Create a new empty B-tree with the given order
    ///
    /// # Arguments
    /// * `order` - The tree order (must be >= 2)
    ///
    /// # Returns
    /// * `Ok(BTree)` - A new tree whose root is an empty leaf
    /// * `Err(BTreeError::InvalidOrder)` - If order is below 2
    pub fn new(order: usize) -> BTreeResult<Self> {
        if order < 2 {
            return Err(BTreeError::InvalidOrder(order));
        }

        let mut tree = Self {
            root: 0,
            order,
            nodes: Vec::new(),
            free_list: Vec::new(),
            entry_count: 0,
            stats: BTreeStats::default(),
        };
        tree.root = tree.allocate_node(Node::leaf(order));
        Ok(tree)
    }

    /// Get the tree order
    pub fn order(&self) -> usize {
        self.order
    }

    /// Check if tree holds no keys
    pub fn is_empty(&self) -> bool {
        self.entry_count == 0
    }

    /// Get number of keys in the tree
    pub fn len(&self) -> usize {
        self.entry_count
    }

    /// Get tree height (1 for a lone leaf root)
    pub fn height(&self) -> usize {
        let mut height = 1;
        let mut current = self.root;

        while let Some(node) = self.get_node(current) {
            match node.children.first() {
                Some(&child) if !node.is_leaf => {
                    current = child;
                    height += 1;
                }
                _ => break,
            }
        }

        height
    }

    /// Maximum keys in any node
    pub fn max_keys(&self) -> usize {
        self.order - 1
    }

    /// Minimum keys in a non-root node
    ///
    /// This is `ceil(m/2) - 1`, the size of the right half of a split. A
    /// child holding fewer keys after a delete is rebalanced.
    pub fn min_keys(&self) -> usize {
        self.order.div_ceil(2) - 1
    }

    /// Structural change counters accumulated since creation
    pub fn stats(&self) -> &BTreeStats {
        &self.stats
    }

    // ========== Node Management ==========

    /// Allocate a new node, returning its ID
    fn allocate_node(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free_list.pop() {
            self.nodes[id] = Some(node);
            id
        } else {
            let id = self.nodes.len();
            self.nodes.push(Some(node));
            id
        }
    }

    /// Get a reference to a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id).and_then(|n| n.as_ref())
    }

    /// Get the root node ID
    pub fn root_node_id(&self) -> NodeId {
        self.root
    }

    /// Get the number of live nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    fn node(&self, id: NodeId) -> BTreeResult<&Node> {
        self.get_node(id).ok_or(BTreeError::NodeNotFound(id))
    }

    fn node_mut(&mut self, id: NodeId) -> BTreeResult<&mut Node> {
        self.nodes
            .get_mut(id)
            .and_then(|n| n.as_mut())
            .ok_or(BTreeError::NodeNotFound(id))
    }

    fn child_at(&self, id: NodeId, idx: usize) -> BTreeResult<NodeId> {
        self.node(id)?.children.get(idx).copied().ok_or_else(|| {
            BTreeError::InvalidState(format!("node {} has no child at {}", id, idx))
        })
    }

    /// Move a node out of storage, freeing its slot
    fn take_node(&mut self, id: NodeId) -> BTreeResult<Node> {
        let node = self
            .nodes
            .get_mut(id)
            .and_then(|n| n.take())
            .ok_or(BTreeError::NodeNotFound(id))?;
        self.free_list.push(id);
        Ok(node)
    }

    /// Free a node and everything below it
    fn free_subtree(&mut self, id: NodeId) -> BTreeResult<()> {
        let node = self.take_node(id)?;
        for child in node.children {
            self.free_subtree(child)?;
        }
        Ok(())
    }

    // ========== Search Operations ==========

    /// Search for a key, returning the node and in-node index holding it
    ///
    /// A corrupt tree is logged and reported as a miss; use
    /// [`BTree::try_search`] to tell the two apart.
    pub fn search(&self, key: Key) -> Option<Locator> {
        match self.try_search(key) {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(
                    target: "btindex::btree",
                    key,
                    error = %e,
                    "search hit a corrupt tree"
                );
                None
            }
        }
    }

    /// Search for a key, surfacing a broken child link as an error
    pub fn try_search(&self, key: Key) -> BTreeResult<Option<Locator>> {
        let mut current = self.root;

        loop {
            let node = self.node(current)?;
            match node.find_slot(key) {
                Ok(index) => {
                    return Ok(Some(Locator {
                        node: current,
                        index,
                    }));
                }
                Err(_) if node.is_leaf => return Ok(None),
                Err(idx) => current = self.child_at(current, idx)?,
            }
        }
    }

    /// Check whether a key is present
    pub fn contains(&self, key: Key) -> bool {
        self.search(key).is_some()
    }

    /// Read the key a locator points at
    pub fn key_at(&self, locator: Locator) -> Option<Key> {
        self.get_node(locator.node)?
            .keys
            .get(locator.index)
            .copied()
    }

    /// All keys in ascending order
    pub fn keys(&self) -> BTreeResult<Vec<Key>> {
        let mut keys = Vec::with_capacity(self.entry_count);
        self.collect_keys(self.root, &mut keys)?;
        Ok(keys)
    }

    fn collect_keys(&self, id: NodeId, out: &mut Vec<Key>) -> BTreeResult<()> {
        let node = self.node(id)?;
        if node.is_leaf {
            out.extend_from_slice(&node.keys);
            return Ok(());
        }

        for (i, &child) in node.children.iter().enumerate() {
            self.collect_keys(child, out)?;
            if let Some(&key) = node.keys.get(i) {
                out.push(key);
            }
        }
        Ok(())
    }

    /// Largest key stored under `id`
    fn subtree_max(&self, id: NodeId) -> BTreeResult<Option<Key>> {
        let node = self.node(id)?;
        if node.is_leaf {
            return Ok(node.max_key());
        }
        let last = self.child_at(id, node.children.len().saturating_sub(1))?;
        Ok(self.subtree_max(last)?.or(node.max_key()))
    }

    /// Smallest key stored under `id`
    fn subtree_min(&self, id: NodeId) -> BTreeResult<Option<Key>> {
        let node = self.node(id)?;
        if node.is_leaf {
            return Ok(node.min_key());
        }
        let first = self.child_at(id, 0)?;
        Ok(self.subtree_min(first)?.or(node.min_key()))
    }

    // ========== Insert Operations ==========

    /// Insert a key into the tree
    ///
    /// Returns `Ok(false)` without touching the tree if the key is
    /// already present.
    ///
    /// Fails with [`BTreeError::HeightLimit`], leaving the tree untouched,
    /// if the insert would grow the tree past [`MAX_HEIGHT`] levels.
    pub fn insert(&mut self, key: Key) -> BTreeResult<bool> {
        let height = self.height();
        if height >= MAX_HEIGHT && self.splits_root(key)? {
            return Err(BTreeError::HeightLimit(height));
        }

        match self.insert_into(self.root, key)? {
            InsertOutcome::Duplicate => {
                self.stats.duplicate_inserts += 1;
                return Ok(false);
            }
            InsertOutcome::Inserted => {}
            InsertOutcome::Split {
                left,
                separator,
                right,
            } => {
                let root = Node::internal(self.order, vec![separator], vec![left, right]);
                self.root = self.allocate_node(root);
                self.stats.root_splits += 1;
                tracing::trace!(
                    target: "btindex::btree",
                    root = self.root,
                    separator,
                    height = self.height(),
                    "root split, tree grew one level"
                );
            }
        }

        self.entry_count += 1;
        self.stats.inserts += 1;
        Ok(true)
    }

    /// Whether inserting `key` would split the root
    ///
    /// That happens exactly when the key is new and every node on its
    /// search path is full.
    fn splits_root(&self, key: Key) -> BTreeResult<bool> {
        let max = self.max_keys();
        let mut current = self.root;

        loop {
            let node = self.node(current)?;
            if node.len() < max {
                return Ok(false);
            }
            match node.find_slot(key) {
                Ok(_) => return Ok(false),
                Err(_) if node.is_leaf => return Ok(true),
                Err(idx) => current = self.child_at(current, idx)?,
            }
        }
    }

    fn insert_into(&mut self, id: NodeId, key: Key) -> BTreeResult<InsertOutcome> {
        let (slot, is_leaf) = {
            let node = self.node(id)?;
            (node.find_slot(key), node.is_leaf)
        };

        let idx = match slot {
            Ok(_) => return Ok(InsertOutcome::Duplicate),
            Err(idx) => idx,
        };

        if is_leaf {
            self.node_mut(id)?.keys.insert(idx, key);
        } else {
            let child = self.child_at(id, idx)?;
            match self.insert_into(child, key)? {
                InsertOutcome::Split {
                    left,
                    separator,
                    right,
                } => self.node_mut(id)?.absorb_split(idx, left, separator, right),
                outcome => return Ok(outcome),
            }
        }

        if self.node(id)?.is_overflowing(self.order) {
            self.split_node(id)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    /// Replace an overflowing node with two fresh halves
    fn split_node(&mut self, id: NodeId) -> BTreeResult<InsertOutcome> {
        let node = self.take_node(id)?;
        let is_leaf = node.is_leaf;
        let (left, separator, right) = node.split(self.order);

        let left = self.allocate_node(left);
        let right = self.allocate_node(right);

        if is_leaf {
            self.stats.leaf_splits += 1;
        } else {
            self.stats.internal_splits += 1;
        }
        tracing::trace!(
            target: "btindex::btree",
            retired = id,
            left,
            right,
            separator,
            leaf = is_leaf,
            "split node"
        );

        Ok(InsertOutcome::Split {
            left,
            separator,
            right,
        })
    }

    // ========== Delete Operations ==========

    /// Delete a key from the tree
    ///
    /// Returns `Ok(false)` if the key was not present.
    pub fn delete(&mut self, key: Key) -> BTreeResult<bool> {
        let removed = self.delete_from(self.root, key)?;

        if removed {
            self.entry_count -= 1;
            self.stats.deletes += 1;
        } else {
            self.stats.absent_deletes += 1;
        }

        self.collapse_root()?;
        Ok(removed)
    }

    /// Replace a keyless internal root with its only child
    fn collapse_root(&mut self) -> BTreeResult<()> {
        loop {
            let root = self.node(self.root)?;
            if root.is_leaf || !root.is_empty() {
                return Ok(());
            }

            let child = self.child_at(self.root, 0)?;
            let retired = self.root;
            self.take_node(retired)?;
            self.root = child;
            self.stats.root_collapses += 1;
            tracing::trace!(
                target: "btindex::btree",
                retired,
                root = child,
                "root collapsed, tree shrank one level"
            );
        }
    }

    fn delete_from(&mut self, id: NodeId, key: Key) -> BTreeResult<bool> {
        let (slot, is_leaf) = {
            let node = self.node(id)?;
            (node.find_slot(key), node.is_leaf)
        };

        match slot {
            Ok(idx) if is_leaf => {
                self.node_mut(id)?.keys.remove(idx);
                Ok(true)
            }
            Ok(idx) => {
                self.remove_internal_key(id, idx)?;
                Ok(true)
            }
            Err(_) if is_leaf => Ok(false),
            Err(idx) => {
                let child = self.child_at(id, idx)?;
                let removed = self.delete_from(child, key)?;
                if removed {
                    self.rebalance_child(id, idx)?;
                }
                Ok(removed)
            }
        }
    }

    /// Remove keys[idx] from an internal node
    ///
    /// The slot is refilled with the predecessor (or, if the left subtree
    /// is keyless, the successor), which is then deleted from its subtree.
    fn remove_internal_key(&mut self, id: NodeId, idx: usize) -> BTreeResult<()> {
        let left = self.child_at(id, idx)?;
        let right = self.child_at(id, idx + 1)?;

        if let Some(predecessor) = self.subtree_max(left)? {
            self.node_mut(id)?.keys[idx] = predecessor;
            self.delete_present(left, predecessor)?;
            return self.rebalance_child(id, idx);
        }

        if let Some(successor) = self.subtree_min(right)? {
            self.node_mut(id)?.keys[idx] = successor;
            self.delete_present(right, successor)?;
            return self.rebalance_child(id, idx + 1);
        }

        // Both sides keyless: only possible when the minimum occupancy is zero.
        let node = self.node_mut(id)?;
        node.keys.remove(idx);
        node.children.remove(idx + 1);
        self.free_subtree(right)
    }

    fn delete_present(&mut self, id: NodeId, key: Key) -> BTreeResult<()> {
        if self.delete_from(id, key)? {
            Ok(())
        } else {
            Err(BTreeError::InvalidState(format!(
                "key {} missing from subtree {}",
                key, id
            )))
        }
    }

    /// Restore minimum occupancy of children[idx] after a delete below it
    fn rebalance_child(&mut self, parent_id: NodeId, idx: usize) -> BTreeResult<()> {
        let min = self.min_keys();
        let child = self.child_at(parent_id, idx)?;
        if self.node(child)?.len() >= min {
            return Ok(());
        }

        let (left, right) = {
            let parent = self.node(parent_id)?;
            let left = idx
                .checked_sub(1)
                .and_then(|i| parent.children.get(i).copied());
            (left, parent.children.get(idx + 1).copied())
        };

        if let Some(right) = right {
            if self.node(right)?.len() > min {
                return self.rotate_left(parent_id, idx);
            }
        }

        if let Some(left) = left {
            if self.node(left)?.len() > min {
                return self.rotate_right(parent_id, idx);
            }
        }

        match (left, right) {
            (_, Some(_)) => self.merge_children(parent_id, idx),
            (Some(_), None) => self.merge_children(parent_id, idx - 1),
            (None, None) => Err(BTreeError::InvalidState(format!(
                "deficient node {} has no siblings",
                child
            ))),
        }
    }

    /// Borrow through the parent from the right sibling of children[idx]
    fn rotate_left(&mut self, parent_id: NodeId, idx: usize) -> BTreeResult<()> {
        let deficient = self.child_at(parent_id, idx)?;
        let sibling = self.child_at(parent_id, idx + 1)?;

        let (key, child) = self.node_mut(sibling)?.pop_front().ok_or_else(|| {
            BTreeError::InvalidState(format!("sibling {} has nothing to lend", sibling))
        })?;
        let separator = std::mem::replace(&mut self.node_mut(parent_id)?.keys[idx], key);
        self.node_mut(deficient)?.push_back(separator, child);

        self.stats.rotations_left += 1;
        tracing::trace!(
            target: "btindex::btree",
            node = deficient,
            sibling,
            separator,
            promoted = key,
            "rotated left"
        );
        Ok(())
    }

    /// Borrow through the parent from the left sibling of children[idx]
    fn rotate_right(&mut self, parent_id: NodeId, idx: usize) -> BTreeResult<()> {
        let deficient = self.child_at(parent_id, idx)?;
        let sibling = self.child_at(parent_id, idx - 1)?;

        let (key, child) = self.node_mut(sibling)?.pop_back().ok_or_else(|| {
            BTreeError::InvalidState(format!("sibling {} has nothing to lend", sibling))
        })?;
        let separator = std::mem::replace(&mut self.node_mut(parent_id)?.keys[idx - 1], key);
        self.node_mut(deficient)?.push_front(separator, child);

        self.stats.rotations_right += 1;
        tracing::trace!(
            target: "btindex::btree",
            node = deficient,
            sibling,
            separator,
            promoted = key,
            "rotated right"
        );
        Ok(())
    }

    /// Fold children[idx + 1] and the separator between them into children[idx]
    fn merge_children(&mut self, parent_id: NodeId, idx: usize) -> BTreeResult<()> {
        let left = self.child_at(parent_id, idx)?;
        let right = self.child_at(parent_id, idx + 1)?;

        let separator = {
            let parent = self.node_mut(parent_id)?;
            parent.children.remove(idx + 1);
            parent.keys.remove(idx)
        };

        let right_node = self.take_node(right)?;
        self.node_mut(left)?.merge_from(separator, right_node);

        self.stats.merges += 1;
        tracing::trace!(
            target: "btindex::btree",
            survivor = left,
            removed = right,
            separator,
            "merged siblings"
        );
        Ok(())
    }
}
