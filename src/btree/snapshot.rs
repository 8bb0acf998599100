use serde::{Deserialize, Serialize};

use super::{BTree, BTreeError, BTreeResult, Key, MAX_HEIGHT, Node, NodeId};

/// Owned copy of a tree's shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSnapshot {
    pub order: usize,
    pub len: usize,
    pub root: NodeSnapshot,
}

/// Owned copy of one node and everything below it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub keys: Vec<Key>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    pub fn leaf(keys: Vec<Key>) -> Self {
        Self {
            keys,
            children: Vec::new(),
        }
    }

    pub fn internal(keys: Vec<Key>, children: Vec<NodeSnapshot>) -> Self {
        Self { keys, children }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of keys in this subtree
    pub fn key_count(&self) -> usize {
        self.keys.len()
            + self
                .children
                .iter()
                .map(NodeSnapshot::key_count)
                .sum::<usize>()
    }
}

impl BTree {
    /// Copy the tree's shape out of node storage
    pub fn snapshot(&self) -> BTreeResult<TreeSnapshot> {
        Ok(TreeSnapshot {
            order: self.order,
            len: self.entry_count,
            root: self.snapshot_node(self.root)?,
        })
    }

    fn snapshot_node(&self, id: NodeId) -> BTreeResult<NodeSnapshot> {
        let node = self.node(id)?;
        let children = node
            .children
            .iter()
            .map(|&child| self.snapshot_node(child))
            .collect::<BTreeResult<Vec<_>>>()?;

        Ok(NodeSnapshot {
            keys: node.keys.clone(),
            children,
        })
    }

    /// Rebuild a tree from a snapshot
    ///
    /// The result is verified with [`BTree::check`], so a snapshot that
    /// breaks any invariant is rejected.
    pub fn from_snapshot(snapshot: &TreeSnapshot) -> BTreeResult<Self> {
        let mut tree = Self::new(snapshot.order)?;
        let placeholder = tree.root;
        tree.take_node(placeholder)?;

        tree.root = tree.restore_node(&snapshot.root, 1)?;
        tree.entry_count = snapshot.root.key_count();

        if tree.entry_count != snapshot.len {
            return Err(BTreeError::InvalidState(format!(
                "snapshot reports {} keys but holds {}",
                snapshot.len, tree.entry_count
            )));
        }

        tree.check()?;
        Ok(tree)
    }

    fn restore_node(&mut self, snapshot: &NodeSnapshot, depth: usize) -> BTreeResult<NodeId> {
        if depth > MAX_HEIGHT {
            return Err(BTreeError::HeightLimit(MAX_HEIGHT));
        }

        if snapshot.is_leaf() {
            let mut node = Node::leaf(self.order);
            node.keys.extend_from_slice(&snapshot.keys);
            return Ok(self.allocate_node(node));
        }

        if snapshot.children.len() != snapshot.keys.len() + 1 {
            return Err(BTreeError::InvalidState(format!(
                "snapshot node with {} keys has {} children",
                snapshot.keys.len(),
                snapshot.children.len()
            )));
        }

        let children = snapshot
            .children
            .iter()
            .map(|child| self.restore_node(child, depth + 1))
            .collect::<BTreeResult<Vec<_>>>()?;

        let node = Node::internal(self.order, snapshot.keys.clone(), children);
        Ok(self.allocate_node(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_shape() {
        let mut tree = BTree::new(3).unwrap();
        for i in 1..=3 {
            tree.insert(i).unwrap();
        }

        let snapshot = tree.snapshot().unwrap();
        assert_eq!(snapshot.order, 3);
        assert_eq!(snapshot.len, 3);
        assert_eq!(
            snapshot.root,
            NodeSnapshot::internal(
                vec![2],
                vec![NodeSnapshot::leaf(vec![1]), NodeSnapshot::leaf(vec![3])]
            )
        );
    }

    #[test]
    fn test_snapshot_json() {
        let mut tree = BTree::new(3).unwrap();
        for i in 1..=3 {
            tree.insert(i).unwrap();
        }

        let json = serde_json::to_string(&tree.snapshot().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"order":3,"len":3,"root":{"keys":[2],"children":[{"keys":[1]},{"keys":[3]}]}}"#
        );

        let parsed: TreeSnapshot = serde_json::from_str(&json).unwrap();
        let rebuilt = BTree::from_snapshot(&parsed).unwrap();
        assert_eq!(rebuilt.keys().unwrap(), vec![1, 2, 3]);
        assert_eq!(rebuilt.height(), 2);
    }

    #[test]
    fn test_from_snapshot_rejects_bad_child_count() {
        let snapshot = TreeSnapshot {
            order: 3,
            len: 2,
            root: NodeSnapshot::internal(vec![1, 2], vec![NodeSnapshot::leaf(vec![0])]),
        };
        assert!(BTree::from_snapshot(&snapshot).is_err());
    }

    #[test]
    fn test_from_snapshot_rejects_wrong_len() {
        let snapshot = TreeSnapshot {
            order: 3,
            len: 5,
            root: NodeSnapshot::leaf(vec![1, 2]),
        };
        assert!(BTree::from_snapshot(&snapshot).is_err());
    }

    #[test]
    fn test_from_snapshot_rejects_invalid_order() {
        let snapshot = TreeSnapshot {
            order: 1,
            len: 0,
            root: NodeSnapshot::leaf(vec![]),
        };
        assert_eq!(
            BTree::from_snapshot(&snapshot).unwrap_err(),
            BTreeError::InvalidOrder(1)
        );
    }

    #[test]
    fn test_from_snapshot_rejects_too_deep() {
        let mut root = NodeSnapshot::leaf(vec![]);
        for _ in 0..MAX_HEIGHT {
            root = NodeSnapshot::internal(vec![], vec![root]);
        }
        let snapshot = TreeSnapshot {
            order: 2,
            len: 0,
            root,
        };
        assert_eq!(
            BTree::from_snapshot(&snapshot).unwrap_err(),
            BTreeError::HeightLimit(MAX_HEIGHT)
        );
    }
}
