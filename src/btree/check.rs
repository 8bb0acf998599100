use ahash::AHashSet;

use super::{BTree, BTreeError, BTreeResult, Key, NodeId};

/// State carried through a verification walk
struct Walk {
    visited: AHashSet<NodeId>,
    leaf_depth: Option<usize>,
    key_count: usize,
}

fn violation(message: String) -> BTreeError {
    BTreeError::InvalidState(message)
}

impl BTree {
    /// Verify every structural invariant of the tree
    ///
    /// Checks key order and bounds, child counts, per-node occupancy,
    /// uniform leaf depth, single ownership of every node and the key
    /// count. The first violation found is returned as
    /// `BTreeError::InvalidState`.
    pub fn check(&self) -> BTreeResult<()> {
        let mut walk = Walk {
            visited: AHashSet::with_capacity(self.node_count()),
            leaf_depth: None,
            key_count: 0,
        };

        self.check_node(self.root, None, None, 0, &mut walk)?;

        if walk.visited.len() != self.node_count() {
            return Err(violation(format!(
                "{} live nodes but only {} reachable from the root",
                self.node_count(),
                walk.visited.len()
            )));
        }

        if walk.key_count != self.entry_count {
            return Err(violation(format!(
                "tree reports {} keys but holds {}",
                self.entry_count, walk.key_count
            )));
        }

        Ok(())
    }

    fn check_node(
        &self,
        id: NodeId,
        lower: Option<Key>,
        upper: Option<Key>,
        depth: usize,
        walk: &mut Walk,
    ) -> BTreeResult<()> {
        if !walk.visited.insert(id) {
            return Err(violation(format!(
                "node {} is referenced more than once",
                id
            )));
        }

        let node = self.node(id)?;
        let is_root = id == self.root;

        if node.keys.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(violation(format!(
                "node {} keys out of order: {:?}",
                id, node.keys
            )));
        }

        if let (Some(lower), Some(first)) = (lower, node.min_key()) {
            if first <= lower {
                return Err(violation(format!(
                    "node {} key {} not above separator {}",
                    id, first, lower
                )));
            }
        }

        if let (Some(upper), Some(last)) = (upper, node.max_key()) {
            if last >= upper {
                return Err(violation(format!(
                    "node {} key {} not below separator {}",
                    id, last, upper
                )));
            }
        }

        if node.len() > self.max_keys() {
            return Err(violation(format!(
                "node {} holds {} keys, maximum is {}",
                id,
                node.len(),
                self.max_keys()
            )));
        }

        if !is_root && node.len() < self.min_keys() {
            return Err(violation(format!(
                "node {} holds {} keys, minimum is {}",
                id,
                node.len(),
                self.min_keys()
            )));
        }

        walk.key_count += node.len();

        if node.is_leaf {
            if !node.children.is_empty() {
                return Err(violation(format!("leaf {} has children", id)));
            }

            match walk.leaf_depth {
                None => walk.leaf_depth = Some(depth),
                Some(expected) if expected != depth => {
                    return Err(violation(format!(
                        "leaf {} at depth {}, other leaves at depth {}",
                        id, depth, expected
                    )));
                }
                Some(_) => {}
            }
            return Ok(());
        }

        if node.children.len() != node.len() + 1 {
            return Err(violation(format!(
                "internal node {} has {} keys but {} children",
                id,
                node.len(),
                node.children.len()
            )));
        }

        for (i, &child) in node.children.iter().enumerate() {
            let child_lower = if i == 0 { lower } else { Some(node.keys[i - 1]) };
            let child_upper = node.keys.get(i).copied().or(upper);
            self.check_node(child, child_lower, child_upper, depth + 1, walk)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btree::{NodeSnapshot, TreeSnapshot};

    fn snapshot(order: usize, root: NodeSnapshot) -> TreeSnapshot {
        let len = root.key_count();
        TreeSnapshot { order, len, root }
    }

    #[test]
    fn test_check_accepts_valid_tree() {
        let mut tree = BTree::new(4).unwrap();
        for i in 0..50 {
            tree.insert(i).unwrap();
        }
        assert!(tree.check().is_ok());
    }

    #[test]
    fn test_check_rejects_unsorted_keys() {
        let root = NodeSnapshot::leaf(vec![3, 1]);
        let err = BTree::from_snapshot(&snapshot(4, root)).unwrap_err();
        assert!(matches!(err, BTreeError::InvalidState(_)));
    }

    #[test]
    fn test_check_rejects_out_of_bounds_child() {
        let root = NodeSnapshot::internal(
            vec![10],
            vec![NodeSnapshot::leaf(vec![5]), NodeSnapshot::leaf(vec![8])],
        );
        assert!(BTree::from_snapshot(&snapshot(3, root)).is_err());
    }

    #[test]
    fn test_check_rejects_underfull_node() {
        let root = NodeSnapshot::internal(
            vec![10],
            vec![NodeSnapshot::leaf(vec![]), NodeSnapshot::leaf(vec![20])],
        );
        assert!(BTree::from_snapshot(&snapshot(3, root)).is_err());
    }

    #[test]
    fn test_check_rejects_overfull_node() {
        let root = NodeSnapshot::leaf(vec![1, 2, 3]);
        assert!(BTree::from_snapshot(&snapshot(3, root)).is_err());
    }

    #[test]
    fn test_check_rejects_uneven_leaves() {
        let root = NodeSnapshot::internal(
            vec![10],
            vec![
                NodeSnapshot::leaf(vec![5]),
                NodeSnapshot::internal(
                    vec![20],
                    vec![NodeSnapshot::leaf(vec![15]), NodeSnapshot::leaf(vec![25])],
                ),
            ],
        );
        assert!(BTree::from_snapshot(&snapshot(3, root)).is_err());
    }

    #[test]
    fn test_check_allows_empty_leaves_at_order_two() {
        let root = NodeSnapshot::internal(
            vec![2],
            vec![NodeSnapshot::leaf(vec![1]), NodeSnapshot::leaf(vec![])],
        );
        assert!(BTree::from_snapshot(&snapshot(2, root)).is_ok());
    }
}
