use std::fmt;

use super::{BTree, BTreeResult, Key, Node, NodeId};

/// Label printed in front of a node in a level traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    /// The root has no parent
    Root,
    /// Parent key bounding this child
    Separator(Key),
    /// Parent holds no keys (order 2 only)
    Unbounded,
}

impl Label {
    /// Label for children[idx] of `parent`
    ///
    /// A child is labelled with the parent key at the same index; the last
    /// child has no such key and reuses the parent's last key.
    fn for_child(parent: &Node, idx: usize) -> Self {
        parent
            .keys
            .get(idx)
            .or(parent.keys.last())
            .map_or(Label::Unbounded, |&key| Label::Separator(key))
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Root => write!(f, "root"),
            Label::Separator(key) => write!(f, "{}", key),
            Label::Unbounded => write!(f, "-"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelNode {
    pub label: Label,
    pub keys: Vec<Key>,
}

impl fmt::Display for LevelNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}|{}]", self.label, self.keys.len())?;
        for key in &self.keys {
            write!(f, " {}", key)?;
        }
        Ok(())
    }
}

/// Breadth-first rendering of a tree, one entry per level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelTraversal {
    pub levels: Vec<Vec<LevelNode>>,
}

impl fmt::Display for LevelTraversal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for level in &self.levels {
            let line = level
                .iter()
                .map(LevelNode::to_string)
                .collect::<Vec<_>>()
                .join("   ");
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

impl BTree {
    /// Walk the tree level by level
    pub fn traversal_level(&self) -> BTreeResult<LevelTraversal> {
        let mut levels = Vec::new();
        let mut queue: Vec<(Label, NodeId)> = vec![(Label::Root, self.root)];

        while !queue.is_empty() {
            let mut level = Vec::with_capacity(queue.len());
            let mut next = Vec::new();

            for (label, id) in queue {
                let node = self.node(id)?;
                next.extend(
                    node.children
                        .iter()
                        .enumerate()
                        .map(|(i, &child)| (Label::for_child(node, i), child)),
                );
                level.push(LevelNode {
                    label,
                    keys: node.keys.clone(),
                });
            }

            levels.push(level);
            queue = next;
        }

        Ok(LevelTraversal { levels })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tree_traversal() {
        let tree = BTree::new(3).unwrap();
        let traversal = tree.traversal_level().unwrap();

        assert_eq!(traversal.levels.len(), 1);
        assert_eq!(traversal.to_string(), "[root|0]\n");
    }

    #[test]
    fn test_traversal_labels_last_child_with_last_key() {
        let mut tree = BTree::new(3).unwrap();
        for i in 1..=6 {
            tree.insert(i).unwrap();
        }

        let traversal = tree.traversal_level().unwrap();
        assert_eq!(
            traversal.to_string(),
            "[root|2] 2 4\n[2|1] 1   [4|1] 3   [4|2] 5 6\n"
        );
        assert_eq!(traversal.levels[1][2].label, Label::Separator(4));
    }

    #[test]
    fn test_traversal_keyless_parent() {
        let mut tree = BTree::new(2).unwrap();
        tree.insert(1).unwrap();
        tree.insert(2).unwrap();
        tree.delete(1).unwrap();
        tree.insert(3).unwrap();
        tree.insert(4).unwrap();

        let traversal = tree.traversal_level().unwrap();
        assert_eq!(
            traversal.to_string(),
            "[root|1] 4\n[4|1] 2   [4|0]\n[2|0]   [2|1] 3   [-|0]\n"
        );
        assert_eq!(traversal.levels[2][2].label, Label::Unbounded);
    }
}
