use super::Key;

/// Node identifier (index into node storage)
pub type NodeId = usize;

/// B-tree node
///
/// - `keys` is strictly increasing
/// - an internal node with `k` keys has exactly `k + 1` children
/// - children[i] holds keys between keys[i-1] and keys[i]
///
/// Storage is allocated for `order` keys and `order + 1` children, one
/// slot more than a settled node may hold. An insert fills the spare slot
/// and the caller splits the node as soon as it does.
#[derive(Debug, Clone)]
pub struct Node {
    /// Whether this node is a leaf
    pub is_leaf: bool,
    /// Keys (sorted)
    pub keys: Vec<Key>,
    /// Child node IDs (empty for leaves)
    pub children: Vec<NodeId>,
}

impl Node {
    /// Create a new empty leaf node
    pub fn leaf(order: usize) -> Self {
        Self {
            is_leaf: true,
            keys: Vec::with_capacity(order),
            children: Vec::new(),
        }
    }

    /// Create a new internal node with given keys and children
    pub fn internal(order: usize, keys: Vec<Key>, children: Vec<NodeId>) -> Self {
        debug_assert_eq!(keys.len() + 1, children.len());
        let mut node = Self {
            is_leaf: false,
            keys: Vec::with_capacity(order),
            children: Vec::with_capacity(order + 1),
        };
        node.keys.extend(keys);
        node.children.extend(children);
        node
    }

    fn with_flag(order: usize, is_leaf: bool) -> Self {
        if is_leaf {
            Self::leaf(order)
        } else {
            Self {
                is_leaf: false,
                keys: Vec::with_capacity(order),
                children: Vec::with_capacity(order + 1),
            }
        }
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if node holds no keys
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Locate a key within this node
    ///
    /// Scans for the first key >= `key`. Returns `Ok(i)` if keys[i] is an
    /// exact match, otherwise `Err(i)`: the insertion position, which is
    /// also the index of the child to descend into.
    pub fn find_slot(&self, key: Key) -> Result<usize, usize> {
        let idx = self
            .keys
            .iter()
            .position(|&k| k >= key)
            .unwrap_or(self.keys.len());

        match self.keys.get(idx) {
            Some(&k) if k == key => Ok(idx),
            _ => Err(idx),
        }
    }

    /// Replace the child at `idx` with the two halves of its split
    pub fn absorb_split(&mut self, idx: usize, left: NodeId, separator: Key, right: NodeId) {
        self.keys.insert(idx, separator);
        self.children[idx] = left;
        self.children.insert(idx + 1, right);
    }

    /// Check whether the spare slot is in use
    pub fn is_overflowing(&self, order: usize) -> bool {
        self.keys.len() >= order
    }

    /// Split this node around its middle key
    ///
    /// With `mid = len / 2`, the left node takes keys `[0, mid)` and children
    /// `[0, mid]`, the right node takes keys `(mid, len)` and children
    /// `(mid, len]`, and keys[mid] is returned as the separator.
    pub fn split(mut self, order: usize) -> (Node, Key, Node) {
        let mid = self.keys.len() / 2;

        let mut left = Node::with_flag(order, self.is_leaf);
        let mut right = Node::with_flag(order, self.is_leaf);

        let upper_keys = self.keys.split_off(mid + 1);
        let separator = self.keys[mid];
        self.keys.truncate(mid);
        left.keys.extend(self.keys);
        right.keys.extend(upper_keys);

        if !self.is_leaf {
            let upper_children = self.children.split_off(mid + 1);
            left.children.extend(self.children);
            right.children.extend(upper_children);
        }

        (left, separator, right)
    }

    /// Remove and return the first key and (for internal nodes) first child
    pub fn pop_front(&mut self) -> Option<(Key, Option<NodeId>)> {
        if self.keys.is_empty() {
            return None;
        }
        let key = self.keys.remove(0);
        let child = if self.is_leaf {
            None
        } else {
            Some(self.children.remove(0))
        };
        Some((key, child))
    }

    /// Remove and return the last key and (for internal nodes) last child
    pub fn pop_back(&mut self) -> Option<(Key, Option<NodeId>)> {
        let key = self.keys.pop()?;
        let child = if self.is_leaf {
            None
        } else {
            self.children.pop()
        };
        Some((key, child))
    }

    /// Append a separator key and the right-hand child it brings along
    pub fn push_back(&mut self, key: Key, child: Option<NodeId>) {
        self.keys.push(key);
        if let Some(child) = child {
            self.children.push(child);
        }
    }

    /// Prepend a separator key and the left-hand child it brings along
    pub fn push_front(&mut self, key: Key, child: Option<NodeId>) {
        self.keys.insert(0, key);
        if let Some(child) = child {
            self.children.insert(0, child);
        }
    }

    /// Fold a right sibling and the separator between them into this node
    pub fn merge_from(&mut self, separator: Key, right: Node) {
        self.keys.push(separator);
        self.keys.extend(right.keys);
        self.children.extend(right.children);
    }

    /// Get the minimum key in this node
    pub fn min_key(&self) -> Option<Key> {
        self.keys.first().copied()
    }

    /// Get the maximum key in this node
    pub fn max_key(&self) -> Option<Key> {
        self.keys.last().copied()
    }
}
