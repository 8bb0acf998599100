use serde::Serialize;

/// Counters for structural changes made to a B-tree.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BTreeStats {
    /// Keys added by `insert`
    pub inserts: u64,
    /// `insert` calls that found the key already present
    pub duplicate_inserts: u64,
    /// Keys removed by `delete`
    pub deletes: u64,
    /// `delete` calls for keys that were not present
    pub absent_deletes: u64,
    /// Leaf splits
    pub leaf_splits: u64,
    /// Internal node splits
    pub internal_splits: u64,
    /// Root splits (each one adds a level)
    pub root_splits: u64,
    /// Keys borrowed from a right sibling
    pub rotations_left: u64,
    /// Keys borrowed from a left sibling
    pub rotations_right: u64,
    /// Sibling merges
    pub merges: u64,
    /// Emptied roots replaced by their only child (each one removes a level)
    pub root_collapses: u64,
}

impl BTreeStats {
    /// Label/value pairs in display order.
    pub fn rows(&self) -> [(&'static str, u64); 11] {
        [
            ("inserts", self.inserts),
            ("duplicate inserts", self.duplicate_inserts),
            ("deletes", self.deletes),
            ("absent deletes", self.absent_deletes),
            ("leaf splits", self.leaf_splits),
            ("internal splits", self.internal_splits),
            ("root splits", self.root_splits),
            ("left rotations", self.rotations_left),
            ("right rotations", self.rotations_right),
            ("merges", self.merges),
            ("root collapses", self.root_collapses),
        ]
    }

    /// Emits current statistics to the tracing infrastructure.
    pub fn emit_tracing(&self) {
        tracing::info!(
            target: "btindex::stats",
            inserts = self.inserts,
            duplicate_inserts = self.duplicate_inserts,
            deletes = self.deletes,
            absent_deletes = self.absent_deletes,
            leaf_splits = self.leaf_splits,
            internal_splits = self.internal_splits,
            root_splits = self.root_splits,
            rotations_left = self.rotations_left,
            rotations_right = self.rotations_right,
            merges = self.merges,
            root_collapses = self.root_collapses,
            "btree stats snapshot"
        );
    }
}
