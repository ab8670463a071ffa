//! Reference outcome classification
//!
//! Every fetch result code falls into exactly one of three partitions.
//! Unchanged and Changed are listed explicitly; Failed is whatever is left,
//! so a result code added later counts as a failure until listed elsewhere.

use std::collections::BTreeMap;

use reconcile_git::{RefUpdate, RefUpdateResult};

/// Up to date or not attempted
pub const UNCHANGED: &[RefUpdateResult] =
    &[RefUpdateResult::NoChange, RefUpdateResult::NotAttempted];

/// Updated, forcefully overwritten, new or renamed
pub const CHANGED: &[RefUpdateResult] = &[
    RefUpdateResult::FastForward,
    RefUpdateResult::Forced,
    RefUpdateResult::New,
    RefUpdateResult::Renamed,
];

/// The partition a result code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Unchanged,
    Changed,
    Failed,
}

impl Partition {
    pub fn of(result: RefUpdateResult) -> Self {
        if UNCHANGED.contains(&result) {
            Partition::Unchanged
        } else if CHANGED.contains(&result) {
            Partition::Changed
        } else {
            Partition::Failed
        }
    }

    /// All result codes in this partition, in declaration order.
    pub fn members(self) -> Vec<RefUpdateResult> {
        RefUpdateResult::ALL
            .into_iter()
            .filter(|r| Partition::of(*r) == self)
            .collect()
    }
}

/// Fetch results grouped by result code.
///
/// Records under one code keep the order the fetch reported them in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatesByResult {
    groups: BTreeMap<RefUpdateResult, Vec<RefUpdate>>,
    /// Every record in fetch order, which follows ref-spec declaration order
    ordered: Vec<RefUpdate>,
}

impl UpdatesByResult {
    /// Group `updates` by result code.
    pub fn classify(updates: &[RefUpdate]) -> Self {
        let mut groups: BTreeMap<RefUpdateResult, Vec<RefUpdate>> = BTreeMap::new();
        for update in updates {
            groups
                .entry(update.result)
                .or_default()
                .push(update.clone());
        }
        Self {
            groups,
            ordered: updates.to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn contains(&self, result: RefUpdateResult) -> bool {
        self.groups.contains_key(&result)
    }

    pub fn get(&self, result: RefUpdateResult) -> &[RefUpdate] {
        self.groups.get(&result).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Records whose code falls in `partition`, in fetch order across codes.
    pub fn in_partition(&self, partition: Partition) -> impl Iterator<Item = &RefUpdate> + '_ {
        self.ordered
            .iter()
            .filter(move |update| Partition::of(update.result) == partition)
    }

    /// Result codes that occurred at least once
    pub fn results(&self) -> impl Iterator<Item = RefUpdateResult> + '_ {
        self.groups.keys().copied()
    }

    /// Number of distinct result codes
    pub fn len(&self) -> usize {
        self.groups.len()
    }
}
