//! Value-set reconciliation.
//!
//! Compares the rows a product currently owns against the complete desired
//! value list and produces the keep/insert/delete sets the store applies
//! inside the caller's transaction. Matching is by value, never by row id:
//! a desired value that already exists keeps its row untouched (identity
//! preserved), everything else is inserted, and existing rows whose value
//! was not requested are deleted. The same algorithm serves sizes and
//! colors; only the id type differs.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// One desired value resolved against the existing rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<Id> {
    /// Value already present; the row with this id is left untouched.
    Keep(Id),
    /// Value absent; a new row must be inserted.
    Insert(String),
}

/// Outcome of diffing a desired value list against existing rows.
///
/// `delete` is applied before `insert`, both inside the transaction that
/// carries the caller's scalar update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan<Id> {
    /// Existing row ids whose value was requested again.
    pub keep: Vec<Id>,
    /// Existing row ids whose value was not requested.
    pub delete: Vec<Id>,
    /// Desired values with no existing row.
    pub insert: Vec<String>,
}

impl<Id: Copy + Eq + Hash> ReconcilePlan<Id> {
    /// Diff `desired` against `existing` in a single pass.
    ///
    /// Each desired value is resolved exactly once via a value-to-row map;
    /// deletions fall out as the existing ids no resolution kept. Desired
    /// duplicates that match an existing row collapse into one keep;
    /// duplicates with no match plan one insert each and are left to the
    /// store's unique constraint.
    pub fn between<'a, E>(existing: E, desired: &[String]) -> Self
    where
        E: IntoIterator<Item = (Id, &'a str)>,
    {
        let rows: Vec<(Id, &'a str)> = existing.into_iter().collect();
        let by_value: HashMap<&'a str, Id> = rows.iter().map(|&(id, value)| (value, id)).collect();

        let resolutions = desired.iter().map(|value| match by_value.get(value.as_str()) {
            Some(&id) => Resolution::Keep(id),
            None => Resolution::Insert(value.clone()),
        });

        let mut kept = HashSet::new();
        let mut keep = Vec::new();
        let mut insert = Vec::new();
        for resolution in resolutions {
            match resolution {
                Resolution::Keep(id) => {
                    if kept.insert(id) {
                        keep.push(id);
                    }
                }
                Resolution::Insert(value) => insert.push(value),
            }
        }

        let delete = rows
            .iter()
            .filter(|(id, _)| !kept.contains(id))
            .map(|&(id, _)| id)
            .collect();

        Self { keep, delete, insert }
    }

    /// True when the desired set is value-equal to the existing set: nothing
    /// to write, every row identity survives.
    pub fn is_noop(&self) -> bool {
        self.delete.is_empty() && self.insert.is_empty()
    }
}
