//! Per-person reduction of candidate rows
//!
//! Queries return every qualifying row; these functions keep exactly one per
//! person. Ordering is total over the keys below, so the result does not
//! depend on the order the warehouse returned rows in (as long as row keys
//! are unique within a source).
//!
//! - latest value: greatest recency, then earliest-declared source, then
//!   greatest row key
//! - current row: greatest time, then greatest row key

use crate::StatusFields;
use chrono::NaiveDateTime;
use ssemr_reports_types::{PersonId, Value};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// A candidate value from one source row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub person: PersonId,
    pub recency: NaiveDateTime,
    /// Position of the source in declaration order
    pub source_rank: usize,
    pub row_key: Option<i64>,
    pub value: Value,
}

impl Candidate {
    fn order_key(&self) -> (NaiveDateTime, Reverse<usize>, Option<i64>) {
        (self.recency, Reverse(self.source_rank), self.row_key)
    }
}

/// One encounter row of a current-row table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncounterRow {
    pub person: PersonId,
    pub time: NaiveDateTime,
    pub row_key: Option<i64>,
    pub fields: StatusFields,
}

impl EncounterRow {
    fn order_key(&self) -> (NaiveDateTime, Option<i64>) {
        (self.time, self.row_key)
    }
}

/// Keep the most recent candidate per person
pub fn latest_per_person(candidates: impl IntoIterator<Item = Candidate>) -> BTreeMap<PersonId, Candidate> {
    keep_greatest(candidates, |c| c.person, Candidate::order_key)
}

/// Keep the rank-1 (most recent) row per person
pub fn current_row_per_person(rows: impl IntoIterator<Item = EncounterRow>) -> BTreeMap<PersonId, EncounterRow> {
    keep_greatest(rows, |r| r.person, EncounterRow::order_key)
}

fn keep_greatest<T, K: Ord>(
    items: impl IntoIterator<Item = T>,
    person: impl Fn(&T) -> PersonId,
    key: impl Fn(&T) -> K,
) -> BTreeMap<PersonId, T> {
    let mut best: BTreeMap<PersonId, T> = BTreeMap::new();
    for item in items {
        match best.entry(person(&item)) {
            Entry::Vacant(slot) => {
                slot.insert(item);
            }
            Entry::Occupied(mut slot) => {
                if key(&item) > key(slot.get()) {
                    slot.insert(item);
                }
            }
        }
    }
    best
}
