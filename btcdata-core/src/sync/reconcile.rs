//! Schema reconciliation for freshly built rows.
//!
//! New rows are assembled as sparse `column -> value` maps. Reconciliation
//! lays them out in the dataset's schema, one rule per column:
//!
//! - `Fresh`: the cell takes the fetched value or stays missing.
//! - `CarryForward`: a missing cell takes the most recent known value.
//!
//! Columns no feed produces are always `CarryForward`. Rows still missing a
//! cell afterwards are dropped and reported.

use crate::dataset::{Cell, Dataset, Row, Value};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRule {
    Fresh,
    CarryForward,
}

/// Per-column fill rules for one sync run.
#[derive(Debug, Clone, Default)]
pub struct FillPolicy {
    produced: HashSet<String>,
    carry_forward: HashSet<String>,
}

impl FillPolicy {
    pub fn new<P, C>(produced: P, carry_forward: C) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self {
            produced: produced.into_iter().map(Into::into).collect(),
            carry_forward: carry_forward.into_iter().map(Into::into).collect(),
        }
    }

    pub fn rule_for(&self, column: &str) -> ColumnRule {
        if !self.produced.contains(column) || self.carry_forward.contains(column) {
            ColumnRule::CarryForward
        } else {
            ColumnRule::Fresh
        }
    }
}

/// Rows under construction, keyed by date.
#[derive(Debug, Clone, Default)]
pub struct PendingRows {
    rows: BTreeMap<NaiveDate, HashMap<String, Value>>,
}

impl PendingRows {
    /// One empty row per date.
    pub fn for_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            rows: dates.into_iter().map(|d| (d, HashMap::new())).collect(),
        }
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.keys().copied()
    }

    /// Set `column` on `date`. Dates without a pending row are ignored and a
    /// missing value leaves the cell untouched.
    pub fn set(&mut self, date: NaiveDate, column: &str, value: Option<Value>) {
        if let (Some(row), Some(value)) = (self.rows.get_mut(&date), value) {
            row.insert(column.to_string(), value);
        }
    }

    /// Set `column` on every pending row.
    pub fn set_all(&mut self, column: &str, value: Value) {
        for row in self.rows.values_mut() {
            row.insert(column.to_string(), value.clone());
        }
    }

    pub fn get(&self, date: NaiveDate, column: &str) -> Option<&Value> {
        self.rows.get(&date).and_then(|row| row.get(column))
    }
}

/// A row removed because a cell was still missing after reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedRow {
    pub date: NaiveDate,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Reconciled {
    pub rows: Vec<Row>,
    pub dropped: Vec<DroppedRow>,
}

/// Lay `pending` out in `dataset`'s schema under `policy`.
///
/// Carry-forward values start from the dataset's most recent known value of
/// each column and advance with every kept row. Values for columns outside
/// the schema are discarded.
pub fn reconcile(dataset: &Dataset, pending: PendingRows, policy: &FillPolicy) -> Reconciled {
    let columns = dataset.columns();
    let rules: Vec<ColumnRule> = columns.iter().map(|c| policy.rule_for(c)).collect();
    let mut last_known: Vec<Cell> = columns
        .iter()
        .map(|c| dataset.last_known(c).cloned())
        .collect();

    let mut out = Reconciled::default();
    for (date, mut values) in pending.rows {
        let cells: Vec<Cell> = columns
            .iter()
            .zip(&rules)
            .zip(&last_known)
            .map(|((name, rule), known)| match (values.remove(name), rule) {
                (Some(v), _) => Some(v),
                (None, ColumnRule::CarryForward) => known.clone(),
                (None, ColumnRule::Fresh) => None,
            })
            .collect();

        let row = Row { date, cells };
        if row.is_complete() {
            last_known.clone_from(&row.cells);
            out.rows.push(row);
        } else {
            out.dropped.push(DroppedRow {
                date,
                missing: row
                    .missing_columns(columns)
                    .into_iter()
                    .map(String::from)
                    .collect(),
            });
        }
    }
    out
}
