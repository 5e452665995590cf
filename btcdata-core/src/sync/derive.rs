//! Columns computed from freshly fetched ones.

use super::reconcile::PendingRows;
use crate::config::{DerivedColumn, DerivedKind};
use crate::dataset::Value;

/// Fill `spec.column` on every pending row.
///
/// `anchor` is the value of the source column just before the first pending
/// row (normally the dataset's last known value), so the first new row gets
/// a change too. A row whose source value is missing gets no derived value,
/// and the next row compares against the last value seen.
pub fn apply(pending: &mut PendingRows, spec: &DerivedColumn, anchor: Option<f64>) {
    match spec.kind {
        DerivedKind::PercentChange => percent_change(pending, &spec.source, &spec.column, anchor),
    }
}

fn percent_change(pending: &mut PendingRows, source: &str, target: &str, anchor: Option<f64>) {
    let dates: Vec<_> = pending.dates().collect();
    let mut prev = anchor;
    for date in dates {
        let current = pending.get(date, source).and_then(Value::as_f64);
        let change = match (prev, current) {
            (Some(p), Some(c)) => Value::number((c - p) / p * 100.0),
            _ => None,
        };
        pending.set(date, target, change);
        if current.is_some() {
            prev = current;
        }
    }
}
