//! Row-level comparison and hashing over a key table.

use crate::column::{ColumnData, ColumnView};
use crate::table::TableView;
use crate::types::{NullOrder, Order};
use ahash::RandomState;
use ordered_float::OrderedFloat;
use std::cmp::Ordering;
use std::hash::BuildHasher;

/// Hash mixed in for a null cell, so tuples that are null in the same columns hash alike.
pub(crate) const NULL_HASH: u64 = 0x6e75_6c6c_6b65_7973;

const ROW_HASH_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// Natural order of two non-null elements of the same buffer.
///
/// Floats use `OrderedFloat` semantics: NaN equals NaN and sorts above every number, and
/// `-0.0 == 0.0`.
pub(crate) fn compare_values(data: &ColumnData, a: usize, b: usize) -> Ordering {
    match data {
        ColumnData::Bool(v) => v[a].cmp(&v[b]),
        ColumnData::Int32(v) => v[a].cmp(&v[b]),
        ColumnData::Int64(v) => v[a].cmp(&v[b]),
        ColumnData::Float32(v) => OrderedFloat(v[a]).cmp(&OrderedFloat(v[b])),
        ColumnData::Float64(v) => OrderedFloat(v[a]).cmp(&OrderedFloat(v[b])),
        ColumnData::Utf8(v) => v[a].cmp(&v[b]),
    }
}

fn compare_cells(column: ColumnView<'_>, a: usize, b: usize, nulls: NullOrder) -> Ordering {
    let null_vs_value = match nulls {
        NullOrder::Before => Ordering::Less,
        NullOrder::After => Ordering::Greater,
    };
    match (column.is_valid(a), column.is_valid(b)) {
        (true, true) => compare_values(column.data(), a, b),
        (false, false) => Ordering::Equal,
        (false, true) => null_vs_value,
        (true, false) => null_vs_value.reverse(),
    }
}

/// Compares rows of a key table column by column.
///
/// Missing order/null-precedence entries default to ascending with nulls before values.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RowComparator<'t, 'a> {
    keys: &'t TableView<'a>,
    column_order: &'t [Order],
    null_precedence: &'t [NullOrder],
}

impl<'t, 'a> RowComparator<'t, 'a> {
    pub fn new(
        keys: &'t TableView<'a>,
        column_order: &'t [Order],
        null_precedence: &'t [NullOrder],
    ) -> Self {
        Self {
            keys,
            column_order,
            null_precedence,
        }
    }

    /// Comparator for equality only; ordering flags do not affect equality.
    pub fn equality(keys: &'t TableView<'a>) -> Self {
        Self::new(keys, &[], &[])
    }

    pub fn compare(&self, a: usize, b: usize) -> Ordering {
        for (idx, column) in self.keys.columns().iter().enumerate() {
            let nulls = self.null_precedence.get(idx).copied().unwrap_or_default();
            let ord = compare_cells(*column, a, b, nulls);
            if ord == Ordering::Equal {
                continue;
            }
            return match self.column_order.get(idx).copied().unwrap_or_default() {
                Order::Ascending => ord,
                Order::Descending => ord.reverse(),
            };
        }
        Ordering::Equal
    }

    pub fn equal(&self, a: usize, b: usize) -> bool {
        self.keys
            .columns()
            .iter()
            .all(|column| compare_cells(*column, a, b, NullOrder::Before) == Ordering::Equal)
    }
}

/// Combine two 64-bit hashes (boost `hash_combine`, widened to 64 bits).
#[inline]
fn hash_combine(seed: u64, value: u64) -> u64 {
    seed ^ value
        .wrapping_add(0x9E37_79B9_7F4A_7C15)
        .wrapping_add(seed << 6)
        .wrapping_add(seed >> 2)
}

/// Null-aware hash of whole key rows, consistent with [`RowComparator::equal`]: rows that
/// compare equal always hash equal.
#[derive(Clone, Debug)]
pub(crate) struct RowHasher<'t, 'a> {
    keys: &'t TableView<'a>,
    state: RandomState,
}

impl<'t, 'a> RowHasher<'t, 'a> {
    pub fn new(keys: &'t TableView<'a>) -> Self {
        Self {
            keys,
            // Fixed seeds keep group discovery reproducible across runs.
            state: RandomState::with_seeds(
                0x243F_6A88_85A3_08D3,
                0x1319_8A2E_0370_7344,
                0xA409_3822_299F_31D0,
                0x082E_FA98_EC4E_6C89,
            ),
        }
    }

    fn hash_cell(&self, data: &ColumnData, row: usize) -> u64 {
        match data {
            ColumnData::Bool(v) => self.state.hash_one(v[row]),
            ColumnData::Int32(v) => self.state.hash_one(v[row]),
            ColumnData::Int64(v) => self.state.hash_one(v[row]),
            ColumnData::Float32(v) => self.state.hash_one(OrderedFloat(v[row])),
            ColumnData::Float64(v) => self.state.hash_one(OrderedFloat(v[row])),
            ColumnData::Utf8(v) => self.state.hash_one(v[row].as_ref()),
        }
    }

    pub fn hash_row(&self, row: usize) -> u64 {
        self.keys.columns().iter().fold(ROW_HASH_SEED, |acc, column| {
            let cell = if column.is_valid(row) {
                self.hash_cell(column.data(), row)
            } else {
                NULL_HASH
            };
            hash_combine(acc, cell)
        })
    }
}
