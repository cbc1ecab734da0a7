//! Group identification: assign every surviving key row a dense group id.
//!
//! Both strategies number groups in first-appearance order (group 0 holds the lowest surviving
//! row) and pick each group's lowest row as its representative, so the result of a call does not
//! depend on which strategy ran or on thread scheduling.

mod hash;
mod index;
mod sorted;

pub(crate) use index::GroupIndex;

use crate::comparator::RowComparator;
use crate::error::Result;
use crate::memory::{MemoryResource, Reservation};
use crate::stream::Stream;
use crate::table::TableView;
use crate::types::{NullOrder, Order};
use std::sync::Arc;

/// Marks a row excluded from every group (null key with `ignore_null_keys`).
pub(crate) const EXCLUDED: usize = usize::MAX;

/// Per-row group ids plus one representative row per group.
#[derive(Debug)]
pub(crate) struct GroupAssignment {
    num_groups: usize,
    representatives: Vec<usize>,
    row_groups: Vec<usize>,
    _reservations: Vec<Reservation>,
}

impl GroupAssignment {
    pub fn num_groups(&self) -> usize {
        self.num_groups
    }

    pub fn representatives(&self) -> &[usize] {
        &self.representatives
    }

    /// Group id of every input row; [`EXCLUDED`] for rows that belong to no group.
    pub fn row_groups(&self) -> &[usize] {
        &self.row_groups
    }

    pub fn group_of(&self, row: usize) -> Option<usize> {
        self.row_groups.get(row).copied().filter(|g| *g != EXCLUDED)
    }
}

/// Grouping configuration as resolved by the context.
#[derive(Clone, Copy, Debug)]
pub(crate) struct GroupingPlan<'o> {
    pub ignore_null_keys: bool,
    pub keys_are_sorted: bool,
    pub column_order: &'o [Order],
    pub null_precedence: &'o [NullOrder],
}

pub(crate) fn identify(
    keys: &TableView<'_>,
    plan: GroupingPlan<'_>,
    stream: &Stream,
    resource: &Arc<dyn MemoryResource>,
) -> Result<GroupAssignment> {
    let rows = keys.num_rows();

    let mut reservations = vec![Reservation::for_elements::<usize>(resource, rows)?];

    let survivors = if plan.ignore_null_keys && keys.has_nulls() {
        let reservation = Reservation::for_elements::<bool>(resource, rows)?;
        Some((stream.map(rows, |row| !keys.row_has_null(row)), reservation))
    } else {
        None
    };
    let survivor_mask = survivors.as_ref().map(|(mask, _)| mask.as_slice());

    log::debug!(
        "identifying groups over {rows} rows x {} key columns ({} path, stream {})",
        keys.num_columns(),
        if plan.keys_are_sorted { "sorted" } else { "hash" },
        stream.id(),
    );

    let (row_groups, representatives) = if plan.keys_are_sorted {
        let cmp = RowComparator::new(keys, plan.column_order, plan.null_precedence);
        sorted::identify(rows, &cmp, survivor_mask, stream, resource)?
    } else {
        hash::identify(keys, survivor_mask, stream, resource)?
    };

    let num_groups = representatives.len();
    reservations.push(Reservation::for_elements::<usize>(resource, num_groups)?);
    drop(survivors);

    log::debug!("found {num_groups} groups");

    Ok(GroupAssignment {
        num_groups,
        representatives,
        row_groups,
        _reservations: reservations,
    })
}
