//! Concurrent hash-probe grouping over unsorted keys.

use super::EXCLUDED;
use crate::comparator::{RowComparator, RowHasher};
use crate::error::Result;
use crate::memory::{try_vec_with_capacity, MemoryResource, Reservation};
use crate::stream::Stream;
use crate::table::TableView;
use ahash::RandomState;
use dashmap::DashMap;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// One distinct key tuple seen under a given row hash.
#[derive(Debug)]
struct Slot {
    group: usize,
    /// Lowest row inserted so far; used both for the equality probe and as representative.
    first_row: usize,
}

/// Slots sharing a row hash. Collisions are rare, so one slot is kept inline.
type Bucket = SmallVec<[Slot; 1]>;

/// Returns `(row_groups, representatives)`.
///
/// Rows are probed concurrently. Each probe holds the bucket's shard lock while it checks full
/// tuple equality against the bucket's slots, and claims a fresh provisional id from an atomic
/// counter only when no slot matches, so no id is handed out twice. Provisional ids depend on
/// scheduling; they are renumbered afterwards by lowest member row.
pub(super) fn identify(
    keys: &TableView<'_>,
    survivors: Option<&[bool]>,
    stream: &Stream,
    resource: &Arc<dyn MemoryResource>,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let rows = keys.num_rows();
    let hasher = RowHasher::new(keys);
    let cmp = RowComparator::equality(keys);

    let _scratch = Reservation::for_elements::<(u64, Slot)>(resource, rows)?;
    let table: DashMap<u64, Bucket, RandomState> =
        DashMap::with_capacity_and_hasher(rows.min(1 << 16), RandomState::new());
    let next_group = AtomicUsize::new(0);

    let provisional: Vec<usize> = stream.map(rows, |row| {
        if survivors.is_some_and(|mask| !mask[row]) {
            return EXCLUDED;
        }
        let mut bucket = table.entry(hasher.hash_row(row)).or_default();
        if let Some(slot) = bucket.iter_mut().find(|s| cmp.equal(s.first_row, row)) {
            slot.first_row = slot.first_row.min(row);
            return slot.group;
        }
        let group = next_group.fetch_add(1, Ordering::Relaxed);
        bucket.push(Slot {
            group,
            first_row: row,
        });
        group
    });

    let num_groups = next_group.into_inner();
    let mut first_rows = try_vec_with_capacity(num_groups)?;
    first_rows.resize(num_groups, EXCLUDED);
    for (_, bucket) in table {
        for slot in bucket {
            first_rows[slot.group] = slot.first_row;
        }
    }

    // First-appearance order: sort provisional ids by their lowest row.
    let mut order: Vec<usize> = (0..num_groups).collect();
    order.sort_unstable_by_key(|&g| first_rows[g]);
    let mut renumber = try_vec_with_capacity(num_groups)?;
    renumber.resize(num_groups, 0);
    for (final_id, &provisional_id) in order.iter().enumerate() {
        renumber[provisional_id] = final_id;
    }

    let row_groups = stream.map(rows, |row| match provisional[row] {
        EXCLUDED => EXCLUDED,
        id => renumber[id],
    });
    let representatives = order.iter().map(|&g| first_rows[g]).collect();

    Ok((row_groups, representatives))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::memory::default_resource;
    use crate::table::Table;
    use pretty_assertions::assert_eq;

    #[test]
    fn groups_are_independent_of_thread_schedule() {
        let n = 50_000;
        let keys: Vec<i64> = (0..n as i64).map(|i| (i * 7919) % 1_013).collect();
        let table = Table::new(vec![Column::new(keys.clone())]).unwrap();
        let view = table.view();

        let serial = identify(&view, None, &Stream::serial(), &default_resource()).unwrap();
        let parallel =
            identify(&view, None, &Stream::with_threads(4), &default_resource()).unwrap();
        assert_eq!(serial, parallel);

        let (row_groups, reps) = serial;
        assert_eq!(reps.len(), 1_013);
        for (row, &group) in row_groups.iter().enumerate() {
            assert_eq!(keys[reps[group]], keys[row]);
            assert!(reps[group] <= row);
        }
    }

    #[test]
    fn string_and_null_keys_share_groups_when_equal() {
        let table = Table::new(vec![Column::from_strs(&[
            Some("b"),
            None,
            Some("a"),
            Some("b"),
            None,
        ])])
        .unwrap();
        let (row_groups, reps) =
            identify(&table.view(), None, &Stream::serial(), &default_resource()).unwrap();
        assert_eq!(row_groups, vec![0, 1, 2, 0, 1]);
        assert_eq!(reps, vec![0, 1, 2]);
    }
}
