//! Segment detection over keys whose equal rows are contiguous.

use super::EXCLUDED;
use crate::comparator::RowComparator;
use crate::error::Result;
use crate::memory::{try_vec_with_capacity, MemoryResource, Reservation};
use crate::stream::Stream;
use std::cmp::Ordering;
use std::sync::Arc;

/// Smallest chunk a lane scans on its own.
const SCAN_CHUNK: usize = 16 * 1024;

/// Returns `(row_groups, representatives)`.
///
/// A boundary is flagged wherever a surviving row differs from the previous surviving row; a
/// chunked prefix sum over the flags turns them into group ids.
pub(super) fn identify(
    rows: usize,
    cmp: &RowComparator<'_, '_>,
    survivors: Option<&[bool]>,
    stream: &Stream,
    resource: &Arc<dyn MemoryResource>,
) -> Result<(Vec<usize>, Vec<usize>)> {
    // Surviving row order, boundary flags and scanned ids.
    let _scratch = Reservation::for_elements::<(usize, bool, usize)>(resource, rows)?;

    let order: Vec<usize> = match survivors {
        Some(mask) => {
            let mut order = try_vec_with_capacity(rows)?;
            order.extend((0..rows).filter(|&r| mask[r]));
            order
        }
        None => (0..rows).collect(),
    };
    let n = order.len();

    let boundaries: Vec<bool> = stream.map(n, |i| {
        i == 0 || cmp.compare(order[i - 1], order[i]) != Ordering::Equal
    });

    // Exclusive scan: per-chunk boundary totals, prefix-summed, then expanded within each chunk.
    let totals = stream.map_chunks(n, SCAN_CHUNK, |_, range| {
        boundaries[range].iter().filter(|b| **b).count()
    });
    let mut chunk_base = try_vec_with_capacity(totals.len())?;
    let mut running = 0usize;
    for total in &totals {
        chunk_base.push(running);
        running += total;
    }
    let num_groups = running;

    let ids: Vec<Vec<usize>> = stream.map_chunks(n, SCAN_CHUNK, |chunk, range| {
        let mut seen = chunk_base[chunk];
        boundaries[range]
            .iter()
            .map(|&boundary| {
                seen += usize::from(boundary);
                seen - 1
            })
            .collect()
    });

    let mut row_groups = try_vec_with_capacity(rows)?;
    row_groups.resize(rows, EXCLUDED);
    for (&row, id) in order.iter().zip(ids.into_iter().flatten()) {
        row_groups[row] = id;
    }

    let mut representatives = try_vec_with_capacity(num_groups)?;
    representatives.extend(
        order
            .iter()
            .zip(&boundaries)
            .filter(|(_, boundary)| **boundary)
            .map(|(&row, _)| row),
    );

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
    fn scans_contiguous_segments() {
        let table = Table::new(vec![
            Column::new(vec![1i32, 1, 2, 2, 2, 5]),
            Column::from_strs(&[Some("x"), Some("x"), Some("x"), Some("y"), Some("y"), None]),
        ])
        .unwrap();
        let view = table.view();
        let cmp = RowComparator::new(&view, &[], &[]);

        let (row_groups, reps) =
            identify(6, &cmp, None, &Stream::serial(), &default_resource()).unwrap();
        assert_eq!(row_groups, vec![0, 0, 1, 2, 2, 3]);
        assert_eq!(reps, vec![0, 2, 3, 5]);
    }

    #[test]
    fn skips_excluded_rows_when_detecting_boundaries() {
        let table = Table::new(vec![Column::new(vec![7i64, 7, 7, 8])]).unwrap();
        let view = table.view();
        let cmp = RowComparator::equality(&view);
        let mask = [true, false, true, true];

        let (row_groups, reps) =
            identify(4, &cmp, Some(&mask[..]), &Stream::serial(), &default_resource()).unwrap();
        assert_eq!(row_groups, vec![0, EXCLUDED, 0, 1]);
        assert_eq!(reps, vec![0, 3]);
    }

    #[test]
    fn parallel_scan_matches_serial_scan() {
        let n = 100_000;
        let keys: Vec<i64> = (0..n as i64).map(|i| i / 7).collect();
        let table = Table::new(vec![Column::new(keys)]).unwrap();
        let view = table.view();
        let cmp = RowComparator::equality(&view);

        let serial = identify(n, &cmp, None, &Stream::serial(), &default_resource()).unwrap();
        let parallel =
            identify(n, &cmp, None, &Stream::with_threads(4), &default_resource()).unwrap();
        assert_eq!(serial, parallel);
        assert_eq!(serial.1.len(), n.div_ceil(7));
        assert_eq!(serial.0[n - 1], n.div_ceil(7) - 1);
    }
}
