use super::{GroupAssignment, EXCLUDED};
use crate::error::Result;
use crate::memory::{try_vec_with_capacity, MemoryResource, Reservation};
use std::sync::Arc;

/// Rows of every group laid out contiguously (CSR): group `g` owns
/// `rows[offsets[g]..offsets[g + 1]]`, in ascending row order.
///
/// Built once per aggregation call and shared by every kernel of that call.
#[derive(Debug)]
pub(crate) struct GroupIndex {
    offsets: Vec<usize>,
    rows: Vec<usize>,
    _reservation: Reservation,
}

impl GroupIndex {
    /// Counting sort of rows by group id.
    pub fn build(groups: &GroupAssignment, resource: &Arc<dyn MemoryResource>) -> Result<Self> {
        let num_groups = groups.num_groups();
        let row_groups = groups.row_groups();
        let members = row_groups.iter().filter(|g| **g != EXCLUDED).count();
        let reservation =
            Reservation::for_elements::<usize>(resource, num_groups + 1 + members)?;

        let mut offsets = try_vec_with_capacity(num_groups + 1)?;
        offsets.resize(num_groups + 1, 0usize);
        for &g in row_groups.iter().filter(|g| **g != EXCLUDED) {
            offsets[g + 1] += 1;
        }
        for g in 0..num_groups {
            offsets[g + 1] += offsets[g];
        }

        let mut cursor = offsets.clone();
        let mut rows = try_vec_with_capacity(members)?;
        rows.resize(members, 0usize);
        for (row, &g) in row_groups.iter().enumerate() {
            if g != EXCLUDED {
                rows[cursor[g]] = row;
                cursor[g] += 1;
            }
        }

        Ok(Self {
            offsets,
            rows,
            _reservation: reservation,
        })
    }

    pub fn num_groups(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn rows(&self, group: usize) -> &[usize] {
        &self.rows[self.offsets[group]..self.offsets[group + 1]]
    }
}
