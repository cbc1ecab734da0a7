use crate::group::GroupAssignment;

/// Ordering token returned by [`Groupby::aggregate`](crate::Groupby::aggregate).
///
/// Row `g` of every result column produced by that call belongs to group `g`; passing the labels
/// to [`Groupby::groups`](crate::Groupby::groups) materializes the key tuple of each group in the
/// same order. The labels are consumed by `groups` and cannot be cloned, so they can only be
/// materialized once:
///
/// ```compile_fail
/// use formula_groupby::{Aggregation, AggregationRequest, Column, Groupby, GroupbyOptions, Table};
///
/// let keys = Table::new(vec![Column::new(vec![1i32, 2, 1])]).unwrap();
/// let values = Column::new(vec![1i64, 2, 3]);
/// let groupby = Groupby::new(keys.view(), GroupbyOptions::default()).unwrap();
/// let (labels, _) = groupby
///     .aggregate(&[AggregationRequest::new(values.view(), vec![Aggregation::sum()])])
///     .unwrap();
///
/// let first = groupby.groups(labels).unwrap();
/// let second = groupby.groups(labels).unwrap(); // use of moved value
/// ```
#[derive(Debug)]
pub struct GroupLabels {
    pub(crate) context_id: u64,
    assignment: GroupAssignment,
}

impl GroupLabels {
    pub(crate) fn new(context_id: u64, assignment: GroupAssignment) -> Self {
        Self {
            context_id,
            assignment,
        }
    }

    /// Number of distinct (non-excluded) key tuples.
    pub fn num_groups(&self) -> usize {
        self.assignment.num_groups()
    }

    /// For each group, the keys-table row that stands for its key tuple.
    pub fn representatives(&self) -> &[usize] {
        self.assignment.representatives()
    }

    /// Group of a keys-table row, or `None` if the row was excluded (or is out of range).
    pub fn group_of(&self, row: usize) -> Option<usize> {
        self.assignment.group_of(row)
    }
}
