//! Per-group aggregation kernels and their dispatch.
//!
//! Every kernel maps over groups of a shared [`GroupIndex`]: result row `g` is computed from the
//! rows of group `g` only, so all outputs of a call line up with the group numbering. Nulls in the
//! value column are skipped; a group with no valid values yields null (COUNT yields 0).

mod quantile;
mod reduce;

use crate::aggregation::Aggregation;
use crate::bitmap::Bitmap;
use crate::column::{Column, ColumnData, ColumnView};
use crate::error::{GroupbyError, Result};
use crate::group::GroupIndex;
use crate::memory::{MemoryResource, Reservation};
use crate::stream::Stream;
use crate::types::DataType;
use std::cmp::Ordering;
use std::sync::Arc;

/// Typed per-group results before they are packed into a column.
#[derive(Debug, PartialEq)]
pub(crate) enum Output {
    Bool(Vec<Option<bool>>),
    Int32(Vec<Option<i32>>),
    Int64(Vec<Option<i64>>),
    Float32(Vec<Option<f32>>),
    Float64(Vec<Option<f64>>),
    Utf8(Vec<Option<Arc<str>>>),
}

fn split<T>(values: Vec<Option<T>>, fill: impl Fn() -> T) -> (Vec<T>, Bitmap) {
    let validity = values.iter().map(Option::is_some).collect();
    let data = values.into_iter().map(|v| v.unwrap_or_else(&fill)).collect();
    (data, validity)
}

impl Output {
    fn into_column(self, reservation: Reservation) -> Column {
        let (data, validity) = match self {
            Output::Bool(v) => {
                let (data, validity) = split(v, || false);
                (ColumnData::Bool(data), validity)
            }
            Output::Int32(v) => {
                let (data, validity) = split(v, || 0);
                (ColumnData::Int32(data), validity)
            }
            Output::Int64(v) => {
                let (data, validity) = split(v, || 0);
                (ColumnData::Int64(data), validity)
            }
            Output::Float32(v) => {
                let (data, validity) = split(v, || 0.0);
                (ColumnData::Float32(data), validity)
            }
            Output::Float64(v) => {
                let (data, validity) = split(v, || 0.0);
                (ColumnData::Float64(data), validity)
            }
            Output::Utf8(v) => {
                let (data, validity) = split(v, || Arc::<str>::from(""));
                (ColumnData::Utf8(data), validity)
            }
        };
        Column::from_reserved(data, Some(validity), reservation)
    }
}

pub(super) fn unsupported(aggregation: &Aggregation, data_type: DataType) -> GroupbyError {
    GroupbyError::UnsupportedAggregation {
        kind: aggregation.kind(),
        data_type,
    }
}

/// Bytes charged for one result column of `data_type` with `groups` rows.
fn reserve_output(
    resource: &Arc<dyn MemoryResource>,
    data_type: DataType,
    groups: usize,
) -> Result<Reservation> {
    let bytes = groups
        .saturating_mul(data_type.byte_width())
        .saturating_add(Bitmap::byte_len(groups));
    Reservation::new(resource, bytes, std::mem::align_of::<u64>())
}

/// Compute one aggregation over `values`, returning its result column(s).
pub(crate) fn compute(
    values: ColumnView<'_>,
    aggregation: &Aggregation,
    index: &GroupIndex,
    stream: &Stream,
    resource: &Arc<dyn MemoryResource>,
) -> Result<Vec<Column>> {
    let input = values.data_type();
    let output = aggregation
        .output_type(input)
        .ok_or_else(|| unsupported(aggregation, input))?;
    let groups = index.num_groups();

    log::trace!(
        "{:?} over {input:?} -> {output:?} for {groups} groups",
        aggregation.kind()
    );

    // Reserve every output before running the kernel.
    let reservations = (0..aggregation.num_outputs())
        .map(|_| reserve_output(resource, output, groups))
        .collect::<Result<Vec<_>>>()?;

    let outputs = match aggregation {
        Aggregation::Count => vec![Output::Int64(reduce::count(values, index, stream))],
        Aggregation::Sum => vec![reduce::sum(values, index, stream)
            .ok_or_else(|| unsupported(aggregation, input))?],
        Aggregation::Mean => vec![Output::Float64(
            reduce::mean(values, index, stream).ok_or_else(|| unsupported(aggregation, input))?,
        )],
        Aggregation::Min => vec![reduce::extreme(values, index, stream, Ordering::Less)],
        Aggregation::Max => vec![reduce::extreme(values, index, stream, Ordering::Greater)],
        Aggregation::Median | Aggregation::Quantile { .. } => {
            let (fractions, interpolation) = aggregation
                .quantile_spec()
                .ok_or_else(|| unsupported(aggregation, input))?;
            let _scratch = Reservation::for_elements::<f64>(resource, values.len())?;
            quantile::quantiles(values, index, stream, fractions, interpolation)
                .ok_or_else(|| unsupported(aggregation, input))?
                .into_iter()
                .map(Output::Float64)
                .collect()
        }
    };

    Ok(outputs
        .into_iter()
        .zip(reservations)
        .map(|(output, reservation)| output.into_column(reservation))
        .collect())
}

/// Rows of `rows` whose value is non-null.
#[inline]
pub(super) fn valid_rows<'r>(
    values: ColumnView<'r>,
    rows: &'r [usize],
) -> impl Iterator<Item = usize> + 'r {
    rows.iter().copied().filter(move |&r| values.is_valid(r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{identify, GroupingPlan};
    use crate::memory::{default_resource, DefaultMemoryResource};
    use crate::table::Table;
    use crate::types::{Interpolation, Value};
    use pretty_assertions::assert_eq;

    fn index_for(keys: &Table, resource: &Arc<dyn MemoryResource>) -> GroupIndex {
        let plan = GroupingPlan {
            ignore_null_keys: true,
            keys_are_sorted: false,
            column_order: &[],
            null_precedence: &[],
        };
        let groups = identify(&keys.view(), plan, &Stream::serial(), resource).unwrap();
        GroupIndex::build(&groups, resource).unwrap()
    }

    #[test]
    fn quantile_yields_one_column_per_fraction() {
        let resource = default_resource();
        let keys = Table::new(vec![Column::new(vec![1i32, 1, 1, 1, 2])]).unwrap();
        let values = Column::new(vec![4.0f64, 1.0, 3.0, 2.0, 10.0]);
        let index = index_for(&keys, &resource);

        let columns = compute(
            values.view(),
            &Aggregation::quantile([0.25, 0.5], Interpolation::Lower),
            &index,
            &Stream::serial(),
            &resource,
        )
        .unwrap();

        assert_eq!(columns.len(), 2);
        assert_eq!(
            columns[0].to_values(),
            vec![Value::Float64(1.0), Value::Float64(10.0)]
        );
        assert_eq!(
            columns[1].to_values(),
            vec![Value::Float64(2.0), Value::Float64(10.0)]
        );
    }

    #[test]
    fn results_are_charged_to_the_resource() {
        let tracker = Arc::new(DefaultMemoryResource::new());
        let resource: Arc<dyn MemoryResource> = tracker.clone();
        let keys = Table::new(vec![Column::new(vec![1i32, 2, 1])]).unwrap();
        let values = Column::new(vec![1i64, 2, 3]);
        let index = index_for(&keys, &resource);
        let before = tracker.current_bytes();

        let columns = compute(
            values.view(),
            &Aggregation::sum(),
            &index,
            &Stream::serial(),
            &resource,
        )
        .unwrap();
        assert_eq!(
            columns[0].to_values(),
            vec![Value::Int64(4), Value::Int64(2)]
        );
        assert!(columns[0].reserved_bytes() >= 2 * 8);
        assert_eq!(
            tracker.current_bytes(),
            before + columns[0].reserved_bytes()
        );
    }

    #[test]
    fn unsupported_combination_is_reported() {
        let resource = default_resource();
        let keys = Table::new(vec![Column::new(vec![1i32])]).unwrap();
        let values = Column::from_strs(&[Some("a")]);
        let index = index_for(&keys, &resource);
        let err = compute(
            values.view(),
            &Aggregation::sum(),
            &index,
            &Stream::serial(),
            &resource,
        )
        .unwrap_err();
        assert!(matches!(err, GroupbyError::UnsupportedAggregation { .. }));
    }
}
