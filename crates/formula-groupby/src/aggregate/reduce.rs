use super::{valid_rows, Output};
use crate::column::{ColumnData, ColumnView};
use crate::comparator::compare_values;
use crate::group::GroupIndex;
use crate::stream::Stream;
use std::cmp::Ordering;

/// Non-null values per group. Never null.
pub(super) fn count(
    values: ColumnView<'_>,
    index: &GroupIndex,
    stream: &Stream,
) -> Vec<Option<i64>> {
    stream.map(index.num_groups(), |g| {
        Some(valid_rows(values, index.rows(g)).count() as i64)
    })
}

fn group_sums<T, G>(
    values: ColumnView<'_>,
    index: &GroupIndex,
    stream: &Stream,
    get: G,
    add: fn(T, T) -> T,
) -> Vec<Option<T>>
where
    T: Copy + Default + Send,
    G: Fn(usize) -> T + Sync + Send,
{
    stream.map(index.num_groups(), |g| {
        let mut rows = valid_rows(values, index.rows(g)).peekable();
        rows.peek()?;
        Some(rows.fold(T::default(), |acc, r| add(acc, get(r))))
    })
}

enum Sums {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
}

/// Integer inputs accumulate in `i64` with wrapping overflow; floats accumulate in `f64`.
fn sums(values: ColumnView<'_>, index: &GroupIndex, stream: &Stream) -> Option<Sums> {
    Some(match values.data() {
        ColumnData::Int32(v) => Sums::Int(group_sums(
            values,
            index,
            stream,
            |r| i64::from(v[r]),
            i64::wrapping_add,
        )),
        ColumnData::Int64(v) => {
            Sums::Int(group_sums(values, index, stream, |r| v[r], i64::wrapping_add))
        }
        ColumnData::Float32(v) => Sums::Float(group_sums(
            values,
            index,
            stream,
            |r| f64::from(v[r]),
            |a, b| a + b,
        )),
        ColumnData::Float64(v) => {
            Sums::Float(group_sums(values, index, stream, |r| v[r], |a, b| a + b))
        }
        ColumnData::Bool(_) | ColumnData::Utf8(_) => return None,
    })
}

pub(super) fn sum(values: ColumnView<'_>, index: &GroupIndex, stream: &Stream) -> Option<Output> {
    Some(match sums(values, index, stream)? {
        Sums::Int(v) => Output::Int64(v),
        Sums::Float(v) => Output::Float64(v),
    })
}

/// SUM / COUNT as a floating-point division; null where COUNT is zero.
///
/// The numerator is accumulated in `f64` for every input type, so integer groups whose `i64`
/// SUM would wrap still average correctly.
pub(super) fn mean(
    values: ColumnView<'_>,
    index: &GroupIndex,
    stream: &Stream,
) -> Option<Vec<Option<f64>>> {
    let add: fn(f64, f64) -> f64 = |a, b| a + b;
    let sums = match values.data() {
        ColumnData::Int32(v) => group_sums(values, index, stream, |r| f64::from(v[r]), add),
        ColumnData::Int64(v) => group_sums(values, index, stream, |r| v[r] as f64, add),
        ColumnData::Float32(v) => group_sums(values, index, stream, |r| f64::from(v[r]), add),
        ColumnData::Float64(v) => group_sums(values, index, stream, |r| v[r], add),
        ColumnData::Bool(_) | ColumnData::Utf8(_) => return None,
    };
    let counts = count(values, index, stream);
    Some(
        sums.into_iter()
            .zip(counts)
            .map(|(sum, count)| match (sum, count) {
                (Some(sum), Some(count)) if count > 0 => Some(sum / count as f64),
                _ => None,
            })
            .collect(),
    )
}

/// MIN (`want == Less`) or MAX (`want == Greater`) under the type's natural order. Ties keep the
/// earliest row.
pub(super) fn extreme(
    values: ColumnView<'_>,
    index: &GroupIndex,
    stream: &Stream,
    want: Ordering,
) -> Output {
    let data = values.data();
    let best: Vec<Option<usize>> = stream.map(index.num_groups(), |g| {
        valid_rows(values, index.rows(g))
            .reduce(|best, r| if compare_values(data, r, best) == want { r } else { best })
    });

    fn pick<T: Clone>(values: &[T], best: &[Option<usize>]) -> Vec<Option<T>> {
        best.iter().map(|r| r.map(|r| values[r].clone())).collect()
    }

    match data {
        ColumnData::Bool(v) => Output::Bool(pick(v, &best)),
        ColumnData::Int32(v) => Output::Int32(pick(v, &best)),
        ColumnData::Int64(v) => Output::Int64(pick(v, &best)),
        ColumnData::Float32(v) => Output::Float32(pick(v, &best)),
        ColumnData::Float64(v) => Output::Float64(pick(v, &best)),
        ColumnData::Utf8(v) => Output::Utf8(pick(v, &best)),
    }
}
