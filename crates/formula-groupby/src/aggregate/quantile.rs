//! Sort-based order statistics (MEDIAN / QUANTILE).

use super::valid_rows;
use crate::column::{ColumnData, ColumnView};
use crate::group::GroupIndex;
use crate::stream::Stream;
use crate::types::Interpolation;
use ordered_float::OrderedFloat;

/// Value at fraction `q` of an ascending, non-empty slice.
///
/// The fractional rank is `q * (n - 1)`; `Nearest` rounds exact halves to the even rank.
pub(crate) fn select_quantile(sorted: &[f64], q: f64, interpolation: Interpolation) -> f64 {
    debug_assert!(!sorted.is_empty());
    let last = sorted.len() - 1;
    let rank = q * last as f64;
    let lo = (rank.floor() as usize).min(last);
    let hi = (rank.ceil() as usize).min(last);

    let (below, above) = (sorted[lo], sorted[hi]);

    match interpolation {
        // Weighted form stays finite for extreme neighbours and exact for equal infinities.
        Interpolation::Linear if below == above => below,
        Interpolation::Linear => {
            let t = rank - lo as f64;
            below * (1.0 - t) + above * t
        }
        Interpolation::Lower => below,
        Interpolation::Higher => above,
        Interpolation::Midpoint if below == above => below,
        Interpolation::Midpoint => below / 2.0 + above / 2.0,
        Interpolation::Nearest => sorted[(rank.round_ties_even() as usize).min(last)],
    }
}

fn group_quantiles<G>(
    values: ColumnView<'_>,
    index: &GroupIndex,
    stream: &Stream,
    get: G,
    fractions: &[f64],
    interpolation: Interpolation,
) -> Vec<Vec<Option<f64>>>
where
    G: Fn(usize) -> f64 + Sync + Send,
{
    let per_group: Vec<Vec<Option<f64>>> = stream.map(index.num_groups(), |g| {
        let mut sorted: Vec<f64> = valid_rows(values, index.rows(g)).map(&get).collect();
        if sorted.is_empty() {
            return vec![None; fractions.len()];
        }
        sorted.sort_unstable_by_key(|v| OrderedFloat(*v));
        fractions
            .iter()
            .map(|&q| Some(select_quantile(&sorted, q, interpolation)))
            .collect()
    });

    (0..fractions.len())
        .map(|k| per_group.iter().map(|group| group[k]).collect())
        .collect()
}

/// One result vector per fraction, each holding one entry per group. `None` for non-numeric
/// values.
pub(super) fn quantiles(
    values: ColumnView<'_>,
    index: &GroupIndex,
    stream: &Stream,
    fractions: &[f64],
    interpolation: Interpolation,
) -> Option<Vec<Vec<Option<f64>>>> {
    let run = |get: &(dyn Fn(usize) -> f64 + Sync + Send)| {
        group_quantiles(values, index, stream, get, fractions, interpolation)
    };
    Some(match values.data() {
        ColumnData::Int32(v) => run(&|r| f64::from(v[r])),
        ColumnData::Int64(v) => run(&|r| v[r] as f64),
        ColumnData::Float32(v) => run(&|r| f64::from(v[r])),
        ColumnData::Float64(v) => run(&|r| v[r]),
        ColumnData::Bool(_) | ColumnData::Utf8(_) => return None,
    })
}
