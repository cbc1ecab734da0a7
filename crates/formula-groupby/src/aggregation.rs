use crate::column::{Column, ColumnView};
use crate::error::{GroupbyError, Result};
use crate::types::{DataType, Interpolation};
use serde::{Deserialize, Serialize};

/// Tag of an [`Aggregation`], without its parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationKind {
    Sum,
    Min,
    Max,
    Count,
    Mean,
    Median,
    Quantile,
}

/// A statistic to compute per group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Aggregation {
    Sum,
    Min,
    Max,
    /// Number of non-null values.
    Count,
    Mean,
    /// Shorthand for `Quantile { quantiles: [0.5], interpolation: Linear }`.
    Median,
    Quantile {
        quantiles: Vec<f64>,
        #[serde(default)]
        interpolation: Interpolation,
    },
}

impl Aggregation {
    pub fn sum() -> Self {
        Aggregation::Sum
    }

    pub fn min() -> Self {
        Aggregation::Min
    }

    pub fn max() -> Self {
        Aggregation::Max
    }

    pub fn count() -> Self {
        Aggregation::Count
    }

    pub fn mean() -> Self {
        Aggregation::Mean
    }

    pub fn median() -> Self {
        Aggregation::Median
    }

    pub fn quantile(quantiles: impl Into<Vec<f64>>, interpolation: Interpolation) -> Self {
        Aggregation::Quantile {
            quantiles: quantiles.into(),
            interpolation,
        }
    }

    pub fn kind(&self) -> AggregationKind {
        match self {
            Aggregation::Sum => AggregationKind::Sum,
            Aggregation::Min => AggregationKind::Min,
            Aggregation::Max => AggregationKind::Max,
            Aggregation::Count => AggregationKind::Count,
            Aggregation::Mean => AggregationKind::Mean,
            Aggregation::Median => AggregationKind::Median,
            Aggregation::Quantile { .. } => AggregationKind::Quantile,
        }
    }

    /// Result type produced for `input` values, or `None` when the combination is unsupported.
    pub fn output_type(&self, input: DataType) -> Option<DataType> {
        match self {
            Aggregation::Count => Some(DataType::Int64),
            Aggregation::Min | Aggregation::Max => Some(input),
            Aggregation::Sum if input.is_integer() => Some(DataType::Int64),
            Aggregation::Sum if input.is_numeric() => Some(DataType::Float64),
            Aggregation::Mean | Aggregation::Median | Aggregation::Quantile { .. }
                if input.is_numeric() =>
            {
                Some(DataType::Float64)
            }
            _ => None,
        }
    }

    /// Number of result columns this aggregation yields.
    pub fn num_outputs(&self) -> usize {
        match self {
            Aggregation::Quantile { quantiles, .. } => quantiles.len(),
            _ => 1,
        }
    }

    /// Quantile fractions and interpolation for order statistics.
    pub(crate) fn quantile_spec(&self) -> Option<(&[f64], Interpolation)> {
        const MEDIAN: [f64; 1] = [0.5];
        match self {
            Aggregation::Median => Some((&MEDIAN, Interpolation::Linear)),
            Aggregation::Quantile {
                quantiles,
                interpolation,
            } => Some((quantiles, *interpolation)),
            _ => None,
        }
    }

    /// Check parameters and type support against a value column of type `input`.
    pub(crate) fn validate(&self, input: DataType) -> Result<()> {
        if let Aggregation::Quantile { quantiles, .. } = self {
            if quantiles.is_empty() {
                return Err(GroupbyError::config(
                    "quantile aggregation requires at least one fraction",
                ));
            }
            if let Some(q) = quantiles
                .iter()
                .find(|q| !q.is_finite() || !(0.0..=1.0).contains(*q))
            {
                return Err(GroupbyError::config(format!(
                    "quantile fraction {q} is outside [0, 1]"
                )));
            }
        }
        match self.output_type(input) {
            Some(_) => Ok(()),
            None => Err(GroupbyError::UnsupportedAggregation {
                kind: self.kind(),
                data_type: input,
            }),
        }
    }
}

/// Values to aggregate plus the aggregations to run over them.
///
/// Row `i` of `values` belongs to the group of row `i` of the keys the
/// [`Groupby`](crate::Groupby) was built with, so `values.len()` must equal the key row count.
#[derive(Clone, Debug)]
pub struct AggregationRequest<'a> {
    pub values: ColumnView<'a>,
    pub aggregations: Vec<Aggregation>,
}

impl<'a> AggregationRequest<'a> {
    pub fn new(values: ColumnView<'a>, aggregations: Vec<Aggregation>) -> Self {
        Self {
            values,
            aggregations,
        }
    }
}

/// Result column(s) of one requested aggregation.
///
/// Every kind yields exactly one column except [`Aggregation::Quantile`], which yields one column
/// per requested fraction, in request order.
#[derive(Clone, Debug)]
pub struct AggregationOutput {
    pub aggregation: Aggregation,
    pub columns: Vec<Column>,
}

impl AggregationOutput {
    /// The first (for non-quantile kinds, the only) result column; `None` if `columns` is empty.
    pub fn column(&self) -> Option<&Column> {
        self.columns.first()
    }
}

/// Outputs for one [`AggregationRequest`], in the order its aggregations were requested.
#[derive(Clone, Debug, Default)]
pub struct AggregationResult {
    pub results: Vec<AggregationOutput>,
}

impl AggregationResult {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&AggregationOutput> {
        self.results.get(idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn output_types_follow_support_matrix() {
        assert_eq!(
            Aggregation::sum().output_type(DataType::Int32),
            Some(DataType::Int64)
        );
        assert_eq!(
            Aggregation::sum().output_type(DataType::Float32),
            Some(DataType::Float64)
        );
        assert_eq!(Aggregation::sum().output_type(DataType::Utf8), None);
        assert_eq!(
            Aggregation::min().output_type(DataType::Utf8),
            Some(DataType::Utf8)
        );
        assert_eq!(
            Aggregation::count().output_type(DataType::Bool),
            Some(DataType::Int64)
        );
        assert_eq!(Aggregation::mean().output_type(DataType::Bool), None);
        assert_eq!(
            Aggregation::median().output_type(DataType::Int64),
            Some(DataType::Float64)
        );
    }

    #[test]
    fn validate_rejects_bad_fractions() {
        let empty = Aggregation::quantile(Vec::<f64>::new(), Interpolation::Linear);
        assert!(matches!(
            empty.validate(DataType::Float64),
            Err(GroupbyError::InvalidConfiguration(_))
        ));

        let out_of_range = Aggregation::quantile([0.5, 1.5], Interpolation::Lower);
        assert!(matches!(
            out_of_range.validate(DataType::Float64),
            Err(GroupbyError::InvalidConfiguration(_))
        ));

        let nan = Aggregation::quantile([f64::NAN], Interpolation::Lower);
        assert!(nan.validate(DataType::Float64).is_err());
    }

    #[test]
    fn validate_reports_unsupported_kind() {
        assert_eq!(
            Aggregation::mean().validate(DataType::Utf8),
            Err(GroupbyError::UnsupportedAggregation {
                kind: AggregationKind::Mean,
                data_type: DataType::Utf8,
            })
        );
    }

    #[test]
    fn median_is_linear_half_quantile() {
        let binding = Aggregation::median();
        let (qs, interp) = binding.quantile_spec().unwrap();
        assert_eq!(qs, &[0.5]);
        assert_eq!(interp, Interpolation::Linear);
        assert_eq!(Aggregation::median().num_outputs(), 1);
        assert_eq!(
            Aggregation::quantile([0.1, 0.9], Interpolation::Nearest).num_outputs(),
            2
        );
    }

    #[test]
    fn output_without_columns_has_no_first_column() {
        let output = AggregationOutput {
            aggregation: Aggregation::count(),
            columns: Vec::new(),
        };
        assert!(output.column().is_none());

        let output = AggregationOutput {
            aggregation: Aggregation::quantile([0.1, 0.9], Interpolation::Lower),
            columns: vec![Column::new(vec![1.0f64]), Column::new(vec![2.0f64])],
        };
        assert_eq!(output.column().map(Column::len), Some(1));
        assert_eq!(
            output.column().map(|c| c.get(0)),
            Some(crate::types::Value::Float64(1.0))
        );
    }

    #[test]
    fn aggregations_deserialize_from_tagged_json() {
        let parsed: Vec<Aggregation> = serde_json::from_str(
            r#"[{"kind":"sum"},{"kind":"quantile","quantiles":[0.25,0.75],"interpolation":"nearest"},{"kind":"quantile","quantiles":[0.5]}]"#,
        )
        .unwrap();
        assert_eq!(
            parsed,
            vec![
                Aggregation::sum(),
                Aggregation::quantile([0.25, 0.75], Interpolation::Nearest),
                Aggregation::quantile([0.5], Interpolation::Linear),
            ]
        );
    }
}
