use crate::aggregate;
use crate::aggregation::{AggregationOutput, AggregationRequest, AggregationResult};
use crate::error::{GroupbyError, Result};
use crate::group::{self, GroupIndex, GroupingPlan};
use crate::labels::GroupLabels;
use crate::memory::{default_resource, MemoryResource};
use crate::stream::Stream;
use crate::table::{Table, TableView};
use crate::types::{NullOrder, Order};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

fn next_context_id() -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

/// Grouping configuration.
///
/// `column_order` and `null_precedence` only matter when `keys_are_sorted` is set; each is either
/// empty (every column ascending, nulls before) or has one entry per key column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupbyOptions {
    /// Drop rows with a null in any key column from every group.
    pub ignore_null_keys: bool,
    /// Equal key tuples are contiguous in the keys table.
    pub keys_are_sorted: bool,
    pub column_order: Vec<Order>,
    pub null_precedence: Vec<NullOrder>,
}

impl Default for GroupbyOptions {
    fn default() -> Self {
        Self {
            ignore_null_keys: true,
            keys_are_sorted: false,
            column_order: Vec::new(),
            null_precedence: Vec::new(),
        }
    }
}

impl GroupbyOptions {
    pub fn ignore_null_keys(mut self, ignore: bool) -> Self {
        self.ignore_null_keys = ignore;
        self
    }

    pub fn keys_are_sorted(mut self, sorted: bool) -> Self {
        self.keys_are_sorted = sorted;
        self
    }

    pub fn column_order(mut self, order: impl Into<Vec<Order>>) -> Self {
        self.column_order = order.into();
        self
    }

    pub fn null_precedence(mut self, precedence: impl Into<Vec<NullOrder>>) -> Self {
        self.null_precedence = precedence.into();
        self
    }
}

/// A grouping of borrowed key columns.
///
/// The context is immutable: every [`aggregate`](Self::aggregate) call identifies groups afresh
/// and returns its own [`GroupLabels`]. The keys must outlive the context.
#[derive(Debug)]
pub struct Groupby<'a> {
    id: u64,
    keys: TableView<'a>,
    options: GroupbyOptions,
}

impl<'a> Groupby<'a> {
    pub fn new(keys: TableView<'a>, options: GroupbyOptions) -> Result<Self> {
        let columns = keys.num_columns();
        if columns == 0 {
            return Err(GroupbyError::config("groupby requires at least one key column"));
        }
        if !options.column_order.is_empty() && options.column_order.len() != columns {
            return Err(GroupbyError::config(format!(
                "column_order has {} entries for {columns} key columns",
                options.column_order.len()
            )));
        }
        if !options.null_precedence.is_empty() && options.null_precedence.len() != columns {
            return Err(GroupbyError::config(format!(
                "null_precedence has {} entries for {columns} key columns",
                options.null_precedence.len()
            )));
        }
        Ok(Self {
            id: next_context_id(),
            keys,
            options,
        })
    }

    pub fn keys(&self) -> &TableView<'a> {
        &self.keys
    }

    pub fn options(&self) -> &GroupbyOptions {
        &self.options
    }

    /// [`aggregate_with`](Self::aggregate_with) on the default stream and memory resource.
    pub fn aggregate(
        &self,
        requests: &[AggregationRequest<'_>],
    ) -> Result<(GroupLabels, Vec<AggregationResult>)> {
        self.aggregate_with(requests, Stream::default_stream(), &default_resource())
    }

    /// Group the keys once and run every requested aggregation over those groups.
    ///
    /// Returns one [`AggregationResult`] per request, in request order. All result columns have
    /// one row per group, and row `g` refers to the same group in every one of them. The call is
    /// all-or-nothing: shapes and aggregation/type support are checked for every request before
    /// any work is done, and any later failure discards everything computed so far.
    pub fn aggregate_with(
        &self,
        requests: &[AggregationRequest<'_>],
        stream: &Stream,
        resource: &Arc<dyn MemoryResource>,
    ) -> Result<(GroupLabels, Vec<AggregationResult>)> {
        let rows = self.keys.num_rows();
        for (idx, request) in requests.iter().enumerate() {
            if request.values.len() != rows {
                return Err(GroupbyError::shape(
                    format!("request {idx}"),
                    rows,
                    request.values.len(),
                ));
            }
        }
        for request in requests {
            for aggregation in &request.aggregations {
                aggregation.validate(request.values.data_type())?;
            }
        }

        log::debug!(
            "groupby {}: {} requests ({} aggregations) over {rows} rows",
            self.id,
            requests.len(),
            requests.iter().map(|r| r.aggregations.len()).sum::<usize>(),
        );

        let plan = GroupingPlan {
            ignore_null_keys: self.options.ignore_null_keys,
            keys_are_sorted: self.options.keys_are_sorted,
            column_order: &self.options.column_order,
            null_precedence: &self.options.null_precedence,
        };
        let assignment = group::identify(&self.keys, plan, stream, resource)?;
        let index = GroupIndex::build(&assignment, resource)?;

        let results = requests
            .iter()
            .map(|request| {
                let results = request
                    .aggregations
                    .iter()
                    .map(|aggregation| {
                        let columns = aggregate::compute(
                            request.values,
                            aggregation,
                            &index,
                            stream,
                            resource,
                        )?;
                        Ok(AggregationOutput {
                            aggregation: aggregation.clone(),
                            columns,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(AggregationResult { results })
            })
            .collect::<Result<Vec<_>>>()?;
        stream.synchronize();

        Ok((GroupLabels::new(self.id, assignment), results))
    }

    /// [`groups_with`](Self::groups_with) on the default stream and memory resource.
    pub fn groups(&self, labels: GroupLabels) -> Result<Table> {
        self.groups_with(labels, Stream::default_stream(), &default_resource())
    }

    /// The unique key tuples, one row per group in group order.
    ///
    /// Row `g` holds the key tuple of group `g` of the `aggregate` call that produced `labels`.
    /// Labels produced by a different context are rejected with [`GroupbyError::HandleMisuse`].
    pub fn groups_with(
        &self,
        labels: GroupLabels,
        stream: &Stream,
        resource: &Arc<dyn MemoryResource>,
    ) -> Result<Table> {
        if labels.context_id != self.id {
            return Err(GroupbyError::HandleMisuse(format!(
                "labels were produced by groupby {}, not groupby {}",
                labels.context_id, self.id
            )));
        }
        let representatives = labels.representatives();
        log::debug!(
            "groupby {}: materializing {} unique keys on stream {}",
            self.id,
            representatives.len(),
            stream.id()
        );

        let columns = self
            .keys
            .columns()
            .iter()
            .map(|column| column.gather(representatives, resource))
            .collect::<Result<Vec<_>>>()?;
        stream.synchronize();
        Table::new(columns)
    }
}
