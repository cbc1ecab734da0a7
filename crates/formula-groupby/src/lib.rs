//! Columnar `GROUP BY`.
//!
//! A [`Groupby`] borrows a table of key columns and, per [`Groupby::aggregate`] call, assigns
//! every key row to a group and computes the requested [`Aggregation`]s over value columns of the
//! same length. Every result column has one row per group, in the same group order; the
//! [`GroupLabels`] returned alongside the results materialize the matching unique keys through
//! [`Groupby::groups`].
//!
//! Groups are numbered by first appearance: group 0 contains the lowest surviving key row, and
//! each group is represented by its lowest row. This holds for both the hash path and the
//! pre-sorted path, and does not depend on thread scheduling.
//!
//! Work runs on a [`Stream`] and every buffer the crate produces is charged to a
//! [`MemoryResource`]; both default to process-wide instances.

#![forbid(unsafe_code)]

mod aggregate;
mod aggregation;
mod bitmap;
mod column;
mod comparator;
mod error;
mod group;
mod groupby;
mod labels;
mod memory;
mod stream;
mod table;
mod types;

pub use crate::aggregation::{
    Aggregation, AggregationKind, AggregationOutput, AggregationRequest, AggregationResult,
};
pub use crate::bitmap::Bitmap;
pub use crate::column::{Column, ColumnData, ColumnView};
pub use crate::error::{GroupbyError, Result};
pub use crate::groupby::{Groupby, GroupbyOptions};
pub use crate::labels::GroupLabels;
pub use crate::memory::{
    default_resource, Allocation, DefaultMemoryResource, LimitedMemoryResource, MemoryResource,
    Reservation,
};
pub use crate::stream::Stream;
pub use crate::table::{Table, TableView};
pub use crate::types::{DataType, Interpolation, NullOrder, Order, Value};
