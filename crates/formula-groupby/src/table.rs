use crate::column::{Column, ColumnView};
use crate::error::{GroupbyError, Result};
use crate::types::{DataType, Value};

fn check_row_counts(lens: impl Iterator<Item = usize>) -> Result<usize> {
    let mut rows = None;
    for (idx, len) in lens.enumerate() {
        match rows {
            None => rows = Some(len),
            Some(expected) if expected != len => {
                return Err(GroupbyError::shape(format!("table column {idx}"), expected, len));
            }
            Some(_) => {}
        }
    }
    Ok(rows.unwrap_or(0))
}

/// An owned set of equally sized columns.
#[derive(Clone, Debug)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let rows = check_row_counts(columns.iter().map(Column::len))?;
        Ok(Self { columns, rows })
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, idx: usize) -> Option<&Column> {
        self.columns.get(idx)
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn schema(&self) -> Vec<DataType> {
        self.columns.iter().map(Column::data_type).collect()
    }

    pub fn view(&self) -> TableView<'_> {
        TableView {
            columns: self.columns.iter().map(Column::view).collect(),
            rows: self.rows,
        }
    }

    /// Materialize row `row` across every column.
    pub fn row(&self, row: usize) -> Vec<Value> {
        self.columns.iter().map(|c| c.get(row)).collect()
    }

    /// Column-major cell values, for inspection and tests.
    pub fn to_values(&self) -> Vec<Vec<Value>> {
        self.columns.iter().map(Column::to_values).collect()
    }
}

/// Borrowed, read-only set of equally sized column views.
///
/// The view does not own its columns; everything built from it (a
/// [`Groupby`](crate::Groupby) included) is bounded by the lifetime of the borrowed data.
#[derive(Clone, Debug)]
pub struct TableView<'a> {
    columns: Vec<ColumnView<'a>>,
    rows: usize,
}

impl<'a> TableView<'a> {
    pub fn new(columns: Vec<ColumnView<'a>>) -> Result<Self> {
        let rows = check_row_counts(columns.iter().map(ColumnView::len))?;
        Ok(Self { columns, rows })
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[ColumnView<'a>] {
        &self.columns
    }

    pub fn column(&self, idx: usize) -> Option<ColumnView<'a>> {
        self.columns.get(idx).copied()
    }

    pub fn schema(&self) -> Vec<DataType> {
        self.columns.iter().map(ColumnView::data_type).collect()
    }

    /// True when any column in `row` is null.
    pub fn row_has_null(&self, row: usize) -> bool {
        self.columns.iter().any(|c| !c.is_valid(row))
    }

    pub fn has_nulls(&self) -> bool {
        self.columns.iter().any(ColumnView::has_nulls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_ragged_columns() {
        let err = Table::new(vec![
            Column::new(vec![1i32, 2, 3]),
            Column::new(vec![1i32, 2]),
        ])
        .unwrap_err();
        assert_eq!(err, GroupbyError::shape("table column 1", 3, 2));
    }

    #[test]
    fn view_reports_null_rows() {
        let table = Table::new(vec![
            Column::new(vec![1i32, 2, 3]),
            Column::from_options(vec![Some(1.0f64), None, Some(3.0)]),
        ])
        .unwrap();
        let view = table.view();
        assert_eq!(view.num_rows(), 3);
        assert_eq!(view.schema(), vec![DataType::Int32, DataType::Float64]);
        assert!(view.row_has_null(1));
        assert!(!view.row_has_null(2));
        assert_eq!(table.row(1), vec![Value::Int32(2), Value::Null]);
    }

    #[test]
    fn empty_table_has_zero_rows() {
        let table = Table::new(Vec::new()).unwrap();
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.view().num_columns(), 0);
    }
}
