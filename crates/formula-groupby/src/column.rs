use crate::bitmap::{self, Bitmap};
use crate::error::{GroupbyError, Result};
use crate::memory::{MemoryResource, Reservation};
use crate::types::{DataType, Value};
use std::sync::Arc;

/// Typed element buffer of a column. Slots covered by a null bit hold an unspecified value.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnData {
    Bool(Vec<bool>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Utf8(Vec<Arc<str>>),
}

impl ColumnData {
    pub fn data_type(&self) -> DataType {
        match self {
            ColumnData::Bool(_) => DataType::Bool,
            ColumnData::Int32(_) => DataType::Int32,
            ColumnData::Int64(_) => DataType::Int64,
            ColumnData::Float32(_) => DataType::Float32,
            ColumnData::Float64(_) => DataType::Float64,
            ColumnData::Utf8(_) => DataType::Utf8,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Bool(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::Float32(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Utf8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn value(&self, row: usize) -> Value {
        match self {
            ColumnData::Bool(v) => Value::Bool(v[row]),
            ColumnData::Int32(v) => Value::Int32(v[row]),
            ColumnData::Int64(v) => Value::Int64(v[row]),
            ColumnData::Float32(v) => Value::Float32(v[row]),
            ColumnData::Float64(v) => Value::Float64(v[row]),
            ColumnData::Utf8(v) => Value::Utf8(v[row].clone()),
        }
    }

    fn gather(&self, rows: &[usize]) -> Result<ColumnData> {
        fn pick<T: Clone>(values: &[T], rows: &[usize]) -> Result<Vec<T>> {
            let mut out = crate::memory::try_vec_with_capacity(rows.len())?;
            out.extend(rows.iter().map(|&r| values[r].clone()));
            Ok(out)
        }

        Ok(match self {
            ColumnData::Bool(v) => ColumnData::Bool(pick(v, rows)?),
            ColumnData::Int32(v) => ColumnData::Int32(pick(v, rows)?),
            ColumnData::Int64(v) => ColumnData::Int64(pick(v, rows)?),
            ColumnData::Float32(v) => ColumnData::Float32(pick(v, rows)?),
            ColumnData::Float64(v) => ColumnData::Float64(pick(v, rows)?),
            ColumnData::Utf8(v) => ColumnData::Utf8(pick(v, rows)?),
        })
    }
}

impl From<Vec<bool>> for ColumnData {
    fn from(values: Vec<bool>) -> Self {
        ColumnData::Bool(values)
    }
}

impl From<Vec<i32>> for ColumnData {
    fn from(values: Vec<i32>) -> Self {
        ColumnData::Int32(values)
    }
}

impl From<Vec<i64>> for ColumnData {
    fn from(values: Vec<i64>) -> Self {
        ColumnData::Int64(values)
    }
}

impl From<Vec<f32>> for ColumnData {
    fn from(values: Vec<f32>) -> Self {
        ColumnData::Float32(values)
    }
}

impl From<Vec<f64>> for ColumnData {
    fn from(values: Vec<f64>) -> Self {
        ColumnData::Float64(values)
    }
}

impl From<Vec<Arc<str>>> for ColumnData {
    fn from(values: Vec<Arc<str>>) -> Self {
        ColumnData::Utf8(values)
    }
}

/// An owned column: typed buffer, optional validity, and the reservation it was charged against
/// (for columns produced by this crate).
#[derive(Clone, Debug)]
pub struct Column {
    data: ColumnData,
    validity: Option<Bitmap>,
    reservation: Option<Arc<Reservation>>,
}

impl Column {
    /// A column without nulls.
    pub fn new(data: impl Into<ColumnData>) -> Self {
        Self {
            data: data.into(),
            validity: None,
            reservation: None,
        }
    }

    pub fn with_validity(data: impl Into<ColumnData>, validity: Bitmap) -> Result<Self> {
        let data = data.into();
        if validity.len() != data.len() {
            return Err(GroupbyError::shape(
                "column validity",
                data.len(),
                validity.len(),
            ));
        }
        // An all-valid bitmap carries no information.
        let validity = (validity.null_count() > 0).then_some(validity);
        Ok(Self {
            data,
            validity,
            reservation: None,
        })
    }

    /// Build a nullable column; `None` entries become nulls.
    pub fn from_options<T>(values: Vec<Option<T>>) -> Self
    where
        T: Default,
        Vec<T>: Into<ColumnData>,
    {
        let validity: Bitmap = values.iter().map(Option::is_some).collect();
        let data: Vec<T> = values.into_iter().map(Option::unwrap_or_default).collect();
        Self::from_parts(data.into(), validity)
    }

    pub fn from_strs(values: &[Option<&str>]) -> Self {
        let validity: Bitmap = values.iter().map(Option::is_some).collect();
        let data: Vec<Arc<str>> = values
            .iter()
            .map(|v| Arc::<str>::from(v.unwrap_or("")))
            .collect();
        Self::from_parts(ColumnData::Utf8(data), validity)
    }

    fn from_parts(data: ColumnData, validity: Bitmap) -> Self {
        debug_assert_eq!(data.len(), validity.len());
        Self {
            data,
            validity: (validity.null_count() > 0).then_some(validity),
            reservation: None,
        }
    }

    pub(crate) fn from_reserved(
        data: ColumnData,
        validity: Option<Bitmap>,
        reservation: Reservation,
    ) -> Self {
        Self {
            data,
            validity: validity.filter(|v| v.null_count() > 0),
            reservation: Some(Arc::new(reservation)),
        }
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn validity(&self) -> Option<&Bitmap> {
        self.validity.as_ref()
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.validity.as_ref().map_or(0, Bitmap::null_count)
    }

    pub fn is_valid(&self, row: usize) -> bool {
        bitmap::is_valid(self.validity.as_ref(), row)
    }

    /// Bytes charged to a memory resource for this column, if it was produced by this crate.
    pub fn reserved_bytes(&self) -> usize {
        self.reservation.as_ref().map_or(0, |r| r.bytes())
    }

    pub fn get(&self, row: usize) -> Value {
        self.view().get(row)
    }

    pub fn to_values(&self) -> Vec<Value> {
        (0..self.len()).map(|row| self.get(row)).collect()
    }

    pub fn view(&self) -> ColumnView<'_> {
        ColumnView {
            data: &self.data,
            validity: self.validity.as_ref(),
        }
    }
}

/// Borrowed, read-only view of a column.
#[derive(Clone, Copy, Debug)]
pub struct ColumnView<'a> {
    data: &'a ColumnData,
    validity: Option<&'a Bitmap>,
}

impl<'a> ColumnView<'a> {
    pub fn data(&self) -> &'a ColumnData {
        self.data
    }

    pub fn validity(&self) -> Option<&'a Bitmap> {
        self.validity
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn has_nulls(&self) -> bool {
        self.validity.is_some_and(|v| v.null_count() > 0)
    }

    pub fn is_valid(&self, row: usize) -> bool {
        bitmap::is_valid(self.validity, row)
    }

    pub fn get(&self, row: usize) -> Value {
        if self.is_valid(row) {
            self.data.value(row)
        } else {
            Value::Null
        }
    }

    /// Copy the given rows into a new column charged against `resource`.
    pub fn gather(&self, rows: &[usize], resource: &Arc<dyn MemoryResource>) -> Result<Column> {
        let mut bytes = rows.len().saturating_mul(self.data_type().byte_width());
        if self.has_nulls() {
            bytes = bytes.saturating_add(Bitmap::byte_len(rows.len()));
        }
        let reservation = Reservation::new(resource, bytes, std::mem::align_of::<u64>())?;
        let data = self.data.gather(rows)?;
        let validity = self
            .validity
            .map(|v| rows.iter().map(|&r| v.is_valid(r)).collect::<Bitmap>());
        Ok(Column::from_reserved(data, validity, reservation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::DefaultMemoryResource;
    use pretty_assertions::assert_eq;

    #[test]
    fn from_options_marks_missing_values_null() {
        let col = Column::from_options(vec![Some(1i64), None, Some(3)]);
        assert_eq!(col.data_type(), DataType::Int64);
        assert_eq!(col.null_count(), 1);
        assert_eq!(
            col.to_values(),
            vec![Value::Int64(1), Value::Null, Value::Int64(3)]
        );
    }

    #[test]
    fn dense_columns_drop_their_bitmap() {
        let col = Column::from_options(vec![Some(1.5f64), Some(2.5)]);
        assert!(col.validity().is_none());
        assert!(!col.view().has_nulls());
    }

    #[test]
    fn with_validity_checks_length() {
        let err = Column::with_validity(vec![1i32, 2, 3], Bitmap::all_valid(2)).unwrap_err();
        assert!(matches!(
            err,
            GroupbyError::ShapeMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn gather_copies_rows_and_nulls() {
        let tracker = Arc::new(DefaultMemoryResource::new());
        let resource: Arc<dyn MemoryResource> = tracker.clone();
        let col = Column::from_strs(&[Some("a"), None, Some("c")]);

        let gathered = col.view().gather(&[2, 1, 2], &resource).unwrap();
        assert_eq!(
            gathered.to_values(),
            vec![
                Value::Utf8(Arc::from("c")),
                Value::Null,
                Value::Utf8(Arc::from("c")),
            ]
        );
        assert!(gathered.reserved_bytes() > 0);
        assert_eq!(tracker.current_bytes(), gathered.reserved_bytes());

        drop(gathered);
        assert_eq!(tracker.current_bytes(), 0);
    }
}
