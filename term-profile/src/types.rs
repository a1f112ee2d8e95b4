//! Column classification shared by the pattern generalizer and the view engine.

use arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};

/// Coarse class of a column's declared type, resolved once and dispatched with a `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Character data.
    String,
    /// Integers, floats and decimals.
    Numeric,
    /// Dates and timestamps.
    Temporal,
    /// Everything else (booleans, binary, times of day, nested types...).
    Other,
}

impl ColumnKind {
    pub fn of(data_type: &DataType) -> Self {
        match data_type {
            DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => Self::String,
            DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => Self::Temporal,
            DataType::Dictionary(_, value) => Self::of(value),
            t if t.is_numeric() => Self::Numeric,
            _ => Self::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::TimeUnit;

    #[test]
    fn test_column_kind_dispatch() {
        assert_eq!(ColumnKind::of(&DataType::Utf8), ColumnKind::String);
        assert_eq!(ColumnKind::of(&DataType::Utf8View), ColumnKind::String);
        assert_eq!(ColumnKind::of(&DataType::LargeUtf8), ColumnKind::String);
        assert_eq!(ColumnKind::of(&DataType::Int32), ColumnKind::Numeric);
        assert_eq!(ColumnKind::of(&DataType::UInt64), ColumnKind::Numeric);
        assert_eq!(ColumnKind::of(&DataType::Float64), ColumnKind::Numeric);
        assert_eq!(
            ColumnKind::of(&DataType::Decimal128(10, 2)),
            ColumnKind::Numeric
        );
        assert_eq!(ColumnKind::of(&DataType::Date32), ColumnKind::Temporal);
        assert_eq!(
            ColumnKind::of(&DataType::Timestamp(TimeUnit::Microsecond, None)),
            ColumnKind::Temporal
        );
        assert_eq!(ColumnKind::of(&DataType::Boolean), ColumnKind::Other);
        assert_eq!(ColumnKind::of(&DataType::Binary), ColumnKind::Other);
        assert_eq!(
            ColumnKind::of(&DataType::Dictionary(
                Box::new(DataType::Int32),
                Box::new(DataType::Utf8)
            )),
            ColumnKind::String
        );
    }
}
