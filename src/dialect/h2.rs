//! H2 adapter.

use super::{Dialect, LogicalType};
use crate::models::Platform;

#[derive(Debug, Clone, Copy, Default)]
pub struct H2Dialect;

impl Dialect for H2Dialect {
    fn platform(&self) -> Platform {
        Platform::H2
    }

    fn column_type(&self, ty: LogicalType) -> String {
        match ty {
            LogicalType::Bool => "boolean".to_string(),
            LogicalType::SmallInt => "smallint".to_string(),
            LogicalType::Integer => "integer".to_string(),
            LogicalType::BigInt => "bigint".to_string(),
            LogicalType::Real => "real".to_string(),
            LogicalType::Double => "double precision".to_string(),
            LogicalType::Decimal { precision, scale } => {
                format!("decimal({},{})", precision, scale)
            }
            LogicalType::Varchar(len) => format!("varchar({})", len),
            LogicalType::Text => "clob".to_string(),
            LogicalType::Binary => "varbinary".to_string(),
            LogicalType::Date => "date".to_string(),
            LogicalType::Time => "time".to_string(),
            LogicalType::Timestamp => "timestamp".to_string(),
            LogicalType::Uuid => "uuid".to_string(),
            LogicalType::Json => "json".to_string(),
        }
    }
}
