//! 预览行解码：把 MySQL 结果行转换为按列顺序排列的 JSON 对象

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::{Number, Value};
use sqlx::mysql::MySqlRow;
use sqlx::{Column, Row, TypeInfo, ValueRef};

use common::errors::AppResult;
use common::models::TablePreview;

/// How a column's values are decoded, keyed by the driver's type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Bool,
    Signed,
    Unsigned,
    Float,
    Double,
    Decimal,
    Date,
    Time,
    DateTime,
    Timestamp,
    Json,
    Text,
    Bits,
    Bytes,
}

impl CellKind {
    fn from_type_name(name: &str) -> Self {
        match name {
            "BOOLEAN" => CellKind::Bool,
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => CellKind::Signed,
            n if n.ends_with(" UNSIGNED") => CellKind::Unsigned,
            "FLOAT" => CellKind::Float,
            "DOUBLE" => CellKind::Double,
            "DECIMAL" => CellKind::Decimal,
            "DATE" => CellKind::Date,
            "TIME" => CellKind::Time,
            "DATETIME" => CellKind::DateTime,
            "TIMESTAMP" => CellKind::Timestamp,
            "JSON" => CellKind::Json,
            "CHAR" | "VARCHAR" | "TINYTEXT" | "TEXT" | "MEDIUMTEXT" | "LONGTEXT" | "ENUM"
            | "SET" => CellKind::Text,
            "BIT" => CellKind::Bits,
            _ => CellKind::Bytes,
        }
    }

    fn is_temporal(self) -> bool {
        matches!(
            self,
            CellKind::Date | CellKind::Time | CellKind::DateTime | CellKind::Timestamp
        )
    }
}

/// Converts one result row into a preview, keeping column order.
pub fn row_to_preview(row: &MySqlRow) -> AppResult<TablePreview> {
    let mut preview = TablePreview::new();
    for column in row.columns() {
        let value = decode_cell(row, column.ordinal(), column.type_info().name())?;
        preview.insert(column.name(), value);
    }
    Ok(preview)
}

fn decode_cell(row: &MySqlRow, index: usize, type_name: &str) -> AppResult<Value> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let kind = CellKind::from_type_name(type_name);
    let decoded = decode_typed(row, index, kind);

    match decoded {
        // 零日期（0000-00-00）等无法映射到 chrono 的值按 null 输出
        Err(e) if kind.is_temporal() => {
            tracing::debug!(column = index, type_name, error = %e, "时间值无法解码，按 null 输出");
            Ok(Value::Null)
        }
        other => Ok(other?),
    }
}

fn decode_typed(row: &MySqlRow, index: usize, kind: CellKind) -> Result<Value, sqlx::Error> {
    let value = match kind {
        CellKind::Bool => Value::Bool(row.try_get::<bool, _>(index)?),
        CellKind::Signed => Value::from(row.try_get_unchecked::<i64, _>(index)?),
        CellKind::Unsigned => Value::from(row.try_get_unchecked::<u64, _>(index)?),
        CellKind::Float => float_value(f64::from(row.try_get::<f32, _>(index)?)),
        CellKind::Double => float_value(row.try_get::<f64, _>(index)?),
        CellKind::Decimal | CellKind::Text => {
            Value::String(row.try_get_unchecked::<String, _>(index)?)
        }
        CellKind::Date => Value::String(row.try_get::<NaiveDate, _>(index)?.to_string()),
        CellKind::Time => Value::String(row.try_get::<NaiveTime, _>(index)?.to_string()),
        CellKind::DateTime => Value::String(
            row.try_get::<NaiveDateTime, _>(index)?
                .format("%Y-%m-%dT%H:%M:%S%.f")
                .to_string(),
        ),
        CellKind::Timestamp => {
            Value::String(row.try_get::<DateTime<Utc>, _>(index)?.to_rfc3339())
        }
        CellKind::Json => row.try_get::<Value, _>(index)?,
        CellKind::Bits => Value::from(bits_to_u64(&row.try_get_unchecked::<Vec<u8>, _>(index)?)),
        CellKind::Bytes => bytes_value(row.try_get_unchecked::<Vec<u8>, _>(index)?),
    };
    Ok(value)
}

/// NaN and infinities have no JSON form.
fn float_value(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

/// BIT(n) arrives as big-endian bytes.
fn bits_to_u64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
}

fn bytes_value(bytes: Vec<u8>) -> Value {
    match String::from_utf8(bytes) {
        Ok(s) => Value::String(s),
        Err(e) => Value::String(String::from_utf8_lossy(e.as_bytes()).into_owned()),
    }
}
