//! Binlog value rendering
//!
//! Row images reach the reconstruction engine as plain strings. Quoting is
//! decided later from the string alone, so the rendering here must produce
//! the textual form MySQL itself would accept for the column.

use anyhow::{anyhow, bail, Result};
use binlog_core::RowImage;
use mysql_async::binlog::row::BinlogRow;
use mysql_async::binlog::value::BinlogValue;
use mysql_async::Value;

/// Text form of every value present in `row`, in column order.
pub fn row_image(row: &BinlogRow) -> Result<RowImage> {
    (0..row.len())
        .filter_map(|index| row.as_ref(index))
        .map(binlog_value_to_string)
        .collect()
}

/// Text form of one binlog value.
///
/// JSON columns are rendered as JSON text. Partial JSON updates only
/// describe a diff against the stored document and cannot be rendered.
pub fn binlog_value_to_string(value: &BinlogValue<'_>) -> Result<String> {
    match value {
        BinlogValue::Value(value) => Ok(value_to_string(value)),
        BinlogValue::Jsonb(json) => {
            let json = serde_json::Value::try_from(json.clone())
                .map_err(|e| anyhow!("Failed to convert binary JSON column value: {e:?}"))?;
            Ok(json.to_string())
        }
        BinlogValue::JsonDiff(_) => bail!(
            "Partial JSON update cannot be rendered as a column value; \
             set binlog_row_value_options to an empty value on the server"
        ),
    }
}

/// Text form of one protocol value.
///
/// `NULL` becomes the literal string `NULL`.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::NULL => "NULL".to_string(),
        Value::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Value::Int(i) => i.to_string(),
        Value::UInt(u) => u.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Double(d) => d.to_string(),
        Value::Date(year, month, day, hour, min, sec, micro) => {
            let date = format!("{year:04}-{month:02}-{day:02}");
            if (*hour, *min, *sec, *micro) == (0, 0, 0, 0) {
                date
            } else if *micro == 0 {
                format!("{date} {hour:02}:{min:02}:{sec:02}")
            } else {
                format!("{date} {hour:02}:{min:02}:{sec:02}.{micro:06}")
            }
        }
        Value::Time(negative, days, hour, min, sec, micro) => {
            let sign = if *negative { "-" } else { "" };
            let hours = u64::from(*days) * 24 + u64::from(*hour);
            if *micro == 0 {
                format!("{sign}{hours:02}:{min:02}:{sec:02}")
            } else {
                format!("{sign}{hours:02}:{min:02}:{sec:02}.{micro:06}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mysql_async::binlog::jsonb::{JsonbString, Value as JsonbValue};

    #[test]
    fn test_scalar_values() {
        assert_eq!(value_to_string(&Value::NULL), "NULL");
        assert_eq!(value_to_string(&Value::Int(-42)), "-42");
        assert_eq!(value_to_string(&Value::UInt(7)), "7");
        assert_eq!(value_to_string(&Value::Double(12.5)), "12.5");
        assert_eq!(value_to_string(&Value::Bytes(b"bob".to_vec())), "bob");
    }

    #[test]
    fn test_date_and_datetime() {
        assert_eq!(
            value_to_string(&Value::Date(2024, 5, 20, 0, 0, 0, 0)),
            "2024-05-20"
        );
        assert_eq!(
            value_to_string(&Value::Date(2024, 5, 20, 8, 30, 5, 0)),
            "2024-05-20 08:30:05"
        );
        assert_eq!(
            value_to_string(&Value::Date(2024, 5, 20, 8, 30, 5, 120)),
            "2024-05-20 08:30:05.000120"
        );
    }

    #[test]
    fn test_time_folds_days_into_hours() {
        assert_eq!(value_to_string(&Value::Time(false, 0, 9, 5, 0, 0)), "09:05:00");
        assert_eq!(
            value_to_string(&Value::Time(true, 1, 2, 0, 0, 0)),
            "-26:00:00"
        );
    }

    #[test]
    fn test_binlog_value_wraps_protocol_value() {
        let value = BinlogValue::Value(Value::Int(1));
        assert_eq!(binlog_value_to_string(&value).unwrap(), "1");
    }

    #[test]
    fn test_json_string_is_quoted_json() {
        let value = BinlogValue::Jsonb(JsonbValue::String(JsonbString::new(b"hello")));
        assert_eq!(binlog_value_to_string(&value).unwrap(), "\"hello\"");
    }

    #[test]
    fn test_partial_json_update_is_rejected() {
        let value = BinlogValue::JsonDiff(Vec::new());
        let err = binlog_value_to_string(&value).unwrap_err();
        assert!(err.to_string().contains("Partial JSON update"));
    }
}
