//! Record-level coercion and validation
//!
//! Maps a parsed CSV record onto the entity's schema: unknown fields are
//! dropped, empty numeric fields are omitted so store defaults apply,
//! coordinates are range checked, and `HH:MM:SS` times gain a parallel
//! seconds-since-midnight column.

use csv::StringRecord;

use crate::schema::{Column, ColumnType, EntitySchema};
use crate::{Error, Record, Result, Value};

const BOM: char = '\u{feff}';

/// Header-driven transformer for one entity file
pub struct RecordTransformer {
    entity: &'static EntitySchema,
    /// Schema column for each header position; `None` for fields the schema lacks
    fields: Vec<Option<&'static Column>>,
    derived: Vec<&'static Column>,
}

impl RecordTransformer {
    pub fn new(entity: &'static EntitySchema, headers: &StringRecord) -> Self {
        let fields = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let name = if idx == 0 { name.trim_start_matches(BOM) } else { name };
                entity.column(name.trim()).filter(|c| !c.internal)
            })
            .collect();

        let derived = entity.columns.iter().filter(|c| c.derived_from.is_some()).collect();

        Self { entity, fields, derived }
    }

    /// Number of header fields mapped onto schema columns
    pub fn known_fields(&self) -> usize {
        self.fields.iter().flatten().count()
    }

    /// Transform one record found on `line` of the entity's file
    pub fn transform(&self, record: &StringRecord, line: u64) -> Result<Record> {
        let mut out = Record::new();

        for (column, raw) in self.fields.iter().zip(record.iter()) {
            let Some(column) = column else {
                continue;
            };
            if let Some(value) = self.coerce(column, raw.trim(), line)? {
                out.insert(column.name, value);
            }
        }

        for column in &self.derived {
            let source = column.derived_from.and_then(|name| out.get(name)).and_then(Value::as_str);
            if let Some(seconds) = source.and_then(seconds_since_midnight) {
                out.insert(column.name, Value::Integer(seconds));
            }
        }

        Ok(out)
    }

    fn coerce(&self, column: &Column, raw: &str, line: u64) -> Result<Option<Value>> {
        let value = match column.column_type {
            ColumnType::Text => return Ok(Some(Value::Text(raw.to_string()))),
            _ if raw.is_empty() => return Ok(None),
            ColumnType::Integer => parse_integer(raw).map(Value::Integer),
            ColumnType::Real => parse_real(raw).map(Value::Real),
        };

        let Some(value) = value else {
            return Err(self.invalid(column, line, format!("{raw:?} is not a number")));
        };

        if let (Some(axis), Some(degrees)) = (column.coordinate, value.as_f64()) {
            let (min, max) = axis.bounds();
            if degrees < min || degrees > max {
                return Err(self.invalid(
                    column,
                    line,
                    format!("{} {degrees} outside [{min}, {max}]", axis.as_str()),
                ));
            }
        }

        Ok(Some(value))
    }

    fn invalid(&self, column: &Column, line: u64, reason: String) -> Error {
        Error::Validation {
            file: self.entity.filename(),
            field: column.name.to_string(),
            line,
            reason,
        }
    }
}

/// Integers accept a fractional form and truncate it (`"1.0"` → 1)
fn parse_integer(raw: &str) -> Option<i64> {
    raw.parse::<i64>()
        .ok()
        .or_else(|| parse_real(raw).map(|f| f.trunc() as i64))
}

fn parse_real(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// `HH:MM:SS` to seconds; hours may exceed 24 for trips past midnight
pub fn seconds_since_midnight(time: &str) -> Option<i64> {
    let parts: Vec<&str> = time.split(':').collect();
    let [h, m, s] = parts.as_slice() else {
        return None;
    };
    let h: i64 = h.trim().parse().ok()?;
    let m: i64 = m.trim().parse().ok()?;
    let s: i64 = s.trim().parse().ok()?;
    h.checked_mul(3600)?.checked_add(m.checked_mul(60)?)?.checked_add(s)
}
