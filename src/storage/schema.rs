//! Table DDL rendered from the schema registry

use crate::query::builder::{quote_identifier, quote_literal};
use crate::schema::{Column, DefaultValue, EntitySchema};

/// `DROP TABLE IF EXISTS` for an entity
pub fn drop_table_statement(entity: &EntitySchema) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_identifier(entity.name))
}

/// `CREATE TABLE` with types, CHECK ranges, PRIMARY KEY, NOT NULL and defaults
pub fn create_table_statement(entity: &EntitySchema) -> String {
    let columns: Vec<String> = entity.columns.iter().map(column_definition).collect();
    format!("CREATE TABLE {} ({})", quote_identifier(entity.name), columns.join(", "))
}

fn column_definition(column: &Column) -> String {
    let name = quote_identifier(column.name);
    let mut parts = vec![name.clone(), column.column_type.as_sql().to_string()];

    match (column.min, column.max) {
        (Some(min), Some(max)) => parts.push(format!(
            "CHECK({name} >= {} AND {name} <= {})",
            quote_literal(&DefaultValue::Real(min)),
            quote_literal(&DefaultValue::Real(max)),
        )),
        (Some(min), None) => parts.push(format!("CHECK({name} >= {})", quote_literal(&DefaultValue::Real(min)))),
        (None, Some(max)) => parts.push(format!("CHECK({name} <= {})", quote_literal(&DefaultValue::Real(max)))),
        (None, None) => {}
    }

    if column.primary {
        parts.push("PRIMARY KEY".to_string());
    }
    if column.required {
        parts.push("NOT NULL".to_string());
    }
    if let Some(default) = &column.default {
        parts.push(format!("DEFAULT {}", quote_literal(default)));
    }

    parts.join(" ")
}
