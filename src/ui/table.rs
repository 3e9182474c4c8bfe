use tabled::{builder::Builder, settings::Style, Table, Tabled};

use crate::storage::DbStats;
use crate::Row;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Table")]
    pub table: String,
    #[tabled(rename = "Rows")]
    pub rows: usize,
}

/// Per-table row counts, empty tables omitted, with a total
pub fn stats_table(stats: &DbStats) -> String {
    let mut rows: Vec<TableRow> = stats
        .tables
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(table, n)| TableRow { table: table.to_string(), rows: *n })
        .collect();

    if rows.is_empty() {
        return String::new();
    }

    rows.push(TableRow { table: "total".to_string(), rows: stats.total_rows() });
    Table::new(&rows).with(Style::rounded()).to_string()
}

/// Query results, one column per row field, in result column order
pub fn rows_table(rows: &[Row]) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };

    let mut builder = Builder::default();
    builder.push_record(first.columns());
    for row in rows {
        builder.push_record(row.iter().map(|(_, value)| value.to_string()));
    }

    builder.build().with(Style::rounded()).to_string()
}
