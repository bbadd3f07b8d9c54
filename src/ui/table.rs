use serde_json::Value;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

use crate::backend::StoredRecord;

/// Longest cell text before truncation; inline images are long
const MAX_CELL_CHARS: usize = 48;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Collection")]
    pub label: String,
    #[tabled(rename = "Records")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            label: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

fn cell(value: Option<&Value>) -> String {
    let text = match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    };

    if text.chars().count() > MAX_CELL_CHARS {
        let cut: String = text.chars().take(MAX_CELL_CHARS - 1).collect();
        format!("{}…", cut)
    } else {
        text
    }
}

/// Render records with an `id` column followed by `columns`
pub fn record_table(records: &[StoredRecord], columns: &[&str]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let mut builder = Builder::default();
    let mut head = vec!["id".to_string()];
    head.extend(columns.iter().map(|c| c.to_string()));
    builder.push_record(head);

    for record in records {
        let mut row = vec![record.id.clone()];
        row.extend(columns.iter().map(|c| cell(record.fields.get(*c))));
        builder.push_record(row);
    }

    builder.build().with(Style::rounded()).to_string()
}
