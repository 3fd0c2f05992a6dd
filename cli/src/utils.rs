use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use toolshelf_shared::import::ImportRow;

const MAX_CELL_WIDTH: usize = 40;

/// Reads import rows from a JSON array, a `{"rows": [...]}` wrapper, or
/// newline-delimited JSON objects.
pub fn parse_rows(content: &str) -> Result<Vec<ImportRow>> {
    let trimmed = content.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("invalid JSON row array");
    }
    if let Ok(Value::Object(mut wrapper)) = serde_json::from_str::<Value>(trimmed) {
        if let Some(rows) = wrapper.remove("rows") {
            return serde_json::from_value(rows).context("invalid `rows` array");
        }
        return serde_json::from_value(Value::Object(wrapper))
            .map(|row| vec![row])
            .context("invalid JSON row");
    }

    trimmed
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).with_context(|| format!("invalid JSON on line {}", idx + 1))
        })
        .collect()
}

pub fn read_rows_file(path: &Path) -> Result<Vec<ImportRow>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    parse_rows(&content)
}

/// Renders one JSON value as a single table cell.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(cell_text).collect::<Vec<_>>().join(", "),
        other => other.to_string(),
    }
}

fn clip(text: &str, width: usize) -> String {
    let single_line = text.replace(['\n', '\r'], " ");
    if single_line.chars().count() <= width {
        return single_line;
    }
    let mut clipped: String = single_line.chars().take(width.saturating_sub(3)).collect();
    clipped.push_str("...");
    clipped
}

/// Boxed table over `columns`. Missing fields render as empty cells.
pub fn format_table(columns: &[&str], rows: &[Map<String, Value>]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|col| clip(&row.get(*col).map(cell_text).unwrap_or_default(), MAX_CELL_WIDTH))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            cells
                .iter()
                .map(|row| row[idx].chars().count())
                .chain(std::iter::once(col.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let border = format!(
        "+{}+",
        widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    );
    let header: Vec<&str> = columns.to_vec();
    let mut out = vec![border.clone(), table_line(&header, &widths), border.clone()];
    for row in &cells {
        let values: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push(table_line(&values, &widths));
    }
    out.push(border);
    out.join("\n")
}

fn table_line(values: &[&str], widths: &[usize]) -> String {
    let padded = values
        .iter()
        .zip(widths)
        .map(|(value, &width)| format!(" {value:<width$} "))
        .collect::<Vec<_>>()
        .join("|");
    format!("|{padded}|")
}

/// One `key: value` block per row, separated by a star rule.
pub fn format_vertical(rows: &[Map<String, Value>]) -> String {
    let mut output = String::new();
    for (idx, row) in rows.iter().enumerate() {
        output.push_str(&format!(
            "*************************** [{}] ***************************\n",
            idx + 1
        ));
        for (key, value) in row {
            output.push_str(&format!("{key}: {}\n", cell_text(value)));
        }
        output.push('\n');
    }
    if output.is_empty() {
        output.push_str("(no rows)\n");
    }
    output
}

/// Flattens a serializable record into a field map for display.
pub fn to_row<T: serde::Serialize>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value).context("failed to encode row")? {
        Value::Object(map) => Ok(map),
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            Ok(map)
        },
    }
}
