use std::path::Path;

use crate::config::RowLayout;
use crate::foundation::error::{CueError, CueResult};

/// One cell of a raw input row.
#[derive(Clone, Debug, PartialEq)]
pub enum RowCell {
    /// A numeric cell.
    Number(f64),
    /// A text cell, untrimmed.
    Text(String),
    /// Missing, null or blank.
    Empty,
}

impl RowCell {
    /// Interpret the cell as a finite number, parsing text cells.
    ///
    /// Returns `None` for anything that is not a finite number, mirroring a spreadsheet's
    /// "coerce or give up" numeric conversion.
    pub fn as_number(&self) -> Option<f64> {
        let v = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
            Self::Empty => return None,
        };
        v.is_finite().then_some(v)
    }

    /// Interpret the cell as a non-empty label.
    pub fn as_label(&self) -> Option<String> {
        match self {
            Self::Number(n) if !n.is_finite() => None,
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Self::Number(n) => Some(n.to_string()),
            Self::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_owned())
            }
            Self::Empty => None,
        }
    }
}

/// A positional row as produced by the tabular reader.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawRow(pub Vec<RowCell>);

impl RawRow {
    /// Cell at `col`, or [`RowCell::Empty`] past the end of a short row.
    pub fn cell(&self, col: usize) -> &RowCell {
        self.0.get(col).unwrap_or(&RowCell::Empty)
    }
}

/// The three cue fields projected out of a raw row.
#[derive(Clone, Debug, PartialEq)]
pub struct CueFields<'a> {
    pub minutes: &'a RowCell,
    pub seconds: &'a RowCell,
    pub label: &'a RowCell,
}

impl RowLayout {
    /// Skip the header rows and project the minutes/seconds/label cells of the rest.
    pub fn project(self, rows: &[RawRow]) -> impl Iterator<Item = CueFields<'_>> {
        rows.iter().skip(self.skip_rows).map(move |row| CueFields {
            minutes: row.cell(self.minutes_col),
            seconds: row.cell(self.seconds_col),
            label: row.cell(self.label_col),
        })
    }
}

/// Read raw rows from a `.json` or tab-separated (`.tsv`, `.tab`, `.txt`) file.
pub fn read_rows(path: &Path) -> CueResult<Vec<RawRow>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CueError::input(format!("failed to read '{}': {e}", path.display())))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "json" => parse_json_rows(&text),
        "tsv" | "tab" | "txt" => Ok(parse_tsv_rows(&text)),
        other => Err(CueError::input(format!(
            "unsupported cue table format '.{other}' (expected .json or .tsv)"
        ))),
    }
}

/// Parse a JSON array of rows, each an array of scalar cells.
pub fn parse_json_rows(text: &str) -> CueResult<Vec<RawRow>> {
    let doc: Vec<Vec<serde_json::Value>> = serde_json::from_str(text)
        .map_err(|e| CueError::input(format!("cue table json must be an array of arrays: {e}")))?;

    let mut rows = Vec::with_capacity(doc.len());
    for (r, cells) in doc.into_iter().enumerate() {
        let mut row = Vec::with_capacity(cells.len());
        for (c, value) in cells.into_iter().enumerate() {
            let cell = match value {
                serde_json::Value::Null => RowCell::Empty,
                serde_json::Value::Number(n) => n.as_f64().map_or(RowCell::Empty, RowCell::Number),
                serde_json::Value::String(s) => RowCell::Text(s),
                serde_json::Value::Bool(b) => RowCell::Text(b.to_string()),
                serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                    return Err(CueError::input(format!(
                        "cue table cell at row {r}, column {c} is not a scalar"
                    )));
                }
            };
            row.push(cell);
        }
        rows.push(RawRow(row));
    }
    Ok(rows)
}

/// Parse tab-separated text, one row per line. Blank cells become [`RowCell::Empty`].
pub fn parse_tsv_rows(text: &str) -> Vec<RawRow> {
    text.lines()
        .map(|line| {
            RawRow(
                line.trim_end_matches('\r')
                    .split('\t')
                    .map(|cell| {
                        if cell.trim().is_empty() {
                            RowCell::Empty
                        } else {
                            RowCell::Text(cell.to_owned())
                        }
                    })
                    .collect(),
            )
        })
        .collect()
}
