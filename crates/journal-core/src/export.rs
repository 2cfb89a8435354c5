//! Tabular export of manuscript state
//!
//! A report is an ordered list of columns and one JSON object per row. The
//! CSV renderer looks each column's key up in the row; missing and null
//! values become empty cells.

use serde_json::{Map, Value};
use tracing::debug;

use crate::access::{authorize, Actor, Operation};
use crate::error::{Result, StorageError};
use crate::journal::Journal;
use crate::manuscript::{Manuscript, ManuscriptFilter};

/// One output column: header text and the row key it reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportColumn {
    pub header: &'static str,
    pub key: &'static str,
}

/// Columns of the manuscript report
pub const MANUSCRIPT_COLUMNS: &[ExportColumn] = &[
    ExportColumn { header: "Paper ID", key: "id" },
    ExportColumn { header: "Title", key: "title" },
    ExportColumn { header: "Author", key: "author_id" },
    ExportColumn { header: "Editor", key: "editor_id" },
    ExportColumn { header: "Status", key: "status" },
    ExportColumn { header: "Submission Date", key: "submission_date" },
];

pub type Row = Map<String, Value>;

/// A report ready for rendering
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub columns: &'static [ExportColumn],
    pub rows: Vec<Row>,
}

impl Report {
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        render_csv(self.columns, &self.rows)
    }
}

/// Flatten a manuscript into a report row
pub fn manuscript_row(manuscript: &Manuscript) -> Result<Row> {
    match serde_json::to_value(manuscript)? {
        Value::Object(row) => Ok(row),
        other => Err(StorageError::Serialization(format!(
            "manuscript serialized as {} instead of an object",
            other
        ))
        .into()),
    }
}

/// Render columns and rows as CSV with a header line
pub fn render_csv(columns: &[ExportColumn], rows: &[Row]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(columns.iter().map(|c| c.header))
        .map_err(StorageError::from)?;

    for row in rows {
        writer
            .write_record(columns.iter().map(|c| cell(row.get(c.key))))
            .map_err(StorageError::from)?;
    }

    writer
        .into_inner()
        .map_err(|e| StorageError::Io(e.to_string()).into())
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

impl Journal {
    /// Every manuscript regardless of status; editors only
    pub fn export_report(&self, actor: &Actor) -> Result<Report> {
        authorize(actor, Operation::ExportReport)?;

        let rows = self
            .repository
            .manuscripts(ManuscriptFilter::All)?
            .iter()
            .map(manuscript_row)
            .collect::<Result<Vec<_>>>()?;

        debug!(rows = rows.len(), "Manuscript report");
        Ok(Report {
            columns: MANUSCRIPT_COLUMNS,
            rows,
        })
    }
}
