//! Result aggregation and tabular export.
//!
//! The table is append-only: every enumerated request contributes exactly one
//! row, including requests whose generation or scoring failed. Finalizing
//! sorts rows back into enumeration order so parallel runs export the same
//! table as sequential ones.

pub mod charts;
pub mod summary;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::config::OutputPolicy;
use crate::error::SweepError;
use crate::metrics::TextMetrics;
use crate::scorer::ScoreRecord;
use crate::sweep::{EvaluationRequest, GeneratedResponse};

/// One finalized record per evaluation request.
#[derive(Debug, Clone)]
pub struct ResultRow {
    pub index: usize,
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub response: String,
    pub score: ScoreRecord,
    pub word_count: usize,
    pub sentence_count: usize,
    pub latency_ms: u128,
    /// Error marker when generation degraded; empty response accompanies it.
    pub error: Option<String>,
}

impl ResultRow {
    /// Joins the stage outputs for one request into a row.
    pub fn record(
        request: EvaluationRequest,
        response: GeneratedResponse,
        score: ScoreRecord,
        metrics: TextMetrics,
    ) -> Self {
        Self {
            index: request.index,
            prompt: request.prompt,
            model: request.model,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response: response.text,
            score,
            word_count: metrics.word_count,
            sentence_count: metrics.sentence_count,
            latency_ms: response.latency_ms,
            error: response.error,
        }
    }
}

/// Append-only collection of result rows for one sweep.
#[derive(Debug)]
pub struct ResultTable {
    rows: Vec<ResultRow>,
    /// Column name for the third scoring criterion.
    third_criterion: String,
}

impl ResultTable {
    pub fn new(third_criterion: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            third_criterion: third_criterion.into(),
        }
    }

    pub fn push(&mut self, row: ResultRow) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// Restores enumeration order regardless of completion order.
    pub fn finalize(&mut self) {
        self.rows.sort_by_key(|r| r.index);
    }

    fn header(&self) -> String {
        format!(
            "index,prompt,model,temperature,max_tokens,response,clarity,specificity,{},comments,parse_succeeded,word_count,sentence_count,latency_ms,error",
            self.third_criterion.to_lowercase()
        )
    }

    /// Serializes the table as delimited text.
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.header());
        out.push('\n');
        for row in &self.rows {
            let fields = [
                row.index.to_string(),
                csv_escape(&row.prompt),
                csv_escape(&row.model),
                row.temperature.to_string(),
                row.max_tokens.to_string(),
                csv_escape(&row.response),
                optional_score(row.score.clarity),
                optional_score(row.score.specificity),
                optional_score(row.score.third_criterion),
                csv_escape(row.score.comments.as_deref().unwrap_or("")),
                row.score.parse_succeeded.to_string(),
                row.word_count.to_string(),
                row.sentence_count.to_string(),
                row.latency_ms.to_string(),
                csv_escape(row.error.as_deref().unwrap_or("")),
            ];
            out.push_str(&fields.join(","));
            out.push('\n');
        }
        out
    }

    /// Writes the table to `path` under the configured policy.
    ///
    /// `Append` skips the header when the file already has content. A write
    /// failure is fatal at this point; the in-memory table stays available to
    /// the caller for retry.
    pub fn write_csv(&self, path: impl AsRef<Path>, policy: OutputPolicy) -> Result<(), SweepError> {
        let path = path.as_ref();
        let existing_len = match policy {
            OutputPolicy::Overwrite => 0,
            OutputPolicy::Append => path.metadata().map(|m| m.len()).unwrap_or(0),
        };

        let mut options = OpenOptions::new();
        options.write(true).create(true);
        match policy {
            OutputPolicy::Overwrite => options.truncate(true),
            OutputPolicy::Append => options.append(true),
        };
        let mut file = options.open(path)?;

        let csv = self.to_csv();
        let body = if existing_len > 0 {
            // Header already present from a previous run.
            csv.split_once('\n').map(|(_, rest)| rest).unwrap_or("")
        } else {
            &csv
        };
        file.write_all(body.as_bytes())?;
        file.flush()?;
        log::info!(
            "exported {} rows to {} at {}",
            self.rows.len(),
            path.display(),
            chrono::Utc::now().to_rfc3339()
        );
        Ok(())
    }
}

fn optional_score(score: Option<u8>) -> String {
    score.map(|s| s.to_string()).unwrap_or_default()
}

/// RFC 4180 style quoting: quote fields containing delimiters, quotes, or
/// line breaks, doubling embedded quotes.
fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
