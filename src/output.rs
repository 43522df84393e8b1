//! Export of aggregated survey statistics.
//!
//! Supports wide CSV (one row per response), long CSV (one row per question
//! option) and pretty JSON, plus writing any of them to disk.

use anyhow::{Context, Result};
use csv::{Terminator, WriterBuilder};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzers::types::SurveyReport;
use crate::filter::parse_timestamp;
use crate::model::{NormalizedResponse, Question, Survey};

/// Spreadsheet apps need this to read the file as UTF-8.
pub const UTF8_BOM: &str = "\u{FEFF}";

/// Text samples carried by a long-form row for a free-text question.
pub const LONG_FORM_TEXT_SAMPLES: usize = 5;

const NAME_HEADER: &str = "Name";
const SUBMITTED_HEADER: &str = "Submitted At";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsvShape {
    /// One row per response, one column per measured question.
    #[default]
    Wide,
    /// One row per (question, option) pair.
    Long,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ExportFormat {
    #[default]
    Csv,
    CsvLong,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv | ExportFormat::CsvLong => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// Logs a report using Rust's debug pretty-print format.
pub fn print_pretty(report: &SurveyReport) {
    debug!("{:#?}", report);
}

/// Pretty JSON of a retained report.
pub fn to_json(report: &SurveyReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize survey report")
}

/// Collapses line breaks so a question text fits in one header cell.
pub fn sanitize_header(text: &str) -> String {
    text.replace(['\r', '\n'], " ").trim().to_string()
}

/// Renders a submission timestamp as `YYYY-MM-DD HH:MM` (UTC). Values that
/// do not parse are passed through unchanged.
pub fn format_submitted_at(raw: Option<&str>) -> String {
    match raw {
        None => String::new(),
        Some(raw) => parse_timestamp(raw)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| raw.to_string()),
    }
}

/// Turns a title into a file-name stem: runs of characters outside
/// `[A-Za-z0-9_.-]` become a single `_`, and the result is capped at 80
/// characters.
pub fn safe_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out.truncate(80);
    if out.is_empty() {
        "survey".to_string()
    } else {
        out
    }
}

/// `<title or id>_stats.<csv|json>`
pub fn export_file_name(report: &SurveyReport, format: ExportFormat) -> String {
    let base = if report.title.is_empty() {
        &report.survey_id
    } else {
        &report.title
    };
    format!("{}_stats.{}", safe_filename(base), format.extension())
}

fn identity_cell(response: &NormalizedResponse, identity: Option<&Question>) -> String {
    identity
        .and_then(|q| response.answer_for(&q.id))
        .and_then(|a| a.value.elements().first().map(|s| s.to_string()))
        .unwrap_or_default()
}

/// Answer labels for one cell, resolving stored values back to option labels.
fn answer_cell(response: &NormalizedResponse, question: &Question) -> String {
    let Some(answer) = response.answer_for(&question.id) else {
        return String::new();
    };
    answer
        .value
        .elements()
        .into_iter()
        .map(|raw| {
            question
                .resolve_option(raw)
                .map(|o| o.label.as_str())
                .unwrap_or(raw)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Header plus one row per retained response.
pub fn wide_rows(report: &SurveyReport, survey: &Survey) -> Vec<Vec<String>> {
    let identity = survey.identity_question();
    let measured: Vec<&Question> = survey.measured_questions().collect();

    let mut header = vec![NAME_HEADER.to_string(), SUBMITTED_HEADER.to_string()];
    header.extend(measured.iter().enumerate().map(|(idx, q)| {
        let text = sanitize_header(&q.text);
        if text.is_empty() {
            format!("Question {}", idx + 1)
        } else {
            text
        }
    }));

    let mut rows = Vec::with_capacity(report.raw_responses.len() + 1);
    rows.push(header);

    for response in &report.raw_responses {
        let mut line = Vec::with_capacity(measured.len() + 2);
        line.push(identity_cell(response, identity));
        line.push(format_submitted_at(response.created_at.as_deref()));
        line.extend(measured.iter().map(|q| answer_cell(response, q)));
        rows.push(line);
    }

    rows
}

/// One long-form CSV record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongRow {
    pub survey_id: String,
    pub title: String,
    pub question_number: usize,
    pub question_text: String,
    pub question_type: String,
    pub responded_count: usize,
    pub total_responses: usize,
    pub dropoff_rate: u32,
    pub option_label: Option<String>,
    pub option_count: Option<usize>,
    pub option_percent: Option<u32>,
    pub text_samples: Option<String>,
}

/// One row per option of every question, or a single row carrying up to
/// [`LONG_FORM_TEXT_SAMPLES`] answers for questions without options.
pub fn long_rows(report: &SurveyReport) -> Vec<LongRow> {
    let stats = &report.stats;
    let mut rows = Vec::new();

    for q in &stats.questions {
        let base = LongRow {
            survey_id: report.survey_id.clone(),
            title: report.title.clone(),
            question_number: q.number,
            question_text: sanitize_header(&q.text),
            question_type: q.kind.as_str().to_string(),
            responded_count: q.responded_count,
            total_responses: stats.total_responses,
            dropoff_rate: q.dropoff_rate,
            option_label: None,
            option_count: None,
            option_percent: None,
            text_samples: None,
        };

        if q.options.is_empty() {
            let samples: Vec<&str> = q
                .text_answers
                .iter()
                .take(LONG_FORM_TEXT_SAMPLES)
                .map(String::as_str)
                .collect();
            rows.push(LongRow {
                text_samples: Some(samples.join(" | ")),
                ..base
            });
            continue;
        }

        for opt in &q.options {
            rows.push(LongRow {
                option_label: Some(opt.label.clone()),
                option_count: Some(opt.count),
                option_percent: Some(opt.percent),
                ..base.clone()
            });
        }
    }

    rows
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV buffer: {}", e.error()))?;
    let body = String::from_utf8(bytes).context("CSV output is not valid UTF-8")?;
    Ok(format!("{UTF8_BOM}{body}"))
}

/// Renders a report as BOM-prefixed CSV.
///
/// Cells containing a comma, a double quote or a line break are quoted,
/// with inner quotes doubled. Records end with `\n`.
pub fn to_csv(report: &SurveyReport, survey: &Survey, shape: CsvShape) -> Result<String> {
    let mut builder = WriterBuilder::new();
    builder.terminator(Terminator::Any(b'\n'));

    match shape {
        CsvShape::Wide => {
            let mut writer = builder.has_headers(false).from_writer(Vec::new());
            for row in wide_rows(report, survey) {
                writer.write_record(&row)?;
            }
            finish(writer)
        }
        CsvShape::Long => {
            let mut writer = builder.has_headers(true).from_writer(Vec::new());
            for row in long_rows(report) {
                writer.serialize(row)?;
            }
            finish(writer)
        }
    }
}

/// Renders the report in `format` and writes it under `dir`, gzip-compressed
/// with a `.gz` suffix when requested. Returns the written path.
pub fn write_export(
    dir: &Path,
    report: &SurveyReport,
    survey: &Survey,
    format: ExportFormat,
    gzip: bool,
) -> Result<PathBuf> {
    let content = match format {
        ExportFormat::Csv => to_csv(report, survey, CsvShape::Wide)?,
        ExportFormat::CsvLong => to_csv(report, survey, CsvShape::Long)?,
        ExportFormat::Json => to_json(report)?,
    };

    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    let mut file_name = export_file_name(report, format);
    let body = if gzip {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(content.as_bytes())?;
        file_name.push_str(".gz");
        encoder.finish()?
    } else {
        content.into_bytes()
    };

    let path = dir.join(file_name);
    fs::write(&path, &body).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = body.len(), ?format, gzip, "Export written");

    Ok(path)
}
