// Comparison report generation: JSON, CSV, HTML and a terminal summary

use crate::compare::{ComparisonRow, RowBody};
use crate::error::{BenchError, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const JSON_ARTIFACT: &str = "comparison_report.json";
pub const CSV_ARTIFACT: &str = "comparison_report.csv";
pub const HTML_ARTIFACT: &str = "comparison_report.html";

pub const CSV_COLUMNS: [&str; 7] = [
    "pipeline",
    "pages_total",
    "pages_ok",
    "tokens_total",
    "avg_noise_ratio",
    "throughput_pages_per_sec",
    "top_failures",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
    Html,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            "html" | "htm" => Some(ReportFormat::Html),
            _ => None,
        }
    }

    pub fn render(&self, rows: &[ComparisonRow]) -> Result<String> {
        match self {
            ReportFormat::Text => Ok(generate_text_report(rows)),
            ReportFormat::Json => generate_json_report(rows),
            ReportFormat::Csv => generate_csv_report(rows),
            ReportFormat::Html => Ok(generate_html_report(rows)),
        }
    }
}

/// Pretty JSON array of rows. Carries no timestamps, so equal rows give equal bytes.
pub fn generate_json_report(rows: &[ComparisonRow]) -> Result<String> {
    let mut json = serde_json::to_string_pretty(rows)?;
    json.push('\n');
    Ok(json)
}

pub fn generate_csv_report(rows: &[ComparisonRow]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_COLUMNS)?;

    for row in rows {
        match row.body {
            RowBody::Metrics(ref m) => writer.write_record([
                row.pipeline.clone(),
                m.pages_total.to_string(),
                m.pages_ok.to_string(),
                m.tokens_total.to_string(),
                m.avg_noise_ratio.to_string(),
                m.throughput_pages_per_sec.to_string(),
                serde_json::to_string(&m.top_failures)?,
            ])?,
            // Error text lives in the JSON and HTML reports; here only the name survives
            RowBody::Error { .. } => writer.write_record([
                row.pipeline.clone(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ])?,
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| BenchError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| BenchError::Config(format!("non UTF-8 CSV output: {}", e)))
}

pub fn generate_html_report(rows: &[ComparisonRow]) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset='utf-8'>\n");
    html.push_str("<title>Siftbench comparison</title>\n");
    html.push_str(
        "<style>body{font-family:sans-serif}table{border-collapse:collapse}\
         th,td{border:1px solid #ccc;padding:4px 8px}td.err{background:#fdd;color:#900}</style>\n",
    );
    html.push_str("</head>\n<body>\n<h1>Extraction pipeline comparison</h1>\n");
    html.push_str(&format!(
        "<p>Generated {}</p>\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));

    html.push_str("<table>\n<tr>");
    for column in CSV_COLUMNS {
        html.push_str(&format!("<th>{}</th>", column));
    }
    html.push_str("</tr>\n");

    for row in rows {
        html.push_str(&format!("<tr><td>{}</td>", escape_html(&row.pipeline)));
        match row.body {
            RowBody::Metrics(ref m) => {
                let failures = m
                    .top_failures
                    .iter()
                    .map(|(label, count)| format!("{}: {}", escape_html(label), count))
                    .collect::<Vec<_>>()
                    .join("<br>");
                html.push_str(&format!(
                    "<td>{}</td><td>{}</td><td>{}</td><td>{:.3}</td><td>{:.2}</td><td>{}</td>",
                    m.pages_total,
                    m.pages_ok,
                    m.tokens_total,
                    m.avg_noise_ratio,
                    m.throughput_pages_per_sec,
                    failures
                ));
            }
            RowBody::Error { ref error } => {
                html.push_str(&format!(
                    "<td colspan='{}' class='err'>{}</td>",
                    CSV_COLUMNS.len() - 1,
                    escape_html(error)
                ));
            }
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</table>\n</body>\n</html>\n");
    html
}

pub fn generate_text_report(rows: &[ComparisonRow]) -> String {
    let mut report = String::new();
    let rule = "━".repeat(80);

    report.push_str(&format!("{}\n", rule));
    report.push_str("                     SIFTBENCH PIPELINE COMPARISON\n");
    report.push_str(&format!("{}\n\n", rule));

    if rows.is_empty() {
        report.push_str("No pipelines configured.\n");
        return report;
    }

    report.push_str(&format!(
        "{:<20} {:>7} {:>7} {:>10} {:>7} {:>9}\n",
        "PIPELINE", "PAGES", "OK", "TOKENS", "NOISE", "PAGES/S"
    ));
    report.push_str(&format!("{}\n", "─".repeat(80)));

    for row in rows {
        match row.body {
            RowBody::Metrics(ref m) => {
                report.push_str(&format!(
                    "{:<20} {:>7} {:>7} {:>10} {:>7.3} {:>9.2}\n",
                    row.pipeline.green(),
                    m.pages_total,
                    m.pages_ok,
                    m.tokens_total,
                    m.avg_noise_ratio,
                    m.throughput_pages_per_sec
                ));
                for (label, count) in m.top_failures.iter() {
                    report.push_str(&format!("    {:<30} {}\n", label.dimmed(), count));
                }
            }
            RowBody::Error { ref error } => {
                report.push_str(&format!(
                    "{:<20} {}\n",
                    row.pipeline.red(),
                    format!("✗ {}", error).red()
                ));
            }
        }
    }

    report.push('\n');
    report
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// Paths of the three files written for one comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub json: PathBuf,
    pub csv: PathBuf,
    pub html: PathBuf,
}

/// Write the JSON, CSV and HTML artifacts into `dir`, creating it if needed.
pub fn write_artifacts(rows: &[ComparisonRow], dir: &Path) -> Result<Artifacts> {
    fs::create_dir_all(dir)?;
    let artifacts = Artifacts {
        json: dir.join(JSON_ARTIFACT),
        csv: dir.join(CSV_ARTIFACT),
        html: dir.join(HTML_ARTIFACT),
    };

    save_report(&generate_json_report(rows)?, &artifacts.json)?;
    save_report(&generate_csv_report(rows)?, &artifacts.csv)?;
    save_report(&generate_html_report(rows), &artifacts.html)?;
    Ok(artifacts)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
