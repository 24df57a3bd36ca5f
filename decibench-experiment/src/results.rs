//! Results table: one CSV row per (model, level, algorithm) measurement
//!
//! The writer appends and flushes each row as soon as it is measured, so a
//! crashed run keeps everything measured so far. The reader maps columns by
//! header name and accepts quoted fields.

use decibench_core::{Error, Result};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub const RESULTS_HEADER: [&str; 8] = [
    "Model",
    "Type",
    "Algorithm",
    "Decimation",
    "Time",
    "HausdorffDist",
    "InitialFaces",
    "FinalFaces",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Model file name
    pub model: String,
    /// Mesh category
    pub mesh_type: String,
    pub algorithm: String,
    pub decimation: String,
    /// Mean wall-clock seconds of the timed runs
    pub time: f64,
    /// Symmetric Hausdorff distance to the original
    pub hausdorff: f64,
    pub initial_faces: usize,
    pub final_faces: usize,
}

/// Measured quantity analysed by the report and figures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Time,
    HausdorffDist,
}

impl Response {
    pub const ALL: [Response; 2] = [Response::Time, Response::HausdorffDist];

    pub fn value(self, row: &ResultRow) -> f64 {
        match self {
            Response::Time => row.time,
            Response::HausdorffDist => row.hausdorff,
        }
    }

    /// CSV column name
    pub fn column(self) -> &'static str {
        match self {
            Response::Time => "Time",
            Response::HausdorffDist => "HausdorffDist",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Response::Time => "Execution Time",
            Response::HausdorffDist => "Hausdorff Distance",
        }
    }
}

/// Column values of `rows` for `response`
pub fn values(rows: &[&ResultRow], response: Response) -> Vec<f64> {
    rows.iter().map(|r| response.value(r)).collect()
}

/// Distinct keys in first-appearance order
pub fn unique_in_order<'a, F>(rows: &'a [ResultRow], key: F) -> Vec<&'a str>
where
    F: Fn(&'a ResultRow) -> &'a str,
{
    rows.iter().map(key).unique().collect()
}

/// Distinct keys in sorted order
pub fn sorted_unique<'a, F>(rows: &'a [ResultRow], key: F) -> Vec<&'a str>
where
    F: Fn(&'a ResultRow) -> &'a str,
{
    rows.iter().map(key).sorted().dedup().collect()
}

fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Streaming CSV writer for result rows
pub struct ResultsWriter {
    writer: BufWriter<File>,
    rows: usize,
}

impl ResultsWriter {
    /// Create (truncate) `path` and write the header
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(writer, "{}", RESULTS_HEADER.join(","))?;
        writer.flush()?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn write_row(&mut self, row: &ResultRow) -> Result<()> {
        writeln!(
            self.writer,
            "{},{},{},{},{},{},{},{}",
            quote(&row.model),
            quote(&row.mesh_type),
            quote(&row.algorithm),
            quote(&row.decimation),
            row.time,
            row.hausdorff,
            row.initial_faces,
            row.final_faces
        )?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows
    }
}

/// Split one CSV record, honouring double-quoted fields
fn split_record(line: &str, line_no: usize) -> Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if field.is_empty() => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    if in_quotes {
        return Err(Error::parse(line_no, "unterminated quoted field"));
    }
    fields.push(field);
    Ok(fields)
}

/// Parse a results table from any reader
pub fn parse_results<R: BufRead>(reader: R) -> Result<Vec<ResultRow>> {
    let mut lines = reader.lines().enumerate();
    let header = match lines.next() {
        Some((_, line)) => split_record(line?.trim_end_matches('\r'), 1)?,
        None => return Err(Error::parse(1, "empty results file")),
    };

    let column = |name: &str| -> Result<usize> {
        header
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| Error::parse(1, format!("missing column {name}")))
    };
    let idx: Vec<usize> = RESULTS_HEADER
        .iter()
        .map(|name| column(name))
        .collect::<Result<_>>()?;

    let mut rows = Vec::new();
    for (i, line) in lines {
        let line_no = i + 1;
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_record(line, line_no)?;
        let field = |k: usize| -> Result<&str> {
            fields.get(idx[k]).map(|s| s.trim()).ok_or_else(|| {
                Error::parse(line_no, format!("missing value for {}", RESULTS_HEADER[k]))
            })
        };
        let float = |k: usize| -> Result<f64> {
            let raw = field(k)?;
            raw.parse().map_err(|_| {
                Error::parse(line_no, format!("invalid {} value {raw:?}", RESULTS_HEADER[k]))
            })
        };
        let count = |k: usize| -> Result<usize> {
            let raw = field(k)?;
            raw.parse().map_err(|_| {
                Error::parse(line_no, format!("invalid {} value {raw:?}", RESULTS_HEADER[k]))
            })
        };

        rows.push(ResultRow {
            model: field(0)?.to_string(),
            mesh_type: field(1)?.to_string(),
            algorithm: field(2)?.to_string(),
            decimation: field(3)?.to_string(),
            time: float(4)?,
            hausdorff: float(5)?,
            initial_faces: count(6)?,
            final_faces: count(7)?,
        });
    }
    Ok(rows)
}

/// Read a results CSV file
pub fn read_results<P: AsRef<Path>>(path: P) -> Result<Vec<ResultRow>> {
    parse_results(BufReader::new(File::open(path)?))
}
