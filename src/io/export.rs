//! CSV export of power arrays and the event log.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime, Weekday};
use tracing::{info, warn};

use crate::error::ExportError;
use crate::sim::event::{Event, sort_chronologically};
use crate::sim::types::Trace;

/// Timestamp layout of every exported row.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Header of the event log.
const EVENT_HEADER: [&str; 3] = ["Time", "Source", "Event"];

/// Name of the event log file.
pub const EVENTS_FILE: &str = "events.csv";

/// Synthetic wall-clock start of a trace: 2001-01-01 (a Monday) shifted
/// forward to the trace's first weekday.
pub fn trace_epoch(first_weekday: Weekday) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2001, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
        + Duration::days(i64::from(first_weekday.num_days_from_monday()))
}

/// Wall-clock timestamp of second `offset`.
pub fn timestamp(epoch: NaiveDateTime, offset: usize) -> String {
    (epoch + Duration::seconds(offset as i64))
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

/// File name for a power array.
///
/// Anything other than alphanumerics, `-`, `_` and `.` becomes an underscore,
/// so the name never carries a path separator out of the output directory.
pub fn series_file_name(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{stem}.csv")
}

/// Files written and skipped by [`export_trace`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub written: Vec<PathBuf>,
    /// Existing files left untouched because overwriting was not requested.
    pub skipped: Vec<PathBuf>,
}

/// Writes one power array as `<timestamp>;<watts>` rows without a header.
///
/// # Errors
///
/// Returns an `ExportError` if writing fails.
pub fn write_series(samples: &[f32], epoch: NaiveDateTime, writer: impl Write) -> Result<(), ExportError> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_writer(writer);

    for (offset, watts) in samples.iter().enumerate() {
        wtr.write_record([timestamp(epoch, offset), format!("{watts:.1}")])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes the event log as `Time;Source;Event`, sorted chronologically.
///
/// # Errors
///
/// Returns an `ExportError` if writing fails.
pub fn write_events(events: &[Event], epoch: NaiveDateTime, writer: impl Write) -> Result<(), ExportError> {
    let mut sorted = events.to_vec();
    sort_chronologically(&mut sorted);

    let mut wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);
    wtr.write_record(EVENT_HEADER)?;
    for e in &sorted {
        wtr.write_record([
            timestamp(epoch, e.offset).as_str(),
            e.name.as_str(),
            e.transition.label(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Opens `path` for writing unless it exists and `overwrite` is off.
fn create(path: &Path, overwrite: bool) -> io::Result<Option<io::BufWriter<File>>> {
    if path.is_file() && !overwrite {
        warn!(path = %path.display(), "output file exists, use --overwrite to replace it");
        return Ok(None);
    }
    Ok(Some(io::BufWriter::new(File::create(path)?)))
}

/// Exports every power array and the event log into `dir`.
///
/// Creates `dir` if needed. Existing files are skipped unless `overwrite`
/// is set.
///
/// # Errors
///
/// Returns an `ExportError` if `dir` is a file or any write fails.
pub fn export_trace(trace: &Trace, dir: &Path, overwrite: bool) -> Result<ExportReport, ExportError> {
    if dir.exists() && !dir.is_dir() {
        return Err(ExportError::NotADirectory(dir.to_path_buf()));
    }
    fs::create_dir_all(dir)?;

    let epoch = trace_epoch(trace.horizon().start_weekday);
    let mut report = ExportReport::default();

    for (name, samples) in trace.powers() {
        let path = dir.join(series_file_name(name));
        match create(&path, overwrite)? {
            Some(file) => {
                info!(series = %name, path = %path.display(), "writing load signature");
                write_series(samples, epoch, file)?;
                report.written.push(path);
            }
            None => report.skipped.push(path),
        }
    }

    let path = dir.join(EVENTS_FILE);
    match create(&path, overwrite)? {
        Some(file) => {
            info!(path = %path.display(), "writing event log");
            write_events(trace.events(), epoch, file)?;
            report.written.push(path);
        }
        None => report.skipped.push(path),
    }

    info!(
        written = report.written.len(),
        total = report.written.len() + report.skipped.len(),
        "output files written"
    );
    Ok(report)
}
