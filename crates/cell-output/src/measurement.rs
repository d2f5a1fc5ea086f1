//! `PerRegionBandwidthMeasurement` — bandwidth per region and time bucket
//! for one measurement filter, exported as CSV.
//!
//! # Table
//!
//! One row per bucket of `interval` ns and one column per mobile region plus
//! the global network.  A sample is charged to the sender's region for
//! uplink legs and to the receiver's region otherwise.  Every bucket in
//! `[floor(send / interval), ceil(recv / interval))`, at least one, receives
//! the full sample bandwidth, so concurrent streams add up per bucket.
//!
//! # Incremental export
//!
//! Rows are written in blocks of [`EXPORT_STEP`].  An export is attempted
//! once a sample ends after `2 · EXPORT_STEP` buckets, and again every
//! `EXPORT_STEP` buckets after that.  A row is final only when it lies a full
//! block before the latest sample start seen so far: a long stream fills rows
//! far ahead, but samples starting at the current time can still add to
//! everything after that start.  [`finish`] writes the rest.
//!
//! [`finish`]: TransmissionObserver::finish

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use cell_chain::{BandwidthSample, ObserverError, TransmissionObserver};
use cell_core::time::SECOND;
use cell_network::{ExportConfig, MeasurementFilter};
use csv::{Terminator, WriterBuilder};
use tracing::{debug, warn};

use crate::{ExportSink, OutputError, OutputResult};

/// Rows per incremental export block.
pub const EXPORT_STEP: usize = 600;

pub struct PerRegionBandwidthMeasurement {
    filter: MeasurementFilter,
    path: PathBuf,
    /// Column names after `time`.
    regions: Vec<String>,
    interval: u64,
    decimal_separator: char,
    /// Rows from index `exported` on; earlier rows are already on disk.
    rows: VecDeque<Vec<u64>>,
    exported: usize,
    next_export: u64,
    /// Bucket of the latest sample start recorded.
    latest_start: usize,
    writer: Option<csv::Writer<ExportSink>>,
    last_error: Option<OutputError>,
}

impl PerRegionBandwidthMeasurement {
    /// Create the export file in `dir` and write its header.
    ///
    /// `regions` lists the column names; samples whose charged region is not
    /// among them are ignored.
    pub fn new(
        dir: &Path,
        filter: MeasurementFilter,
        regions: Vec<String>,
        interval_ns: u64,
        compressed: bool,
        export: &ExportConfig,
    ) -> OutputResult<Self> {
        if interval_ns == 0 {
            return Err(OutputError::Config("measurement interval must be positive".into()));
        }
        let delimiter = ascii_byte(export.field_separator)?;
        let extension = if compressed { "csv.gz" } else { "csv" };
        let path = dir.join(format!("{}.{extension}", filter.file_stem()));

        let fresh = !export.append || path.metadata().map_or(true, |m| m.len() == 0);
        let sink = ExportSink::open(&path, compressed, export.append)?;
        let mut writer = WriterBuilder::new()
            .delimiter(delimiter)
            .terminator(Terminator::Any(b'\n'))
            .has_headers(false)
            .from_writer(sink);
        if fresh {
            writer.write_record(std::iter::once("time").chain(regions.iter().map(String::as_str)))?;
        }
        writer.flush()?;
        debug!(file = %path.display(), columns = regions.len(), "bandwidth measurement opened");

        Ok(Self {
            filter,
            path,
            regions,
            interval: interval_ns,
            decimal_separator: export.decimal_separator,
            rows: VecDeque::new(),
            exported: 0,
            next_export: 2 * EXPORT_STEP as u64 * interval_ns,
            latest_start: 0,
            writer: Some(writer),
            last_error: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filter(&self) -> &MeasurementFilter {
        &self.filter
    }

    /// Rows recorded so far, exported or not.
    pub fn len(&self) -> usize {
        self.exported + self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rows already written to the export file.
    pub fn exported_rows(&self) -> usize {
        self.exported
    }

    /// Bandwidth recorded for bucket `row` in `region`, if the row is still
    /// held in memory.
    pub fn value(&self, row: usize, region: &str) -> Option<u64> {
        let column = self.regions.iter().position(|r| r == region)?;
        let row = row.checked_sub(self.exported)?;
        Some(self.rows.get(row).map_or(0, |r| r[column]))
    }

    pub fn take_error(&mut self) -> Option<OutputError> {
        self.last_error.take()
    }

    fn record(&mut self, sample: &BandwidthSample) {
        let send = sample.sender.time.as_nanos();
        let recv = sample.receiver.time.as_nanos();
        if send == 0 || recv == 0 {
            return;
        }
        let charged = if sample.mode.is_uplink() { &sample.sender } else { &sample.receiver };
        let Some(column) = self.regions.iter().position(|r| *r == charged.region) else {
            return;
        };

        let first = (send / self.interval) as usize;
        let last = (recv.div_ceil(self.interval) as usize).max(first + 1);
        self.latest_start = self.latest_start.max(first);
        if first < self.exported {
            warn!(
                file = %self.path.display(),
                bucket = first,
                exported = self.exported,
                "sample reaches into exported rows, truncated"
            );
        }
        let columns = self.regions.len();
        for bucket in first.max(self.exported)..last {
            let index = bucket - self.exported;
            while self.rows.len() <= index {
                self.rows.push_back(vec![0; columns]);
            }
            self.rows[index][column] = self.rows[index][column].saturating_add(sample.bandwidth);
        }
    }

    fn check_for_export(&mut self, time: u64) {
        if time > self.next_export {
            let result = self.export(false);
            self.store_err(result);
            self.next_export += EXPORT_STEP as u64 * self.interval;
        }
    }

    /// Write finished rows: all of them when `everything` is set, otherwise
    /// whole blocks that end a block before both the newest row and the
    /// latest sample start.
    fn export(&mut self, everything: bool) -> OutputResult<()> {
        let count = if everything {
            self.rows.len()
        } else {
            let held = self.rows.len() / EXPORT_STEP;
            let started = self.latest_start.saturating_sub(self.exported) / EXPORT_STEP;
            held.min(started).saturating_sub(1) * EXPORT_STEP
        };
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };
        for _ in 0..count {
            let Some(row) = self.rows.pop_front() else { break };
            let time = format_time(self.exported as u64 * self.interval, self.decimal_separator);
            writer.write_record(std::iter::once(time).chain(row.iter().map(u64::to_string)))?;
            self.exported += 1;
        }
        writer.flush()?;
        Ok(())
    }

    fn close(&mut self) -> OutputResult<()> {
        self.export(true)?;
        if let Some(writer) = self.writer.take() {
            let sink = writer.into_inner().map_err(|e| e.into_error())?;
            sink.close()?;
        }
        Ok(())
    }

    fn store_err(&mut self, result: OutputResult<()>) {
        if let Err(e) = result {
            // Keep only the first error.
            if self.last_error.is_none() {
                self.last_error = Some(e);
            }
        }
    }
}

impl TransmissionObserver for PerRegionBandwidthMeasurement {
    fn message_sent(&mut self, sample: &BandwidthSample) {
        let matches = self.filter.matches(
            &sample.sender.region,
            &sample.receiver.region,
            sample.mode,
            &sample.application_class,
        );
        if !matches {
            return;
        }
        self.record(sample);
        self.check_for_export(sample.receiver.time.as_nanos());
    }

    fn finish(&mut self) {
        let result = self.close();
        self.store_err(result);
        debug!(file = %self.path.display(), rows = self.exported, "bandwidth measurement closed");
    }

    fn take_error(&mut self) -> Option<ObserverError> {
        PerRegionBandwidthMeasurement::take_error(self).map(|e| Box::new(e) as ObserverError)
    }
}

fn ascii_byte(c: char) -> OutputResult<u8> {
    if c.is_ascii() {
        Ok(c as u8)
    } else {
        Err(OutputError::Config(format!("separator {c:?} is not an ASCII character")))
    }
}

/// Seconds, with a fractional part only when the time is not whole.
fn format_time(ns: u64, decimal_separator: char) -> String {
    let (secs, frac) = (ns / SECOND, ns % SECOND);
    if frac == 0 {
        return secs.to_string();
    }
    let digits = format!("{frac:09}");
    format!("{secs}{decimal_separator}{}", digits.trim_end_matches('0'))
}
