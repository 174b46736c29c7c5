//! Result output: the sink seam between the crawl and the file format.

use std::io::{Read, Write};

use anyhow::Result;
use chrono::NaiveTime;

use crate::parse::ResultRecord;
use crate::stats::{StatsError, TimedResult};

/// Column order of a written result file. Fields a record carries beyond
/// these are dropped; fields it lacks are written empty.
pub const RESULT_FIELDS: [&str; 8] = ["pos", "time", "name", "team", "cat", "num", "chip", "grade"];

/// Capability for receiving parsed records, one at a time, in whatever
/// order the pool delivers them.
pub trait ResultSink: Send {
    fn write_header(&mut self) -> Result<()>;
    fn write_row(&mut self, record: &ResultRecord) -> Result<()>;
}

/// Tab-separated writer over the fixed result column set.
pub struct CsvSink<W: Write + Send> {
    writer: csv::Writer<W>,
}

impl<W: Write + Send> CsvSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new().delimiter(b'\t').from_writer(out),
        }
    }
}

impl<W: Write + Send> ResultSink for CsvSink<W> {
    fn write_header(&mut self) -> Result<()> {
        self.writer.write_record(RESULT_FIELDS)?;
        self.writer.flush()?;
        Ok(())
    }

    fn write_row(&mut self, record: &ResultRecord) -> Result<()> {
        let row: Vec<&str> = RESULT_FIELDS
            .iter()
            .map(|field| record.get(field).unwrap_or(""))
            .collect();
        self.writer.write_record(&row)?;
        // Rows arrive from a long-lived consumer task; keep the file
        // current rather than waiting for the crawl to finish.
        self.writer.flush()?;
        Ok(())
    }
}

/// Read a previously written result file back into `TimedResult`s, sorted
/// ascending by time. Header rows are skipped; a time field that does not
/// parse as HH:MM:SS fails the whole read.
pub fn read_results<R: Read>(input: R) -> Result<Vec<TimedResult>, StatsError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut results = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.get(0) == Some("pos") {
            continue;
        }
        let time_field = record
            .get(1)
            .ok_or_else(|| StatsError::ShortRow(record.len()))?;
        let time = NaiveTime::parse_from_str(time_field, "%H:%M:%S")
            .map_err(|_| StatsError::MalformedRecord(time_field.to_string()))?;
        let name = record.get(2).unwrap_or("").to_string();
        results.push(TimedResult { time, name });
    }

    results.sort_by_key(|r| r.time);
    Ok(results)
}
