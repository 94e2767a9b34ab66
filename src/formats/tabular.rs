//! Decoder for the CSV flavour of JTL.

use crate::codecs::{
    parse_bool_literal, parse_duration_ms, parse_instant_ms_epoch, parse_int, TRUE_LITERAL,
};
use crate::error::{Error, Result};
use crate::models::{AssertionResult, Sample};
use crate::reader::DecoderOptions;
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use log::{debug, trace};
use std::collections::HashMap;
use std::io::Read;

/// Column name to position, resolved from the header row or the caller's
/// field names.
#[derive(Debug, Clone, Default)]
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        // Later duplicates replace earlier ones
        let index = names
            .into_iter()
            .enumerate()
            .map(|(pos, name)| (name.to_string(), pos))
            .collect();
        Self { index }
    }

    fn get<'r>(&self, row: &'r StringRecord, name: &str) -> Option<&'r str> {
        self.index.get(name).and_then(|&pos| row.get(pos))
    }
}

/// Row-by-row decoder over a delimited JTL stream.
///
/// Rows never carry children, cookies, request data or more than one
/// assertion; those fields keep their empty defaults.
pub struct TabularDecoder<R> {
    rows: StringRecordsIntoIter<R>,
    fieldnames: Option<Vec<String>>,
    columns: Option<Columns>,
    finished: bool,
}

impl<R: Read> TabularDecoder<R> {
    /// Create a decoder over `source`.
    ///
    /// Without `fieldnames` in `options` the first row is read as the header
    /// when the first record is requested.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] if the delimiter is not a
    /// single-byte character.
    pub fn new(source: R, options: &DecoderOptions) -> Result<Self> {
        let delimiter = options.delimiter_byte()?;
        let reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(source);

        let columns = options.fieldnames.as_ref().map(|names| {
            debug!("CSV source, explicit columns {:?}", names);
            Columns::new(names.iter().map(String::as_str))
        });

        Ok(Self {
            rows: reader.into_records(),
            fieldnames: options.fieldnames.clone(),
            columns,
            finished: false,
        })
    }

    /// The column names in effect, once known.
    pub fn fieldnames(&self) -> Option<&[String]> {
        self.fieldnames.as_deref()
    }

    /// Advance to the next record.
    ///
    /// Returns `Ok(None)` once the source is exhausted.
    pub fn next_sample(&mut self) -> Result<Option<Sample>> {
        if self.columns.is_none() {
            let Some(header) = self.rows.next().transpose()? else {
                return Ok(None);
            };
            let names: Vec<String> = header.iter().map(str::to_string).collect();
            debug!("CSV source, header columns {:?}", names);
            self.columns = Some(Columns::new(names.iter().map(String::as_str)));
            self.fieldnames = Some(names);
        }

        let Some(columns) = self.columns.as_ref() else {
            return Ok(None);
        };
        let Some(row) = self.rows.next().transpose()? else {
            return Ok(None);
        };

        let sample = row_to_sample(columns, &row).map_err(|err| match (err, row.position()) {
            (Error::MalformedSource(msg), Some(pos)) => {
                Error::MalformedSource(format!("line {}: {}", pos.line(), msg))
            }
            (err, _) => err,
        })?;
        trace!("decoded row '{}'", sample.label);
        Ok(Some(sample))
    }
}

fn row_to_sample(columns: &Columns, row: &StringRecord) -> Result<Sample> {
    let col = |name: &str| columns.get(row, name);
    let text = |name: &str| col(name).unwrap_or_default().to_string();

    let assertion_results = match col("failureMessage") {
        Some(message) if !message.is_empty() => vec![AssertionResult::failed(message)],
        _ => Vec::new(),
    };

    Ok(Sample {
        all_threads: parse_int(col("allThreads"), "allThreads")?,
        assertion_results,
        bytes_received: parse_int(col("bytes"), "bytes")?,
        data_encoding: text("Encoding"),
        data_type: text("dataType"),
        elapsed_time: parse_duration_ms(col("elapsed"), 0, "elapsed")?,
        error_count: parse_int(col("ErrorCount"), "ErrorCount")?,
        group_threads: parse_int(col("grpThreads"), "grpThreads")?,
        hostname: text("Hostname"),
        idle_time: parse_duration_ms(col("IdleTime"), 0, "IdleTime")?,
        label: text("label"),
        latency_time: parse_duration_ms(col("Latency"), 0, "Latency")?,
        response_code: text("responseCode"),
        response_filename: text("Filename"),
        response_message: text("responseMessage"),
        sample_count: parse_int(col("SampleCount"), "SampleCount")?,
        success: parse_bool_literal(col("success"), TRUE_LITERAL),
        thread_name: text("threadName"),
        timestamp: parse_instant_ms_epoch(col("timeStamp"), 0, "timeStamp")?,
        url: text("URL"),
        ..Sample::default()
    })
}

impl<R: Read> Iterator for TabularDecoder<R> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.next_sample() {
            Ok(Some(sample)) => Some(Ok(sample)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}
