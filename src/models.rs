//! Canonical record shapes produced by every decoder.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Serialize, Serializer};
use std::collections::HashMap;

/// One named check performed against a sample.
///
/// `error` and `failure` are independent flags; neither implies the other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssertionResult {
    pub error: bool,
    pub failure: bool,
    pub failure_message: String,
    pub name: String,
}

impl AssertionResult {
    /// The single assertion a tabular row can carry: a failure with a message
    /// and no name.
    pub fn failed(failure_message: impl Into<String>) -> Self {
        Self {
            error: false,
            failure: true,
            failure_message: failure_message.into(),
            name: String::new(),
        }
    }
}

/// Response status line plus the parsed header block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseHeaders {
    pub status_line: String,
    pub headers: HashMap<String, String>,
}

/// One test execution result.
///
/// Every field always carries a value: absent source fields decode to
/// `0`, `""`, an empty collection, a zero duration or the Unix epoch.
/// Durations are signed: JMeter writes negative values for some timings,
/// and they serialize as whole milliseconds.
/// `children` is only populated for container samples of the XML encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub all_threads: i64,
    pub assertion_results: Vec<AssertionResult>,
    pub bytes_received: i64,
    pub children: Vec<Sample>,
    pub cookies: HashMap<String, String>,
    pub data_encoding: String,
    pub data_type: String,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed_time: TimeDelta,
    pub error_count: i64,
    pub group_threads: i64,
    pub hostname: String,
    #[serde(serialize_with = "serialize_millis")]
    pub idle_time: TimeDelta,
    pub label: String,
    #[serde(serialize_with = "serialize_millis")]
    pub latency_time: TimeDelta,
    pub method: String,
    pub query_string: String,
    pub request_headers: HashMap<String, String>,
    pub response_code: String,
    pub response_data: String,
    pub response_filename: String,
    pub response_headers: ResponseHeaders,
    pub response_message: String,
    pub sample_count: i64,
    pub success: bool,
    /// Source element name (`sample` or `httpSample`); empty for CSV input.
    pub tag_name: String,
    pub thread_name: String,
    pub timestamp: DateTime<Utc>,
    pub url: String,
}

impl Default for Sample {
    fn default() -> Self {
        Self {
            all_threads: 0,
            assertion_results: Vec::new(),
            bytes_received: 0,
            children: Vec::new(),
            cookies: HashMap::new(),
            data_encoding: String::new(),
            data_type: String::new(),
            elapsed_time: TimeDelta::zero(),
            error_count: 0,
            group_threads: 0,
            hostname: String::new(),
            idle_time: TimeDelta::zero(),
            label: String::new(),
            latency_time: TimeDelta::zero(),
            method: String::new(),
            query_string: String::new(),
            request_headers: HashMap::new(),
            response_code: String::new(),
            response_data: String::new(),
            response_filename: String::new(),
            response_headers: ResponseHeaders::default(),
            response_message: String::new(),
            sample_count: 0,
            success: false,
            tag_name: String::new(),
            thread_name: String::new(),
            timestamp: DateTime::UNIX_EPOCH,
            url: String::new(),
        }
    }
}

fn serialize_millis<S: Serializer>(delta: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(delta.num_milliseconds())
}
