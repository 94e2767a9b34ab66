//! Streaming decoder for the XML flavour of JTL.
//!
//! The decoder pulls one markup event at a time and keeps only the samples
//! that are still open: a stack of frames for the elements between the root
//! and the current position, plus the finished leaves of an open container.
//! Everything else is dropped as soon as its end tag is seen, so memory does
//! not grow with the number of records in the file.

use crate::codecs::{
    parse_bool_literal, parse_cookies, parse_duration_ms, parse_headers, parse_instant_ms_epoch,
    parse_int, parse_response_headers, TRUE_LITERAL,
};
use crate::error::{Error, Result};
use crate::models::{AssertionResult, Sample};
use log::{debug, trace};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::BufRead;

/// Element name of a container (transaction) sample.
pub const CONTAINER_TAG: &str = "sample";

/// Element name of a leaf (HTTP) sample.
pub const LEAF_TAG: &str = "httpSample";

const ASSERTION_TAG: &str = "assertionResult";

/// Child elements of a sample whose text is kept.
const SAMPLE_FIELDS: &[&str] = &[
    "method",
    "queryString",
    "requestHeader",
    "responseData",
    "responseFile",
    "responseHeader",
    "cookies",
    "java.net.URL",
];

/// Child elements of an `assertionResult` whose text is kept.
const ASSERTION_FIELDS: &[&str] = &["error", "failure", "failureMessage", "name"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    InsideContainer,
}

/// A sample whose end tag has not been reached yet.
#[derive(Debug)]
struct PendingSample {
    tag_name: String,
    attributes: HashMap<String, String>,
    fields: HashMap<String, String>,
    assertions: Vec<AssertionResult>,
}

impl PendingSample {
    fn from_start(tag_name: String, start: &BytesStart<'_>) -> Result<Self> {
        let mut attributes = HashMap::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::malformed(format!("attribute name is not UTF-8: {}", e)))?
                .to_string();
            let value = attr.unescape_value()?.into_owned();
            attributes.insert(key, value);
        }

        Ok(Self {
            tag_name,
            attributes,
            fields: HashMap::new(),
            assertions: Vec::new(),
        })
    }

    fn into_sample(self, children: Vec<Sample>) -> Result<Sample> {
        let PendingSample {
            tag_name,
            attributes,
            fields,
            assertions,
        } = self;

        let attr = |key: &str| attributes.get(key).map(String::as_str);
        let text = |name: &str| fields.get(name).map(String::as_str).unwrap_or("");

        Ok(Sample {
            all_threads: parse_int(attr("na"), "na")?,
            assertion_results: assertions,
            bytes_received: parse_int(attr("by"), "by")?,
            children,
            cookies: parse_cookies(text("cookies")),
            data_encoding: attr("de").unwrap_or_default().to_string(),
            data_type: attr("dt").unwrap_or_default().to_string(),
            elapsed_time: parse_duration_ms(attr("t"), 0, "t")?,
            error_count: parse_int(attr("ec"), "ec")?,
            group_threads: parse_int(attr("ng"), "ng")?,
            hostname: attr("hn").unwrap_or_default().to_string(),
            idle_time: parse_duration_ms(attr("it"), 0, "it")?,
            label: attr("lb").unwrap_or_default().to_string(),
            latency_time: parse_duration_ms(attr("lt"), 0, "lt")?,
            method: text("method").to_string(),
            query_string: text("queryString").to_string(),
            request_headers: parse_headers(text("requestHeader")),
            response_code: attr("rc").unwrap_or_default().to_string(),
            response_data: text("responseData").to_string(),
            response_filename: text("responseFile").to_string(),
            response_headers: parse_response_headers(text("responseHeader")),
            response_message: attr("rm").unwrap_or_default().to_string(),
            sample_count: parse_int(attr("sc"), "sc")?,
            success: parse_bool_literal(attr("s"), TRUE_LITERAL),
            tag_name,
            thread_name: attr("tn").unwrap_or_default().to_string(),
            timestamp: parse_instant_ms_epoch(attr("ts"), 0, "ts")?,
            url: text("java.net.URL").to_string(),
        })
    }
}

fn build_assertion(fields: &HashMap<String, String>) -> AssertionResult {
    let text = |name: &str| fields.get(name).map(String::as_str);
    AssertionResult {
        error: parse_bool_literal(text("error"), TRUE_LITERAL),
        failure: parse_bool_literal(text("failure"), TRUE_LITERAL),
        failure_message: text("failureMessage").unwrap_or_default().to_string(),
        name: text("name").unwrap_or_default().to_string(),
    }
}

/// An element that is currently open.
#[derive(Debug)]
enum Frame {
    Sample(PendingSample),
    Assertion(HashMap<String, String>),
    Field { name: String, text: String },
    /// The root element, or anything whose content is not needed.
    Skip,
}

/// Pull-based decoder over an XML JTL stream.
///
/// Iterating yields one [`Sample`] per top-level `httpSample` and one per
/// `sample` container (with its leaves as `children`). The first error ends
/// the iteration.
pub struct XmlDecoder<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    version: Option<String>,
    state: State,
    stack: Vec<Frame>,
    pending_children: Vec<Sample>,
    root_closed: bool,
    finished: bool,
}

impl<R: BufRead> XmlDecoder<R> {
    /// Create a decoder and read up to the root element.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedSource`] if the prologue is not well-formed
    /// or the source has no root element.
    pub fn new(source: R) -> Result<Self> {
        let mut decoder = Self {
            reader: Reader::from_reader(source),
            buf: Vec::new(),
            version: None,
            state: State::Outside,
            stack: Vec::new(),
            pending_children: Vec::new(),
            root_closed: false,
            finished: false,
        };
        decoder.read_root()?;
        Ok(decoder)
    }

    /// The `version` attribute of the root element, if present.
    ///
    /// Informational only; decoding does not depend on it.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    fn read_root(&mut self) -> Result<()> {
        loop {
            self.buf.clear();
            let (root, is_empty) = match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(start) => (start, false),
                Event::Empty(start) => (start, true),
                Event::Eof => return Err(Error::malformed("no root element")),
                _ => continue,
            };

            self.version = match root.try_get_attribute("version")? {
                Some(attr) => Some(attr.unescape_value()?.into_owned()),
                None => None,
            };
            if is_empty {
                self.root_closed = true;
            } else {
                self.stack.push(Frame::Skip);
            }
            break;
        }

        debug!("XML source, version {:?}", self.version);
        Ok(())
    }

    /// Advance to the next record.
    ///
    /// Returns `Ok(None)` once the document has been fully consumed.
    pub fn next_sample(&mut self) -> Result<Option<Sample>> {
        let mut buf = std::mem::take(&mut self.buf);
        let result = self.pump(&mut buf);
        buf.clear();
        self.buf = buf;
        result
    }

    fn pump(&mut self, buf: &mut Vec<u8>) -> Result<Option<Sample>> {
        loop {
            buf.clear();
            let emitted = match self.reader.read_event_into(buf)? {
                Event::Start(start) => {
                    self.open(&start)?;
                    None
                }
                Event::Empty(start) => {
                    self.open(&start)?;
                    self.close()?
                }
                Event::End(_) => self.close()?,
                Event::Text(text) => {
                    if self.stack.is_empty() && !text.iter().all(u8::is_ascii_whitespace) {
                        return Err(Error::malformed("text after the root element"));
                    }
                    if let Some(Frame::Field { text: acc, .. }) = self.stack.last_mut() {
                        acc.push_str(&text.unescape()?);
                    }
                    None
                }
                Event::CData(cdata) => {
                    if self.stack.is_empty() {
                        return Err(Error::malformed("CDATA after the root element"));
                    }
                    if let Some(Frame::Field { text: acc, .. }) = self.stack.last_mut() {
                        let raw = std::str::from_utf8(&cdata)
                            .map_err(|e| Error::malformed(format!("CDATA is not UTF-8: {}", e)))?;
                        acc.push_str(raw);
                    }
                    None
                }
                Event::Eof => {
                    if !self.root_closed {
                        return Err(Error::malformed("unexpected end of input inside root element"));
                    }
                    return Ok(None);
                }
                _ => None,
            };

            if let Some(sample) = emitted {
                trace!("decoded <{}> '{}'", sample.tag_name, sample.label);
                return Ok(Some(sample));
            }
        }
    }

    fn open(&mut self, start: &BytesStart<'_>) -> Result<()> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| Error::malformed(format!("element name is not UTF-8: {}", e)))?
            .to_string();

        let frame = match self.stack.last() {
            None => {
                return Err(Error::malformed(format!(
                    "element <{}> after the root element",
                    name
                )))
            }
            Some(Frame::Field { .. }) => Frame::Skip,
            Some(Frame::Assertion(_)) => {
                if ASSERTION_FIELDS.contains(&name.as_str()) {
                    Frame::Field { name, text: String::new() }
                } else {
                    Frame::Skip
                }
            }
            Some(parent) => {
                let in_sample = matches!(parent, Frame::Sample(_));
                match name.as_str() {
                    CONTAINER_TAG => {
                        if self.state == State::InsideContainer {
                            return Err(Error::malformed(
                                "container sample opened inside another container",
                            ));
                        }
                        self.state = State::InsideContainer;
                        self.pending_children.clear();
                        Frame::Sample(PendingSample::from_start(name, start)?)
                    }
                    LEAF_TAG => Frame::Sample(PendingSample::from_start(name, start)?),
                    ASSERTION_TAG if in_sample => Frame::Assertion(HashMap::new()),
                    field if in_sample && SAMPLE_FIELDS.contains(&field) => Frame::Field {
                        name,
                        text: String::new(),
                    },
                    _ => Frame::Skip,
                }
            }
        };

        self.stack.push(frame);
        Ok(())
    }

    fn close(&mut self) -> Result<Option<Sample>> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| Error::malformed("end tag without matching start tag"))?;

        match frame {
            Frame::Field { name, text } => {
                // First occurrence wins
                match self.stack.last_mut() {
                    Some(Frame::Sample(parent)) => {
                        parent.fields.entry(name).or_insert(text);
                    }
                    Some(Frame::Assertion(parent)) => {
                        parent.entry(name).or_insert(text);
                    }
                    _ => {}
                }
                Ok(None)
            }
            Frame::Assertion(fields) => {
                if let Some(Frame::Sample(parent)) = self.stack.last_mut() {
                    parent.assertions.push(build_assertion(&fields));
                }
                Ok(None)
            }
            Frame::Sample(pending) => self.finish_sample(pending),
            Frame::Skip => {
                if self.stack.is_empty() {
                    self.root_closed = true;
                }
                Ok(None)
            }
        }
    }

    fn finish_sample(&mut self, pending: PendingSample) -> Result<Option<Sample>> {
        if pending.tag_name == CONTAINER_TAG {
            let children = std::mem::take(&mut self.pending_children);
            self.state = State::Outside;
            return pending.into_sample(children).map(Some);
        }

        let sample = pending.into_sample(Vec::new())?;
        match self.state {
            State::InsideContainer => {
                self.pending_children.push(sample);
                Ok(None)
            }
            State::Outside => Ok(Some(sample)),
        }
    }
}

impl<R: BufRead> Iterator for XmlDecoder<R> {
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
