//! Test utilities for building JTL sources
#![allow(dead_code)]

use std::cell::Cell;
use std::fs;
use std::io::{self, BufRead, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Install a test logger once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Write `contents` to `dir/name` and return the path.
pub fn write_fixture(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// Wrap a string as an in-memory, seekable source.
pub fn source(contents: &str) -> Cursor<Vec<u8>> {
    Cursor::new(contents.as_bytes().to_vec())
}

/// An in-memory source that counts how many times it has been dropped.
pub struct TrackedSource {
    inner: Cursor<Vec<u8>>,
    releases: Rc<Cell<usize>>,
}

impl TrackedSource {
    /// Returns the source and a handle to its release count.
    pub fn new(contents: &str) -> (Self, Rc<Cell<usize>>) {
        let releases = Rc::new(Cell::new(0));
        let tracked = Self {
            inner: source(contents),
            releases: Rc::clone(&releases),
        };
        (tracked, releases)
    }
}

impl Read for TrackedSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl BufRead for TrackedSource {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.inner.consume(amt)
    }
}

impl Seek for TrackedSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl Drop for TrackedSource {
    fn drop(&mut self) {
        self.releases.set(self.releases.get() + 1);
    }
}

/// Escape text for use in element content or attribute values.
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `<name>text</name>`
pub fn element(name: &str, text: &str) -> String {
    format!("<{name}>{}</{name}>", escape(text))
}

/// An `assertionResult` element with all four child elements.
pub fn assertion(name: &str, failure: bool, error: bool, failure_message: &str) -> String {
    format!(
        "<assertionResult>{}{}{}{}</assertionResult>",
        element("name", name),
        element("failure", if failure { "true" } else { "false" }),
        element("error", if error { "true" } else { "false" }),
        element("failureMessage", failure_message),
    )
}

fn attributes(attrs: &[(&str, &str)]) -> String {
    attrs
        .iter()
        .map(|(key, value)| format!(" {}=\"{}\"", key, escape(value)))
        .collect()
}

/// Builder for XML JTL documents
pub struct JtlXmlBuilder {
    version: Option<String>,
    body: String,
}

impl JtlXmlBuilder {
    /// A `testResults` document with version 1.2
    pub fn new() -> Self {
        Self {
            version: Some("1.2".to_string()),
            body: String::new(),
        }
    }

    /// A `testResults` document with the given version, or none
    pub fn with_version(version: Option<&str>) -> Self {
        Self {
            version: version.map(str::to_string),
            body: String::new(),
        }
    }

    /// Add an `httpSample` with attributes and raw inner markup
    pub fn http_sample(mut self, attrs: &[(&str, &str)], inner: &str) -> Self {
        self.body.push_str(&format!(
            "<httpSample{}>{}</httpSample>\n",
            attributes(attrs),
            inner
        ));
        self
    }

    /// Open a `sample` container
    pub fn start_container(mut self, attrs: &[(&str, &str)]) -> Self {
        self.body
            .push_str(&format!("<sample{}>\n", attributes(attrs)));
        self
    }

    /// Close the current `sample` container
    pub fn end_container(mut self) -> Self {
        self.body.push_str("</sample>\n");
        self
    }

    /// Append raw markup
    pub fn raw(mut self, markup: &str) -> Self {
        self.body.push_str(markup);
        self
    }

    /// Build and return the final document
    pub fn build(self) -> String {
        let version = self
            .version
            .map(|v| format!(" version=\"{}\"", v))
            .unwrap_or_default();
        format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<testResults{}>\n{}</testResults>\n",
            version, self.body
        )
    }
}

impl Default for JtlXmlBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracked_source_counts_drops() {
        let (mut src, releases) = TrackedSource::new("abc");
        let mut text = String::new();
        src.read_to_string(&mut text).unwrap();
        assert_eq!(text, "abc");
        assert_eq!(releases.get(), 0);
        drop(src);
        assert_eq!(releases.get(), 1);
    }

    #[test]
    fn test_builder_wraps_body() {
        let xml = JtlXmlBuilder::new().http_sample(&[("lb", "a&b")], "").build();
        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<testResults version=\"1.2\">"));
        assert!(xml.contains("<httpSample lb=\"a&amp;b\"></httpSample>"));
    }

    #[test]
    fn test_assertion_markup() {
        let markup = assertion("Response Assertion", true, false, "x < y");
        assert!(markup.contains("<failure>true</failure>"));
        assert!(markup.contains("<failureMessage>x &lt; y</failureMessage>"));
    }
}
