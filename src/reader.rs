//! Format sniffing and decoder construction.

use crate::error::{Error, Result};
use crate::formats::tabular::TabularDecoder;
use crate::formats::xml::XmlDecoder;
use crate::models::Sample;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

/// Prefix that marks a source as XML.
const XML_DECLARATION: &str = "<?xml";

/// Upper bound on how much of the first line is inspected.
const SNIFF_LIMIT: u64 = 4096;

/// The two on-disk encodings of a JTL file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Xml,
    Tabular,
}

/// Options for decoder construction.
///
/// Both settings only affect CSV sources.
///
/// # Examples
///
/// ```
/// use jtl_parser::DecoderOptions;
///
/// let options = DecoderOptions::new()
///     .delimiter(';')
///     .fieldnames(["timeStamp", "elapsed", "label"]);
/// assert_eq!(options.delimiter, ';');
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecoderOptions {
    /// Field delimiter; must be a single-byte character. Default `,`.
    pub delimiter: char,
    /// Column names for files written without a header row. When set, the
    /// first row is decoded as data.
    pub fieldnames: Option<Vec<String>>,
}

impl DecoderOptions {
    /// Options with a comma delimiter and header-row inference.
    pub fn new() -> Self {
        Self {
            delimiter: ',',
            fieldnames: None,
        }
    }

    /// Set the field delimiter.
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set explicit column names, disabling header-row inference.
    pub fn fieldnames<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fieldnames = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub(crate) fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(Error::UnsupportedFormat(format!(
                "delimiter {:?} is not a single-byte character",
                self.delimiter
            )))
        }
    }
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify a source by its first line, then rewind it to where it started.
///
/// # Errors
///
/// Returns [`Error::ResourceAccess`] if the source cannot be read or rewound,
/// and [`Error::UnsupportedFormat`] if the first line is not text.
pub fn sniff_format<R: BufRead + Seek>(source: &mut R) -> Result<SourceFormat> {
    let start = source.stream_position()?;

    let mut line = Vec::new();
    source.by_ref().take(SNIFF_LIMIT).read_until(b'\n', &mut line)?;
    source.seek(SeekFrom::Start(start))?;

    let text = match std::str::from_utf8(&line) {
        Ok(text) => text,
        // A multi-byte character cut at the sniff limit
        Err(err) if err.error_len().is_none() => {
            std::str::from_utf8(&line[..err.valid_up_to()]).unwrap_or_default()
        }
        Err(_) => {
            return Err(Error::UnsupportedFormat(
                "first line is not UTF-8 text".to_string(),
            ))
        }
    };
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let format = if text.starts_with(XML_DECLARATION) {
        SourceFormat::Xml
    } else {
        SourceFormat::Tabular
    };
    debug!("sniffed {:?} source", format);
    Ok(format)
}

/// Open `path`, detect its encoding and build the matching decoder.
///
/// The file handle is owned by the returned decoder and closed when it is
/// dropped, whether or not all records were consumed.
///
/// # Errors
///
/// Returns [`Error::ResourceAccess`] if the file cannot be opened or read
/// (a directory, a missing file), [`Error::UnsupportedFormat`] if it cannot
/// be classified or the options are invalid, and [`Error::MalformedSource`]
/// if an XML source has no root element.
///
/// # Examples
///
/// ```no_run
/// use jtl_parser::{create_decoder, DecoderOptions};
///
/// let decoder = create_decoder("results.jtl", &DecoderOptions::default())?;
/// for sample in decoder.records() {
///     let sample = sample?;
///     println!("{} {:?}", sample.label, sample.elapsed_time);
/// }
/// # Ok::<(), jtl_parser::Error>(())
/// ```
pub fn create_decoder<P: AsRef<Path>>(
    path: P,
    options: &DecoderOptions,
) -> Result<Decoder<BufReader<File>>> {
    debug!("opening {}", path.as_ref().display());
    let file = File::open(path.as_ref())?;
    create_decoder_from_reader(BufReader::new(file), options)
}

/// Detect the encoding of an already-open source and build the matching
/// decoder over it.
pub fn create_decoder_from_reader<R: BufRead + Seek>(
    mut source: R,
    options: &DecoderOptions,
) -> Result<Decoder<R>> {
    match sniff_format(&mut source)? {
        SourceFormat::Xml => XmlDecoder::new(source).map(Decoder::Xml),
        SourceFormat::Tabular => TabularDecoder::new(source, options).map(Decoder::Tabular),
    }
}

/// A decoder bound to one source.
pub enum Decoder<R> {
    Xml(XmlDecoder<R>),
    Tabular(TabularDecoder<R>),
}

impl<R: BufRead> Decoder<R> {
    /// The encoding this decoder reads.
    pub fn format(&self) -> SourceFormat {
        match self {
            Decoder::Xml(_) => SourceFormat::Xml,
            Decoder::Tabular(_) => SourceFormat::Tabular,
        }
    }

    /// The root `version` attribute of an XML source; `None` for CSV.
    pub fn version(&self) -> Option<&str> {
        match self {
            Decoder::Xml(decoder) => decoder.version(),
            Decoder::Tabular(_) => None,
        }
    }

    /// Consume the decoder into a lazy, single-pass sequence of samples.
    pub fn records(self) -> Records<R> {
        Records { decoder: self }
    }

    /// Decode every remaining sample.
    ///
    /// # Errors
    ///
    /// Returns the first decode error; samples decoded before it are dropped.
    pub fn read_all(self) -> Result<Vec<Sample>> {
        self.records().collect()
    }
}

/// Iterator over the samples of one source.
///
/// Yields at most one `Err`, after which it is exhausted.
pub struct Records<R> {
    decoder: Decoder<R>,
}

impl<R: BufRead> Iterator for Records<R> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.decoder {
            Decoder::Xml(decoder) => decoder.next(),
            Decoder::Tabular(decoder) => decoder.next(),
        }
    }
}
