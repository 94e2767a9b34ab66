//! # JTL Parser
//!
//! A streaming decoder for JMeter result logs (`.jtl`). Both on-disk
//! encodings, the XML tree format and the CSV format, decode into the same
//! [`Sample`] record, so consumers never need to know which one a file uses.
//!
//! ## Features
//!
//! - **Format detection**: the first line decides between XML and CSV
//! - **Streaming**: records are produced one at a time; memory stays flat
//!   however many samples the file holds
//! - **Transactions**: XML `sample` containers come back with their
//!   `httpSample` leaves as `children`
//! - **Headerless CSV**: column names and delimiter can be supplied by the caller
//! - **Total records**: every field has a default, nothing is optional
//!
//! ## Quick Start
//!
//! ```no_run
//! use jtl_parser::{create_decoder, DecoderOptions};
//!
//! let decoder = create_decoder("results.jtl", &DecoderOptions::default())?;
//! println!("{:?} source", decoder.format());
//!
//! for sample in decoder.records() {
//!     let sample = sample?;
//!     println!("{} -> {} in {:?}", sample.label, sample.response_code, sample.elapsed_time);
//! }
//! # Ok::<(), jtl_parser::Error>(())
//! ```
//!
//! ## Headerless CSV
//!
//! ```no_run
//! use jtl_parser::{create_decoder, DecoderOptions};
//!
//! let options = DecoderOptions::new()
//!     .delimiter('\t')
//!     .fieldnames(["timeStamp", "elapsed", "label", "responseCode", "success"]);
//!
//! let samples = create_decoder("results.csv", &options)?.read_all()?;
//! println!("Read {} samples", samples.len());
//! # Ok::<(), jtl_parser::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! ```no_run
//! use jtl_parser::{create_decoder, DecoderOptions, Error};
//!
//! match create_decoder("results.jtl", &DecoderOptions::default()) {
//!     Ok(_decoder) => {
//!         // Decode...
//!     }
//!     Err(Error::ResourceAccess(err)) => {
//!         eprintln!("Cannot read file: {}", err);
//!     }
//!     Err(err) => {
//!         eprintln!("Error: {}", err);
//!     }
//! }
//! ```

// Public API modules
pub mod error;
pub mod reader;

// Re-export commonly used types
pub use error::{Error, Result};
pub use models::{AssertionResult, ResponseHeaders, Sample};
pub use reader::{
    create_decoder, create_decoder_from_reader, sniff_format, Decoder, DecoderOptions, Records,
    SourceFormat,
};

// Internal modules (public but not part of the high-level API)
pub mod codecs;
pub mod formats;
pub mod models;

// Convenience type aliases
/// Alias for a fully decoded source
pub type Samples = Vec<Sample>;
