//! Decoders for the two JTL encodings.

pub mod tabular;
pub mod xml;

pub use tabular::TabularDecoder;
pub use xml::XmlDecoder;
