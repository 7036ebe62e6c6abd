mod gpx;

use crate::error::ParseError;
use crate::types::activity::{FileFormat, RawPoint};

pub trait Parser {
    /// Flattens every track point of the document into one ordered sequence.
    fn parse(&self, bytes: &[u8]) -> Result<Vec<RawPoint>, ParseError>;
}

pub fn parse(bytes: &[u8], format: FileFormat) -> Result<Vec<RawPoint>, ParseError> {
    match format {
        FileFormat::Gpx => gpx::GpxParser.parse(bytes),
    }
}
