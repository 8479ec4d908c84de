//! Optional gzip encoding of push bodies

use std::io::{self, Write};

use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};

/// How hard to compress push bodies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// Send the JSON as is
    #[serde(alias = "nocompression")]
    None,
    Fastest,
    #[default]
    Optimal,
    #[serde(alias = "smallestsize")]
    Smallest,
}

impl CompressionLevel {
    fn gzip_level(self) -> Option<flate2::Compression> {
        match self {
            CompressionLevel::None => None,
            CompressionLevel::Fastest => Some(flate2::Compression::fast()),
            CompressionLevel::Optimal => Some(flate2::Compression::default()),
            CompressionLevel::Smallest => Some(flate2::Compression::best()),
        }
    }

    /// Value for the `Content-Encoding` header, if any
    pub fn content_encoding(self) -> Option<&'static str> {
        self.gzip_level().map(|_| "gzip")
    }
}

/// Body buffer that gzips on the fly when compression is enabled
pub enum PayloadWriter {
    Plain(Vec<u8>),
    Gzip(GzEncoder<Vec<u8>>),
}

impl PayloadWriter {
    pub fn new(level: CompressionLevel) -> Self {
        let buffer = Vec::with_capacity(1_024);
        match level.gzip_level() {
            None => PayloadWriter::Plain(buffer),
            Some(level) => PayloadWriter::Gzip(GzEncoder::new(buffer, level)),
        }
    }

    /// Finalize the stream and return the encoded body
    pub fn finish(self) -> io::Result<Vec<u8>> {
        match self {
            PayloadWriter::Plain(buffer) => Ok(buffer),
            PayloadWriter::Gzip(encoder) => encoder.finish(),
        }
    }
}

impl Write for PayloadWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            PayloadWriter::Plain(buffer) => buffer.write(buf),
            PayloadWriter::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            PayloadWriter::Plain(_) => Ok(()),
            PayloadWriter::Gzip(encoder) => encoder.flush(),
        }
    }
}
