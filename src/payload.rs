//! Loki push payload serialization
//!
//! Renders streams as:
//!
//! ```text
//! {"streams":[{"stream":{"<key>":"<value>"},"values":[["<unix ns>","<line>"]]}]}
//! ```
//!
//! Serialization goes through `serde` so the payload can be written straight into any
//! `io::Write`, including a gzip encoder, without building the JSON string first.

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, SerializeSeq, SerializeStruct, SerializeTuple};
use serde::{Serialize, Serializer};

use crate::model::LabelSet;
use crate::stream::{Entry, Stream};

/// Content type sent with every push. Older Loki releases reject a charset parameter.
pub const CONTENT_TYPE: &str = "application/json";

/// Nanoseconds since the Unix epoch
pub fn encode_timestamp(timestamp: DateTime<Utc>) -> i128 {
    i128::from(timestamp.timestamp()) * 1_000_000_000 + i128::from(timestamp.timestamp_subsec_nanos())
}

/// Borrowed view of a push request body
pub struct PushPayload<'a> {
    streams: &'a [Stream],
}

impl<'a> PushPayload<'a> {
    pub fn new(streams: &'a [Stream]) -> Self {
        Self { streams }
    }

    /// Stream the JSON body into `writer`
    pub fn write_to<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer(writer, self)
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Serialize for PushPayload<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("PushPayload", 1)?;
        state.serialize_field("streams", &StreamList(self.streams))?;
        state.end()
    }
}

struct StreamList<'a>(&'a [Stream]);

impl Serialize for StreamList<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for stream in self.0 {
            seq.serialize_element(&StreamBody(stream))?;
        }
        seq.end()
    }
}

struct StreamBody<'a>(&'a Stream);

impl Serialize for StreamBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Stream", 2)?;
        state.serialize_field("stream", &LabelObject(&self.0.labels))?;
        state.serialize_field("values", &ValueList(&self.0.entries))?;
        state.end()
    }
}

struct LabelObject<'a>(&'a LabelSet);

impl Serialize for LabelObject<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for label in self.0 {
            map.serialize_entry(label.key(), label.value())?;
        }
        map.end()
    }
}

struct ValueList<'a>(&'a [Entry]);

impl Serialize for ValueList<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for entry in self.0 {
            seq.serialize_element(&ValuePair(entry))?;
        }
        seq.end()
    }
}

struct ValuePair<'a>(&'a Entry);

impl Serialize for ValuePair<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&NanosString(encode_timestamp(self.0.timestamp)))?;
        tuple.serialize_element(&self.0.line)?;
        tuple.end()
    }
}

/// Loki wants the timestamp as a decimal string, not a JSON number
struct NanosString(i128);

impl Serialize for NanosString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}
