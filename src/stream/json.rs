//! Streams a JSON object assembled from named fields, where some field
//! values may themselves be [`ByteStream`]s (specification §4.1,
//! "`JSONStream(mapping)`"). A stream-valued field is embedded as a JSON
//! string and its bytes are interleaved directly into the output as they
//! are read — the field is never drained into memory first. Plain values
//! are serialized once, up front, since they're assumed small (ids,
//! metadata scalars); only stream fields carry large content.
//!
//! Grounded on `waterbutler.core.streams.JSONStream`, which does the same
//! interleaving for the common case of a metadata object carrying one
//! base64-encoded file body.

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use serde_json::Value;

use super::ByteStream;
use crate::error::Result;

/// One field of a [`JsonStream`]'s top-level object.
pub enum JsonField {
    /// An ordinary JSON value, serialized eagerly.
    Value(Value),
    /// A stream whose content is embedded as a JSON string, streamed in
    /// place rather than buffered. The stream's bytes are written verbatim
    /// between the surrounding quotes, so callers that need JSON-safe
    /// content should wrap it (e.g. in a [`super::base64::Base64EncodeStream`])
    /// before handing it here.
    Stream(Box<dyn ByteStream>),
}

enum Phase {
    NotStarted,
    FieldKey(usize),
    FieldValue(usize),
    FieldStream(usize),
    FieldTrailer(usize),
    Closing,
    Done,
}

/// A [`ByteStream`] over a JSON object whose fields may mix ordinary values
/// with nested streams, emitted as `{"k1":v1,"k2":"<streamed>",...}`.
pub struct JsonStream {
    fields: Vec<(String, JsonField)>,
    phase: Phase,
    pending: BytesMut,
}

impl JsonStream {
    /// Builds a stream over `fields`, written in order.
    pub fn new(fields: Vec<(String, JsonField)>) -> Self {
        JsonStream {
            fields,
            phase: Phase::NotStarted,
            pending: BytesMut::new(),
        }
    }

    /// Builds a stream over a plain [`Value`] with no nested streams — the
    /// common case for metadata/callback bodies that carry only scalars.
    pub fn from_value(value: &Value) -> Self {
        let fields = match value {
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| (k.clone(), JsonField::Value(v.clone())))
                .collect(),
            other => vec![("value".to_string(), JsonField::Value(other.clone()))],
        };
        JsonStream::new(fields)
    }

    fn push_key(&mut self, index: usize) {
        let mut buf = BytesMut::new();
        buf.put_slice(if index == 0 { b"{\"" } else { b"\"" });
        buf.put_slice(self.fields[index].0.as_bytes());
        buf.put_slice(b"\":");
        self.pending = buf;
    }
}

#[async_trait]
impl ByteStream for JsonStream {
    async fn read(&mut self, n: usize) -> Result<Bytes> {
        loop {
            if !self.pending.is_empty() {
                let take = n.min(self.pending.len());
                return Ok(self.pending.split_to(take).freeze());
            }

            match self.phase {
                Phase::NotStarted => {
                    if self.fields.is_empty() {
                        self.pending = BytesMut::from(&b"{}"[..]);
                        self.phase = Phase::Closing;
                    } else {
                        self.push_key(0);
                        self.phase = Phase::FieldValue(0);
                    }
                }
                Phase::FieldKey(i) => {
                    self.push_key(i);
                    self.phase = Phase::FieldValue(i);
                }
                Phase::FieldValue(i) => match &self.fields[i].1 {
                    JsonField::Value(value) => {
                        let bytes = serde_json::to_vec(value).unwrap_or_else(|_| b"null".to_vec());
                        self.pending = BytesMut::from(&bytes[..]);
                        self.phase = Phase::FieldTrailer(i);
                    }
                    JsonField::Stream(_) => {
                        self.pending = BytesMut::from(&b"\""[..]);
                        self.phase = Phase::FieldStream(i);
                    }
                },
                Phase::FieldStream(i) => {
                    let JsonField::Stream(stream) = &mut self.fields[i].1 else {
                        unreachable!("FieldStream phase only reached for Stream fields");
                    };
                    let chunk = stream.read(n).await?;
                    if chunk.is_empty() {
                        self.pending = BytesMut::from(&b"\""[..]);
                        self.phase = Phase::FieldTrailer(i);
                        continue;
                    }
                    return Ok(chunk);
                }
                Phase::FieldTrailer(i) => {
                    let next = i + 1;
                    if next < self.fields.len() {
                        self.pending = BytesMut::from(&b","[..]);
                        self.phase = Phase::FieldKey(next);
                    } else {
                        self.pending = BytesMut::from(&b"}"[..]);
                        self.phase = Phase::Closing;
                    }
                }
                Phase::Closing => {
                    self.phase = Phase::Done;
                }
                Phase::Done => return Ok(Bytes::new()),
            }
        }
    }

    fn at_eof(&self) -> bool {
        matches!(self.phase, Phase::Done) && self.pending.is_empty()
    }

    fn size(&self) -> Option<u64> {
        // Unknown whenever any field could be a stream without a known
        // size; callers needing a content-length should avoid JsonStream.
        None
    }
}

#[cfg(test)]
mod tests {
    use super::super::string::ByteStreamBuf;
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn serializes_plain_values_as_an_ordinary_json_object() {
        let mut stream = JsonStream::from_value(&json!({"hello": "world", "n": 3}));
        let bytes = super::super::collect(&mut stream, 1024).await.unwrap();
        let parsed: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed, json!({"hello": "world", "n": 3}));
    }

    #[tokio::test]
    async fn interleaves_a_nested_stream_value_into_the_json_framing() {
        let fields = vec![
            ("name".to_string(), JsonField::Value(json!("report.txt"))),
            (
                "body".to_string(),
                JsonField::Stream(Box::new(ByteStreamBuf::new(Bytes::from_static(b"payload")))),
            ),
        ];
        let mut stream = JsonStream::new(fields);
        let bytes = super::super::collect(&mut stream, 1024).await.unwrap();
        let parsed: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed["name"], "report.txt");
        assert_eq!(parsed["body"], "payload");
    }

    #[tokio::test]
    async fn holds_under_one_byte_reads() {
        let fields = vec![
            ("a".to_string(), JsonField::Value(json!(1))),
            (
                "b".to_string(),
                JsonField::Stream(Box::new(ByteStreamBuf::new(Bytes::from_static(b"xyz")))),
            ),
        ];
        let mut stream = JsonStream::new(fields);
        let mut out = Vec::new();
        loop {
            let chunk = stream.read(1).await.unwrap();
            if chunk.is_empty() && stream.at_eof() {
                break;
            }
            out.extend_from_slice(&chunk);
        }
        let parsed: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, json!({"a": 1, "b": "xyz"}));
    }

    #[tokio::test]
    async fn empty_field_list_serializes_to_an_empty_object() {
        let mut stream = JsonStream::new(vec![]);
        let bytes = super::super::collect(&mut stream, 1024).await.unwrap();
        assert_eq!(bytes, b"{}");
    }
}
