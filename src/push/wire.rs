//! Loki push protocol body
//!
//! ```json
//! {"streams":[{"stream":{"job":"api"},"values":[["1700000000000000000","line"]]}]}
//! ```
//!
//! Records with identical label sets share one stream. Streams appear in the
//! order their label set was first seen; values keep record order.

use crate::core::{LabelSet, LogRecord, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;

#[derive(Debug, Serialize)]
pub struct PushRequest<'a> {
    pub streams: Vec<PushStream<'a>>,
}

#[derive(Debug, Serialize)]
pub struct PushStream<'a> {
    pub stream: &'a LabelSet,
    /// `[unix-nanos, line]` pairs
    pub values: Vec<(String, &'a str)>,
}

impl<'a> PushRequest<'a> {
    pub fn from_records(records: &'a [LogRecord]) -> Self {
        let mut streams: Vec<PushStream<'a>> = Vec::new();
        let mut index: HashMap<&'a LabelSet, usize> = HashMap::new();

        for record in records {
            let value = (record.timestamp_nanos().to_string(), record.line());
            match index.get(record.labels()) {
                Some(&idx) => streams[idx].values.push(value),
                None => {
                    index.insert(record.labels(), streams.len());
                    streams.push(PushStream {
                        stream: record.labels(),
                        values: vec![value],
                    });
                }
            }
        }

        Self { streams }
    }

    pub fn value_count(&self) -> usize {
        self.streams.iter().map(|s| s.values.len()).sum()
    }
}

/// Encode a batch as a JSON push body
pub fn encode_push_request(records: &[LogRecord]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&PushRequest::from_records(records))?)
}

/// Gzip an encoded body
pub fn gzip(body: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(body.len() / 4), Compression::default());
    encoder.write_all(body)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use flate2::read::GzDecoder;
    use serde_json::{json, Value};
    use std::io::Read;

    fn labels(pairs: &[(&str, &str)]) -> LabelSet {
        let mut set = LabelSet::new();
        for (k, v) in pairs {
            set.insert(k, *v);
        }
        set
    }

    fn record(nanos: i64, labels: LabelSet, line: &str) -> LogRecord {
        LogRecord::new(Utc.timestamp_nanos(nanos), labels, line)
    }

    #[test]
    fn test_single_record_body() {
        let records = vec![record(
            1_700_000_000_123_456_789,
            labels(&[("job", "api"), ("level", "Information")]),
            "[INFO] hello",
        )];

        let body: Value = serde_json::from_slice(&encode_push_request(&records).unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "streams": [{
                    "stream": {"job": "api", "level": "Information"},
                    "values": [["1700000000123456789", "[INFO] hello"]]
                }]
            })
        );
    }

    #[test]
    fn test_identical_labels_share_a_stream() {
        let a = labels(&[("job", "api"), ("level", "Error")]);
        let b = labels(&[("job", "api"), ("level", "Warning")]);
        let records = vec![
            record(1, a.clone(), "first"),
            record(2, b.clone(), "second"),
            record(3, a.clone(), "third"),
        ];

        let request = PushRequest::from_records(&records);
        assert_eq!(request.streams.len(), 2);
        assert_eq!(request.value_count(), 3);
        assert_eq!(request.streams[0].stream, &a);
        assert_eq!(
            request.streams[0].values,
            vec![("1".to_string(), "first"), ("3".to_string(), "third")]
        );
        assert_eq!(request.streams[1].stream, &b);
    }

    #[test]
    fn test_label_order_matters_for_grouping() {
        let a = labels(&[("job", "api"), ("level", "Error")]);
        let b = labels(&[("level", "Error"), ("job", "api")]);
        let records = vec![record(1, a, "x"), record(2, b, "y")];

        assert_eq!(PushRequest::from_records(&records).streams.len(), 2);
    }

    #[test]
    fn test_empty_batch() {
        let body = encode_push_request(&[]).unwrap();
        assert_eq!(body, br#"{"streams":[]}"#);
    }

    #[test]
    fn test_line_escaping() {
        let records = vec![record(5, LabelSet::new(), "quote \" and\nnewline")];
        let body: Value = serde_json::from_slice(&encode_push_request(&records).unwrap()).unwrap();
        assert_eq!(body["streams"][0]["values"][0][1], "quote \" and\nnewline");
    }

    #[test]
    fn test_gzip_roundtrip() {
        let records = vec![record(7, labels(&[("job", "gz")]), "compressed")];
        let body = encode_push_request(&records).unwrap();
        let compressed = gzip(&body).unwrap();

        let mut decoded = Vec::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, body);
    }
}
