//! Output records produced by a pane's output log.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One newline-delimited line captured from a pane.
///
/// `seq` increases monotonically per pane and is never reused, so callers
/// can poll with `lines_since(seq)` and detect gaps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputLine {
    pub seq: u64,
    pub at: DateTime<Utc>,
    pub text: String,
}

/// A raw output chunk delivered to a subscriber.
///
/// `truncated` is set on the first chunk delivered after one or more chunks
/// were dropped because the subscriber's channel was full.
#[derive(Debug, Clone)]
pub struct OutputChunk {
    pub data: Bytes,
    pub at: DateTime<Utc>,
    pub truncated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_line_json_fields() {
        let line = OutputLine {
            seq: 42,
            at: Utc::now(),
            text: "hello".into(),
        };
        let json = serde_json::to_string(&line).unwrap();
        assert!(json.contains("\"seq\":42"));
        assert!(json.contains("\"text\":\"hello\""));
    }

    #[test]
    fn test_output_chunk_flags() {
        let chunk = OutputChunk {
            data: Bytes::from_static(b"abc"),
            at: Utc::now(),
            truncated: true,
        };
        assert_eq!(&chunk.data[..], b"abc");
        assert!(chunk.truncated);
    }
}
