//! Result record extraction from the agent's line-oriented stdout.
//!
//! The agent prints log chatter and JSON messages interleaved on stdout. Only
//! the last JSON object matters: it carries the final `subtype` and the
//! answer text. [`ResultExtractor`] folds the line stream down to that single
//! record without keeping any history.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Subtype the agent reports when the task completed.
pub const SUCCESS_SUBTYPE: &str = "success";

/// The last syntactically valid JSON object line seen on stdout.
///
/// Stored verbatim; interpretation happens in [`ResultRecord::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord(String);

impl ResultRecord {
    /// Accept `line` if it is a JSON object, otherwise return `None`.
    pub fn from_line(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return None;
        }
        serde_json::from_str::<Map<String, Value>>(line)
            .ok()
            .map(|_| Self(line.to_string()))
    }

    /// The raw line as the agent printed it.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Interpret the record as a [`ResultMessage`].
    pub fn parse(&self) -> Result<ResultMessage, serde_json::Error> {
        serde_json::from_str(&self.0)
    }
}

/// Typed view of the final result message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResultMessage {
    /// `"success"` when the agent completed its task.
    pub subtype: String,

    /// Optional message body carrying the answer.
    #[serde(default)]
    pub message: Option<ResultBody>,
}

/// Message body of a result record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResultBody {
    #[serde(default)]
    pub content: Vec<ResultContent>,
}

/// One content block. Only text blocks carry anything we use.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResultContent {
    #[serde(default)]
    pub text: Option<String>,
}

impl ResultMessage {
    /// Returns true if the agent reported success.
    pub fn is_success(&self) -> bool {
        self.subtype == SUCCESS_SUBTYPE
    }

    /// Text of the first content block, if any.
    pub fn text(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|body| body.content.first())
            .and_then(|content| content.text.as_deref())
    }
}

/// Last-write-wins reducer over stdout lines.
///
/// `observe` consumes the accumulator and returns the next one, so the
/// extractor can be driven by `Iterator::fold` or by a streaming loop alike.
#[derive(Debug, Clone, Default)]
pub struct ResultExtractor {
    last: Option<ResultRecord>,
    accepted: u64,
    discarded: u64,
}

impl ResultExtractor {
    /// Fold one line into the accumulator.
    #[must_use]
    pub fn observe(mut self, line: &str) -> Self {
        if line.trim().is_empty() {
            return self;
        }
        match ResultRecord::from_line(line) {
            Some(record) => {
                self.last = Some(record);
                self.accepted += 1;
            }
            None => self.discarded += 1,
        }
        self
    }

    /// Fold a whole sequence of lines.
    pub fn extract<I, S>(lines: I) -> Option<ResultRecord>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        lines
            .into_iter()
            .fold(Self::default(), |acc, line| acc.observe(line.as_ref()))
            .finish()
    }

    /// Number of lines accepted as JSON objects.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Number of non-blank lines dropped.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    /// Consume the accumulator, yielding the retained record.
    pub fn finish(self) -> Option<ResultRecord> {
        self.last
    }
}
