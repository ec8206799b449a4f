//! Board archive codec.
//!
//! Archives are JSON lines. The first line is a header, every following line
//! is a typed record:
//!
//! ```text
//! {"version":1,"date":1760486400000}
//! {"type":"block","data":{"id":"...","fields":{"type":"board",...},...}}
//! {"type":"block","data":{...}}
//! ```
//!
//! Record types other than `block` are skipped so newer writers can add
//! record kinds without breaking older readers.

use std::io::{BufRead, Write};

use serde::{Deserialize, Serialize};
use tabula_types::Block;

use crate::error::{ClientError, ClientResult};

/// Current archive format version.
pub const ARCHIVE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct ArchiveHeader {
    version: u32,
    date: u64,
}

#[derive(Serialize)]
struct BlockLine<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    data: &'a Block,
}

/// A full export of a store's blocks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Archive {
    /// Export time (Unix millis).
    pub date: u64,
    pub blocks: Vec<Block>,
}

impl Archive {
    /// Create an archive stamped with the current time.
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            date: tabula_types::now_millis(),
            blocks,
        }
    }

    /// Write the archive as JSON lines.
    pub fn write_to(&self, mut w: impl Write) -> ClientResult<()> {
        let header = ArchiveHeader {
            version: ARCHIVE_VERSION,
            date: self.date,
        };
        serde_json::to_writer(&mut w, &header)?;
        w.write_all(b"\n")?;
        for block in &self.blocks {
            serde_json::to_writer(&mut w, &BlockLine { kind: "block", data: block })?;
            w.write_all(b"\n")?;
        }
        w.flush()?;
        Ok(())
    }

    /// Read an archive from JSON lines.
    pub fn read_from(r: impl BufRead) -> ClientResult<Self> {
        let mut lines = r.lines();

        let header_line = loop {
            match lines.next() {
                Some(line) => {
                    let line = line?;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Err(ClientError::archive("missing header line")),
            }
        };
        let header: ArchiveHeader = serde_json::from_str(&header_line)
            .map_err(|e| ClientError::archive(format!("bad header: {e}")))?;
        if header.version != ARCHIVE_VERSION {
            return Err(ClientError::archive(format!(
                "unsupported archive version {} (expected {ARCHIVE_VERSION})",
                header.version
            )));
        }

        let mut blocks = Vec::new();
        for (n, line) in lines.enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let mut record: serde_json::Value = serde_json::from_str(&line)?;
            match record.get("type").and_then(|t| t.as_str()) {
                Some("block") => {
                    let data = record
                        .get_mut("data")
                        .map(serde_json::Value::take)
                        .ok_or_else(|| ClientError::archive(format!("line {}: block without data", n + 2)))?;
                    blocks.push(serde_json::from_value(data)?);
                }
                other => {
                    tracing::debug!(line = n + 2, record_type = ?other, "skipping archive record");
                }
            }
        }

        Ok(Self {
            date: header.date,
            blocks,
        })
    }

    /// Encode to a JSON lines string.
    pub fn to_jsonl(&self) -> ClientResult<String> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        String::from_utf8(buf).map_err(|e| ClientError::archive(e.to_string()))
    }

    /// Decode from a JSON lines string.
    pub fn from_jsonl(s: &str) -> ClientResult<Self> {
        Self::read_from(s.as_bytes())
    }
}
