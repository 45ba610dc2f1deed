//! JSON-lines record input.

use std::fmt;
use std::path::PathBuf;

use contracts::TelemetryRecord;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader, Lines};

use crate::error::{CliError, Result};

/// Where records are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    /// `-` selects stdin, anything else is a file path
    pub fn parse(arg: &str) -> Self {
        match arg {
            "-" => Self::Stdin,
            path => Self::File(PathBuf::from(path)),
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => f.write_str("<stdin>"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Reads one `TelemetryRecord` per line
///
/// Blank lines are skipped. A malformed line yields `CliError::InvalidRecord`
/// and the reader moves on to the next line.
pub struct RecordReader {
    lines: Lines<Box<dyn AsyncBufRead + Unpin + Send>>,
    line_no: u64,
}

impl RecordReader {
    pub async fn open(source: &InputSource) -> Result<Self> {
        match source {
            InputSource::Stdin => Ok(Self::from_reader(tokio::io::stdin())),
            InputSource::File(path) => {
                if !path.exists() {
                    return Err(CliError::input_not_found(path.display().to_string()));
                }
                let file = tokio::fs::File::open(path).await?;
                Ok(Self::from_reader(file))
            }
        }
    }

    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffered: Box<dyn AsyncBufRead + Unpin + Send> = Box::new(BufReader::new(reader));
        Self {
            lines: buffered.lines(),
            line_no: 0,
        }
    }

    /// Lines consumed so far
    pub fn line_number(&self) -> u64 {
        self.line_no
    }

    /// Next record, or `Ok(None)` at end of input
    pub async fn next_record(&mut self) -> Result<Option<TelemetryRecord>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            return serde_json::from_str(line)
                .map(Some)
                .map_err(|e| CliError::invalid_record(self.line_no, e.to_string()));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::RecordKind;

    const INPUT: &str = r#"{"type":"point","metric":"cpu","value":0.5,"timestamp":"2024-01-01T00:00:00Z"}

{"type":"event","event_type":"deploy","timestamp":"2024-01-01T00:00:01Z"}
not json
{"type":"span","trace_id":"abc","id":"1"}
"#;

    #[tokio::test]
    async fn test_reads_records_and_skips_blank_lines() {
        let mut reader = RecordReader::from_reader(INPUT.as_bytes());

        let first = reader.next_record().await.unwrap().unwrap();
        assert_eq!(first.kind(), RecordKind::Points);

        let second = reader.next_record().await.unwrap().unwrap();
        assert_eq!(second.kind(), RecordKind::Events);
        assert_eq!(reader.line_number(), 3);

        let err = reader.next_record().await.unwrap_err();
        assert!(matches!(err, CliError::InvalidRecord { line: 4, .. }));

        let third = reader.next_record().await.unwrap().unwrap();
        assert_eq!(third.kind(), RecordKind::Spans);

        assert!(reader.next_record().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_open_missing_file() {
        let source = InputSource::parse("/definitely/not/here.jsonl");
        let err = RecordReader::open(&source).await.err().unwrap();
        assert!(matches!(err, CliError::InputNotFound { .. }));
    }

    #[test]
    fn test_input_source_parse() {
        assert_eq!(InputSource::parse("-"), InputSource::Stdin);
        assert_eq!(
            InputSource::parse("records.jsonl"),
            InputSource::File(PathBuf::from("records.jsonl"))
        );
    }
}
