use std::cmp::Ordering;
use std::io::Write;

use crate::error::SortError;
use crate::field::Field;

/// A record together with its sort key. Records compare by key only, records with equal keys
/// are equal and a stable sort keeps them in input order.
#[derive(Debug)]
pub(crate) struct LineRecord {
    line: String,
    key: String,
}

impl LineRecord {
    /// Create a record from a line as read from a file. A trailing "\n" or "\r\n" is dropped.
    pub(crate) fn new(mut line: String, field: &Field) -> Result<LineRecord, SortError> {
        trim_line_terminator(&mut line);
        let key = field.key(&line)?;
        Ok(
            LineRecord {
                line,
                key,
            }
        )
    }

    pub(crate) fn line(&self) -> &str {
        self.line.as_str()
    }

    pub(crate) fn write_to<W: Write>(&self, writer: &mut W, endl: &str) -> Result<(), std::io::Error> {
        writer.write_all(self.line.as_bytes())?;
        writer.write_all(endl.as_bytes())
    }
}

pub(crate) fn trim_line_terminator(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
}

impl Eq for LineRecord {}

impl PartialEq<Self> for LineRecord {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl PartialOrd<Self> for LineRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LineRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}
