//! One line of a hosts file
//!
//! A line is either comment-only, blank, or a data line holding an address
//! followed by zero or more names and an optional trailing comment.
//!
//! ```text
//! 127.0.0.1   localhost loopback   # local names
//! ^address    ^names               ^comment (" local names")
//! ```

use std::fmt;

use crate::error::LineParseError;
use crate::validate::is_valid_address;

/// Marker that starts a comment
pub const COMMENT_MARKER: char = '#';

/// A parsed hosts file line
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    address: Option<String>,
    names: Vec<String>,
    comment: Option<String>,
    raw: String,
    error: Option<LineParseError>,
}

impl Record {
    /// Parse a single line
    ///
    /// Never fails: an address with bad syntax is stored as-is and the
    /// record is flagged malformed.
    pub fn parse(raw: &str) -> Self {
        let mut record = Self {
            raw: raw.to_string(),
            ..Self::default()
        };

        let trimmed = raw.trim_start();
        if let Some(text) = trimmed.strip_prefix(COMMENT_MARKER) {
            record.comment = Some(text.to_string());
            return record;
        }

        let (fields, comment) = match raw.split_once(COMMENT_MARKER) {
            Some((fields, comment)) => (fields, Some(comment.to_string())),
            None => (raw, None),
        };

        let mut tokens = fields.split_whitespace();
        let Some(address) = tokens.next() else {
            return record;
        };

        if !is_valid_address(address) {
            record.error = Some(LineParseError {
                line: fields.to_string(),
            });
        }
        record.address = Some(address.to_string());
        record.names = tokens.map(str::to_string).collect();
        record.comment = comment;
        record
    }

    /// Build a data record from an address and names
    pub fn new(address: impl Into<String>, names: Vec<String>) -> Self {
        let mut record = Self {
            address: Some(address.into()),
            names,
            ..Self::default()
        };
        record.regen_raw();
        record
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Text after the first comment marker, verbatim
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// The line as last parsed or regenerated
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The parse failure, if the address was malformed
    pub fn error(&self) -> Option<&LineParseError> {
        self.error.as_ref()
    }

    pub fn is_comment_only(&self) -> bool {
        self.address.is_none() && self.raw.trim_start().starts_with(COMMENT_MARKER)
    }

    pub fn has_comment(&self) -> bool {
        self.comment.is_some()
    }

    /// True when the line carries an address (even a malformed one)
    pub fn is_valid(&self) -> bool {
        self.address.is_some()
    }

    pub fn is_malformed(&self) -> bool {
        self.error.is_some()
    }

    pub fn has_name(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Serialize the record back to a single line
    ///
    /// Lines without an address are returned exactly as read. Data lines
    /// are regenerated with single spaces between fields.
    pub fn to_line(&self) -> String {
        let Some(address) = &self.address else {
            return self.raw.clone();
        };

        let mut line = address.clone();
        for name in &self.names {
            line.push(' ');
            line.push_str(name);
        }
        if let Some(comment) = &self.comment {
            line.push(' ');
            line.push(COMMENT_MARKER);
            line.push_str(comment);
        }
        line
    }

    /// Drop repeated names, keeping the first occurrence
    pub fn remove_duplicate_names(&mut self) {
        let mut seen = Vec::with_capacity(self.names.len());
        self.names.retain(|name| {
            if seen.contains(name) {
                false
            } else {
                seen.push(name.clone());
                true
            }
        });
        self.regen_raw();
    }

    /// Sort names lexicographically
    pub fn sort_names(&mut self) {
        self.names.sort();
        self.regen_raw();
    }

    /// Append another record's names and comment to this one
    ///
    /// Names are not deduplicated.
    pub fn combine(&mut self, other: &Record) {
        self.names.extend(other.names.iter().cloned());

        let ours = self.comment.take().filter(|c| !c.is_empty());
        let theirs = other.comment.clone().filter(|c| !c.is_empty());
        self.comment = match (ours, theirs) {
            (Some(a), Some(b)) => Some(format!("{} {}", a, b)),
            (a, b) => a.or(b),
        };
        self.regen_raw();
    }

    pub(crate) fn push_name(&mut self, name: impl Into<String>) {
        self.names.push(name.into());
        self.regen_raw();
    }

    /// Keep only the names matching `keep`, returning how many were dropped
    pub(crate) fn retain_names(&mut self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let before = self.names.len();
        self.names.retain(|name| keep(name));
        let dropped = before - self.names.len();
        if dropped > 0 {
            self.regen_raw();
        }
        dropped
    }

    /// Split names after `at`, returning the tail
    pub(crate) fn split_names_off(&mut self, at: usize) -> Vec<String> {
        if at >= self.names.len() {
            return Vec::new();
        }
        let tail = self.names.split_off(at);
        self.regen_raw();
        tail
    }

    pub(crate) fn extend_names(&mut self, names: impl IntoIterator<Item = String>) {
        self.names.extend(names);
        self.regen_raw();
    }

    fn regen_raw(&mut self) {
        if self.address.is_some() {
            self.raw = self.to_line();
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let record = Record::parse("");
        assert_eq!(record.raw(), "");
        assert!(record.address().is_none());
        assert!(record.names().is_empty());
        assert!(!record.is_comment_only());
        assert!(!record.is_valid());
        assert!(!record.has_comment());
    }

    #[test]
    fn test_parse_comment_only() {
        let record = Record::parse("   # This is a comment   ");
        assert!(record.is_comment_only());
        assert!(record.has_comment());
        assert!(!record.is_valid());
        assert_eq!(record.comment(), Some(" This is a comment   "));
        assert_eq!(record.to_line(), "   # This is a comment   ");
    }

    #[test]
    fn test_parse_with_trailing_comment() {
        let record = Record::parse("127.0.0.1 test1 test2   # This is a comment   ");
        assert_eq!(record.address(), Some("127.0.0.1"));
        assert_eq!(record.names(), &["test1", "test2"]);
        assert_eq!(record.comment(), Some(" This is a comment   "));
        assert!(record.has_comment());
        assert!(!record.is_malformed());
        assert_eq!(record.raw(), "127.0.0.1 test1 test2   # This is a comment   ");
        assert_eq!(record.to_line(), "127.0.0.1 test1 test2 # This is a comment   ");
    }

    #[test]
    fn test_only_first_marker_splits() {
        let record = Record::parse("10.0.0.1 a # one # two");
        assert_eq!(record.names(), &["a"]);
        assert_eq!(record.comment(), Some(" one # two"));
        assert_eq!(record.to_line(), "10.0.0.1 a # one # two");
    }

    #[test]
    fn test_parse_bad_address() {
        let record = Record::parse("127.x.x.1 test1 test2   # This is a comment   ");
        assert_eq!(record.address(), Some("127.x.x.1"));
        assert_eq!(record.names(), &["test1", "test2"]);
        assert!(record.is_valid());
        assert!(record.is_malformed());
        assert_eq!(
            record.error().unwrap().line,
            "127.x.x.1 test1 test2   ".to_string()
        );
    }

    #[test]
    fn test_address_without_names() {
        let record = Record::parse("fe00::0 ");
        assert_eq!(record.address(), Some("fe00::0"));
        assert!(record.names().is_empty());
        assert_eq!(record.to_line(), "fe00::0");
    }

    #[test]
    fn test_whitespace_normalized() {
        let record = Record::parse("127.0.0.1\tlocalhost\t\tloopback");
        assert_eq!(record.to_line(), "127.0.0.1 localhost loopback");
        assert_eq!(record.to_string(), "127.0.0.1 localhost loopback");
    }

    #[test]
    fn test_new_regenerates_raw() {
        let record = Record::new("127.0.0.1", vec!["localhost".to_string()]);
        assert_eq!(record.raw(), "127.0.0.1 localhost");
        assert_eq!(record, Record::parse("127.0.0.1 localhost"));
    }

    #[test]
    fn test_remove_duplicate_names() {
        let mut record = Record::parse("127.0.0.1 test1 test1 test2 test1 test2");
        record.remove_duplicate_names();
        assert_eq!(record.names(), &["test1", "test2"]);
        assert_eq!(record.raw(), "127.0.0.1 test1 test2");
    }

    #[test]
    fn test_sort_names() {
        let mut record = Record::parse("127.0.0.1 zeta alpha mid # keep");
        record.sort_names();
        assert_eq!(record.raw(), "127.0.0.1 alpha mid zeta # keep");
    }

    #[test]
    fn test_combine() {
        let mut first = Record::parse("127.0.0.1 test1");
        let second = Record::parse("127.0.0.1 test2");
        first.combine(&second);
        assert_eq!(first.names().len(), 2);
        assert_eq!(first.to_line(), "127.0.0.1 test1 test2");

        let mut second = second;
        second.combine(&first);
        assert_eq!(second.to_line(), "127.0.0.1 test2 test1 test2");
    }

    #[test]
    fn test_combine_comments() {
        let mut first = Record::parse("127.0.0.2 prada yadda #comment1");
        first.combine(&Record::parse("127.0.0.2 tada abba #comment2"));
        assert_eq!(first.comment(), Some("comment1 comment2"));

        let mut plain = Record::parse("127.0.0.2 a");
        plain.combine(&Record::parse("127.0.0.2 b #only"));
        assert_eq!(plain.to_line(), "127.0.0.2 a b #only");

        let mut empty = Record::parse("127.0.0.2 a #");
        empty.combine(&Record::parse("127.0.0.2 b"));
        assert_eq!(empty.to_line(), "127.0.0.2 a b");
    }

    #[test]
    fn test_split_names_off() {
        let mut record = Record::parse("127.0.0.1 a b c d");
        let tail = record.split_names_off(3);
        assert_eq!(tail, vec!["d".to_string()]);
        assert_eq!(record.raw(), "127.0.0.1 a b c");
        assert!(record.split_names_off(3).is_empty());
    }

    #[test]
    fn test_comment_only_edits_keep_raw() {
        let mut record = Record::parse("#  spaced   out  ");
        record.sort_names();
        record.remove_duplicate_names();
        assert_eq!(record.raw(), "#  spaced   out  ");
    }
}
