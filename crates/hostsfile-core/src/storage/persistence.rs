//! Hosts file persistence
//!
//! Reading strips a leading byte-order mark and accepts both `\n` and
//! `\r\n` terminated lines. Content must be UTF-8; anything else is a read
//! error so the file is never rewritten with replacement characters. Writing truncates the target in place (a hosts
//! file is often a bind mount or owned by root, so it is never replaced by
//! rename) and terminates every line with the configured ending.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::config::LineEnding;
use crate::error::{HostsError, HostsResult};

const BOM: char = '\u{feff}';

/// Read every line of the file at `path`
///
/// Invalid UTF-8 fails with `ReadError` (`InvalidData`).
pub fn read_lines(path: &Path) -> HostsResult<Vec<String>> {
    let content = fs::read_to_string(path).map_err(|e| HostsError::from_read(e, path))?;
    Ok(split_lines(&content).map(str::to_string).collect())
}

/// Split text into lines, dropping a leading byte-order mark
pub fn split_lines(content: &str) -> impl Iterator<Item = &str> {
    content.strip_prefix(BOM).unwrap_or(content).lines()
}

/// Truncate `path` and write each line followed by `ending`
pub fn write_lines<I, S>(path: &Path, lines: I, ending: LineEnding) -> HostsResult<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let file = File::create(path).map_err(|e| HostsError::from_write(e, path))?;

    let mut writer = BufWriter::new(&file);
    for line in lines {
        writer
            .write_all(line.as_ref().as_bytes())
            .and_then(|_| writer.write_all(ending.as_str().as_bytes()))
            .map_err(|e| HostsError::from_write(e, path))?;
    }
    writer.flush().map_err(|e| HostsError::from_write(e, path))?;
    drop(writer);

    file.sync_all()
        .map_err(|e| HostsError::from_write(e, path))?;
    Ok(())
}

/// True when `path` exists and can be opened for writing
pub fn is_writable(path: &Path) -> bool {
    OpenOptions::new().write(true).open(path).is_ok()
}

/// Copy the bytes of `from` to `to`, replacing `to`
pub fn copy_file(from: &Path, to: &Path) -> HostsResult<()> {
    let bytes = fs::read(from).map_err(|e| HostsError::from_read(e, from))?;
    fs::write(to, bytes).map_err(|e| HostsError::from_write(e, to))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_split_lines_strips_bom_and_cr() {
        let content = "\u{feff}127.0.0.1 localhost\r\n# comment\r\n::1 localhost";
        let lines: Vec<&str> = split_lines(content).collect();
        assert_eq!(lines, vec!["127.0.0.1 localhost", "# comment", "::1 localhost"]);
    }

    #[test]
    fn test_split_lines_keeps_blank_lines() {
        let lines: Vec<&str> = split_lines("a\n\nb\n").collect();
        assert_eq!(lines, vec!["a", "", "b"]);
        assert_eq!(split_lines("").count(), 0);
    }

    #[test]
    fn test_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hosts");

        write_lines(&path, ["127.0.0.1 localhost", "# end"], LineEnding::Crlf).unwrap();
        let bytes = fs::read_to_string(&path).unwrap();
        assert_eq!(bytes, "127.0.0.1 localhost\r\n# end\r\n");

        let lines = read_lines(&path).unwrap();
        assert_eq!(lines, vec!["127.0.0.1 localhost", "# end"]);
    }

    #[test]
    fn test_write_truncates() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hosts");
        fs::write(&path, "a very long previous content\nline two\n").unwrap();

        write_lines(&path, ["short"], LineEnding::Lf).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "short\n");
    }

    #[test]
    fn test_read_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let err = read_lines(&temp_dir.path().join("noexist")).unwrap_err();
        assert!(matches!(err, HostsError::NotFound { .. }));
    }

    #[test]
    fn test_read_rejects_invalid_utf8() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hosts");
        fs::write(&path, b"# caf\xe9 r\xe9seau\n127.0.0.1 localhost # \xff\n").unwrap();

        let err = read_lines(&path).unwrap_err();
        match err {
            HostsError::ReadError { source, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::InvalidData);
            }
            other => panic!("expected ReadError, got {:?}", other),
        }
    }

    #[test]
    fn test_write_into_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let err = write_lines(temp_dir.path(), ["x"], LineEnding::Lf).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_is_writable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hosts");
        assert!(!is_writable(&path));

        fs::write(&path, "").unwrap();
        assert!(is_writable(&path));
    }

    #[test]
    fn test_copy_file() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("hosts");
        let to = temp_dir.path().join("hosts.bak");
        fs::write(&from, "127.0.0.1 localhost\n").unwrap();

        copy_file(&from, &to).unwrap();
        assert_eq!(fs::read_to_string(&to).unwrap(), "127.0.0.1 localhost\n");

        let err = copy_file(&temp_dir.path().join("missing"), &to).unwrap_err();
        assert!(matches!(err, HostsError::NotFound { .. }));
    }
}
