use std::fs;
use std::io;
use std::path::Path;

use crate::errors::PrepError;

/// Byte encoding of a source CSV file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SourceEncoding {
    /// UTF-8.
    #[default]
    Utf8,
    /// ISO-8859-1; every byte maps to the code point of the same value.
    Latin1,
}

/// Read `path` fully and decode it with `encoding`.
pub fn read_to_string_with(path: &Path, encoding: SourceEncoding) -> Result<String, PrepError> {
    let bytes = fs::read(path)?;
    decode_bytes(bytes, encoding).map_err(|err| {
        PrepError::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{}: {err}", path.display()),
        ))
    })
}

fn decode_bytes(bytes: Vec<u8>, encoding: SourceEncoding) -> Result<String, String> {
    match encoding {
        SourceEncoding::Utf8 => {
            let bytes = bytes
                .strip_prefix(b"\xEF\xBB\xBF")
                .map(<[u8]>::to_vec)
                .unwrap_or(bytes);
            String::from_utf8(bytes).map_err(|err| err.to_string())
        }
        SourceEncoding::Latin1 => Ok(bytes.into_iter().map(char::from).collect()),
    }
}

/// Create the parent directory of `path` when it has one.
pub fn ensure_parent_dir(path: &Path) -> Result<(), PrepError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn latin1_maps_high_bytes_to_code_points() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("abt.csv");
        fs::write(&path, b"caf\xE9 \xAE").unwrap();
        let text = read_to_string_with(&path, SourceEncoding::Latin1).unwrap();
        assert_eq!(text, "café ®");
    }

    #[test]
    fn utf8_rejects_invalid_bytes_and_strips_bom() {
        let temp = tempdir().unwrap();
        let bad = temp.path().join("bad.csv");
        fs::write(&bad, b"caf\xE9").unwrap();
        assert!(matches!(
            read_to_string_with(&bad, SourceEncoding::Utf8),
            Err(PrepError::Io(_))
        ));

        let bom = temp.path().join("bom.csv");
        fs::write(&bom, b"\xEF\xBB\xBFsubject_id").unwrap();
        assert_eq!(
            read_to_string_with(&bom, SourceEncoding::Utf8).unwrap(),
            "subject_id"
        );
    }

    #[test]
    fn ensure_parent_dir_creates_nested_dirs() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("a/b/c.bin");
        ensure_parent_dir(&path).unwrap();
        assert!(temp.path().join("a/b").is_dir());
        ensure_parent_dir(Path::new("plain.bin")).unwrap();
    }
}
