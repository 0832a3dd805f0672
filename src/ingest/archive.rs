//! Zip archive extraction
//!
//! Regional exports ship as a zip with a single CSV inside. Anything else
//! (an empty archive, several candidate files) is ambiguous and aborts.

use crate::series::{PipelineError, PipelineResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read the only file in a zip archive
///
/// Returns the member's name and its bytes. Directory entries are ignored
/// when counting members.
pub fn read_single_member(archive_path: &Path) -> PipelineResult<(String, Vec<u8>)> {
    let file = File::open(archive_path).map_err(|e| PipelineError::io(archive_path, e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| PipelineError::Zip {
        archive: archive_path.to_path_buf(),
        source: e,
    })?;

    let mut members = Vec::new();
    for i in 0..archive.len() {
        let entry = archive.by_index(i).map_err(|e| PipelineError::Zip {
            archive: archive_path.to_path_buf(),
            source: e,
        })?;
        if !entry.is_dir() {
            members.push(i);
        }
    }

    let index = match members.as_slice() {
        [only] => *only,
        [] => {
            return Err(PipelineError::Archive {
                archive: archive_path.to_path_buf(),
                reason: "archive contains no files".to_string(),
            })
        }
        many => {
            return Err(PipelineError::Archive {
                archive: archive_path.to_path_buf(),
                reason: format!("archive contains {} files, expected exactly one", many.len()),
            })
        }
    };

    let mut entry = archive.by_index(index).map_err(|e| PipelineError::Zip {
        archive: archive_path.to_path_buf(),
        source: e,
    })?;
    let name = entry.name().to_string();

    let mut data = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut data).map_err(|e| PipelineError::Archive {
        archive: archive_path.to_path_buf(),
        reason: format!("failed to read {}: {}", name, e),
    })?;

    tracing::debug!(archive = ?archive_path, member = %name, bytes = data.len(), "Extracted archive member");
    Ok((name, data))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Write a zip at `path` holding the given (name, content) members
    pub(crate) fn write_zip(path: &Path, members: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        for (name, content) in members {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_reads_single_member() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alerts.zip");
        write_zip(&path, &[("alerts.csv", "a,b\n1,2\n")]);

        let (name, data) = read_single_member(&path).unwrap();
        assert_eq!(name, "alerts.csv");
        assert_eq!(data, b"a,b\n1,2\n");
    }

    #[test]
    fn test_multiple_members_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("two.zip");
        write_zip(&path, &[("a.csv", "x"), ("b.csv", "y")]);

        let err = read_single_member(&path).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("two.zip"));
    }

    #[test]
    fn test_empty_archive_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.zip");
        write_zip(&path, &[]);

        let err = read_single_member(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Archive { .. }));
    }

    #[test]
    fn test_not_a_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.zip");
        std::fs::write(&path, "not a zip").unwrap();

        let err = read_single_member(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Zip { .. }));
    }

    #[test]
    fn test_missing_archive() {
        let err = read_single_member(Path::new("/nonexistent/alerts.zip")).unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}
