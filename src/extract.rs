//! Record assembly and dispatch
//!
//! Owns the one-record-per-file contract: initialize every field to absent,
//! decide the still/video path from the filename extension, inject the
//! identity fields (size, paths, content hash), and hand the stream to the
//! matching extractor. Every per-field failure below this point degrades;
//! the only error a caller ever sees is a source that cannot be read at all.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use tracing::debug;

use crate::error::{Result, TelemetryError};
use crate::hash;
use crate::record::{FileType, TelemetryRecord};
use crate::{still, video};

/// Extract one record from a file on disk.
///
/// Fails only when the file cannot be opened or read at all; sparse or
/// corrupt metadata still yields a record.
pub fn extract_path(path: &Path) -> Result<TelemetryRecord> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());
    let mut record = TelemetryRecord::new(&filename);

    let mut file = File::open(path).map_err(|e| TelemetryError::Unreadable {
        file: filename.clone(),
        source: e,
    })?;
    probe_readable(&mut file, &filename)?;

    record.full_path = Some(
        path.canonicalize()
            .unwrap_or_else(|_| path.to_path_buf())
            .to_string_lossy()
            .to_string(),
    );
    record.folder_name = path
        .parent()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string());
    record.file_size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    record.content_hash = hash::hash_path(path);

    match record.file_type {
        FileType::Jpeg => still::extract(&mut file, &mut record),
        FileType::Video => video::extract(path, &mut record),
        FileType::Unknown => {
            debug!("unrecognized extension on {}, identity fields only", filename)
        }
    }

    Ok(record)
}

/// Extract one record from an in-memory or uploaded stream.
///
/// The stream's read position on return is unspecified. Stream-sourced video
/// gets no content hash (the container pass works on a spilled temp copy;
/// see DESIGN.md).
pub fn extract_stream<R: Read + Seek>(stream: &mut R, filename: &str) -> Result<TelemetryRecord> {
    let mut record = TelemetryRecord::new(filename);

    probe_readable(stream, filename)?;

    record.file_size = stream_len(stream).unwrap_or(0);
    record.content_hash = match record.file_type {
        FileType::Video => None,
        _ => hash::hash_stream(stream),
    };

    match record.file_type {
        FileType::Jpeg => still::extract(stream, &mut record),
        FileType::Video => video::extract_stream(stream, &mut record),
        FileType::Unknown => {
            debug!("unrecognized extension on {}, identity fields only", filename)
        }
    }

    Ok(record)
}

/// Top-level readability probe. Everything after this degrades per-field, so
/// this is the single place an unreadable source turns into an error.
fn probe_readable<R: Read + Seek>(stream: &mut R, filename: &str) -> Result<()> {
    stream
        .seek(SeekFrom::Start(0))
        .and_then(|_| {
            let mut probe = [0u8; 1];
            stream.read(&mut probe).map(|_| ())
        })
        .map_err(|e| TelemetryError::Unreadable {
            file: filename.to_string(),
            source: e,
        })
}

fn stream_len<R: Seek>(stream: &mut R) -> Option<u64> {
    let len = stream.seek(SeekFrom::End(0)).ok()?;
    stream.seek(SeekFrom::Start(0)).ok()?;
    Some(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// A stream whose every read fails, as an aborted upload would
    struct BrokenStream;

    impl Read for BrokenStream {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "gone"))
        }
    }

    impl Seek for BrokenStream {
        fn seek(&mut self, _pos: SeekFrom) -> std::io::Result<u64> {
            Ok(0)
        }
    }

    #[test]
    fn test_unreadable_stream_is_an_explicit_failure() {
        let err = extract_stream(&mut BrokenStream, "DJI_0001.jpg").unwrap_err();
        match err {
            TelemetryError::Unreadable { file, .. } => assert_eq!(file, "DJI_0001.jpg"),
            other => panic!("expected Unreadable, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_stream_still_yields_a_record() {
        // Zero bytes is readable, just empty
        let mut stream = Cursor::new(Vec::<u8>::new());
        let record = extract_stream(&mut stream, "empty.jpg").unwrap();
        assert_eq!(record.file_type, FileType::Jpeg);
        assert_eq!(record.file_size, 0);
        assert!(record.content_hash.is_some());
    }

    #[test]
    fn test_stream_size_and_hash_for_unknown_type() {
        let mut stream = Cursor::new(vec![1u8, 2, 3, 4, 5]);
        let record = extract_stream(&mut stream, "flight_log.txt").unwrap();
        assert_eq!(record.file_type, FileType::Unknown);
        assert_eq!(record.file_size, 5);
        assert!(record.content_hash.is_some());
        assert!(record.full_path.is_none());
        assert!(record.folder_name.is_none());
    }

    #[test]
    fn test_stream_video_has_no_hash() {
        let mut stream = Cursor::new(vec![0u8; 64]);
        let record = extract_stream(&mut stream, "clip.mp4").unwrap();
        assert_eq!(record.file_type, FileType::Video);
        assert_eq!(record.file_size, 64);
        assert!(record.content_hash.is_none());
    }

    #[test]
    fn test_missing_path_is_unreadable() {
        let err = extract_path(Path::new("/nonexistent/DJI_0001.jpg")).unwrap_err();
        assert!(matches!(err, TelemetryError::Unreadable { .. }));
    }
}
