//! Video telemetry extraction
//!
//! Delegates container parsing to the `mp4` crate and maps the exposed
//! metadata atoms (mvhd creation time, track dimensions, frame rate,
//! duration) onto the record. The container reader needs random access to a
//! real path, so stream-sourced input is spilled to a named temp file whose
//! drop guarantees deletion on every exit path, parser failures included.
//!
//! A parse failure is not a file failure: the record keeps its identity
//! fields and the video-specific fields stay absent.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use chrono::{DateTime, Datelike, NaiveDateTime};
use tracing::{debug, warn};

use crate::error::Result;
use crate::record::TelemetryRecord;

/// Seconds between the QuickTime epoch (1904-01-01) and the Unix epoch
const QT_EPOCH_OFFSET: u64 = 2_082_844_800;

/// Device clocks run UTC; the operations display timezone is UTC+8
const CLOCK_OFFSET_HOURS: i64 = 8;

/// Some devices stamp a placeholder creation time instead of a real clock
/// reading. Anything at or before this year is treated as that sentinel and
/// discarded, not as a validity bound on real footage.
const SENTINEL_YEAR_CUTOFF: i32 = 2010;

/// Fields the container reader exposes, before record mapping
struct ContainerInfo {
    creation_time: u64,
    duration_seconds: f64,
    width: Option<u32>,
    height: Option<u32>,
    frame_rate: Option<f64>,
}

/// Populate video fields of `record` from the container at `path`
pub(crate) fn extract(path: &Path, record: &mut TelemetryRecord) {
    match read_container(path) {
        Ok(info) => apply(info, record),
        Err(e) => {
            // No additional metadata available; identity fields stand
            warn!("container metadata unavailable for {}: {}", record.filename, e);
        }
    }
}

/// Stream-sourced variant: spill the stream to a scoped temp file and parse
/// that. The temp file is removed when this function returns, on success and
/// failure alike.
pub(crate) fn extract_stream<R: Read + Seek>(stream: &mut R, record: &mut TelemetryRecord) {
    let spilled = match spill_to_temp(stream, &record.filename) {
        Ok(tmp) => tmp,
        Err(e) => {
            warn!("cannot spill {} for container parsing: {}", record.filename, e);
            return;
        }
    };
    extract(spilled.path(), record);
    // `spilled` dropped here, deleting the temp file
}

fn spill_to_temp<R: Read + Seek>(
    stream: &mut R,
    filename: &str,
) -> io::Result<tempfile::NamedTempFile> {
    let suffix = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    let mut tmp = tempfile::Builder::new().suffix(&suffix).tempfile()?;
    stream.seek(SeekFrom::Start(0))?;
    io::copy(stream, tmp.as_file_mut())?;
    Ok(tmp)
}

fn read_container(path: &Path) -> Result<ContainerInfo> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    let reader = BufReader::new(file);

    let mp4 = mp4::Mp4Reader::read_header(reader, size)?;

    let mut info = ContainerInfo {
        creation_time: mp4.moov.mvhd.creation_time,
        duration_seconds: mp4.duration().as_secs_f64(),
        width: None,
        height: None,
        frame_rate: None,
    };

    // First video track carries the display attributes
    for track in mp4.tracks().values() {
        if matches!(track.track_type(), Ok(mp4::TrackType::Video)) {
            info.width = Some(u32::from(track.width()));
            info.height = Some(u32::from(track.height()));
            let rate = track.frame_rate();
            if rate > 0.0 {
                info.frame_rate = Some(rate);
            }
            break;
        }
    }

    Ok(info)
}

fn apply(info: ContainerInfo, record: &mut TelemetryRecord) {
    record.capture_time = creation_to_capture(info.creation_time);
    record.video_duration_seconds = Some(round2(info.duration_seconds));
    record.video_width = info.width;
    record.video_height = info.height;
    record.video_frame_rate = info.frame_rate;

    debug!(
        "container metadata for {}: {}x{} {:?}fps {:?}s",
        record.filename,
        info.width.unwrap_or(0),
        info.height.unwrap_or(0),
        record.video_frame_rate,
        record.video_duration_seconds,
    );
}

/// Map a raw mvhd creation time to a display-timezone capture time.
///
/// Values below the QuickTime epoch offset are taken as already-Unix, the
/// same leniency the mp4 tooling applies to noncompliant muxers. A creation
/// year at or before [`SENTINEL_YEAR_CUTOFF`] is a placeholder and yields no
/// capture time at all.
fn creation_to_capture(raw: u64) -> Option<NaiveDateTime> {
    if raw == 0 {
        return None;
    }
    let unix = if raw >= QT_EPOCH_OFFSET {
        raw - QT_EPOCH_OFFSET
    } else {
        raw
    };
    let utc = DateTime::from_timestamp(i64::try_from(unix).ok()?, 0)?.naive_utc();
    if utc.year() <= SENTINEL_YEAR_CUTOFF {
        return None;
    }
    Some(utc + chrono::Duration::hours(CLOCK_OFFSET_HOURS))
}

fn round2(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use std::io::Cursor;

    fn qt_time(datetime: &str) -> u64 {
        let unix = NaiveDateTime::parse_from_str(datetime, "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_utc()
            .timestamp() as u64;
        unix + QT_EPOCH_OFFSET
    }

    #[test]
    fn test_creation_time_gets_clock_offset() {
        let capture = creation_to_capture(qt_time("2024-06-01 10:30:00")).unwrap();
        assert_eq!(
            capture.date(),
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        );
        assert_eq!(capture.hour(), 18);
        assert_eq!(capture.minute(), 30);
    }

    #[test]
    fn test_sentinel_year_is_discarded() {
        assert!(creation_to_capture(qt_time("2005-01-01 00:00:00")).is_none());
        assert!(creation_to_capture(qt_time("2010-12-31 23:59:59")).is_none());
        assert!(creation_to_capture(qt_time("2011-01-01 00:00:01")).is_some());
        assert!(creation_to_capture(0).is_none());
    }

    #[test]
    fn test_pre_epoch_values_read_as_unix() {
        // A raw value below the QuickTime offset is already Unix seconds
        let unix = NaiveDateTime::parse_from_str("2024-03-01 00:00:00", "%Y-%m-%d %H:%M:%S")
            .unwrap()
            .and_utc()
            .timestamp() as u64;
        let capture = creation_to_capture(unix).unwrap();
        assert_eq!(capture.hour(), 8);
    }

    #[test]
    fn test_duration_rounding() {
        assert_eq!(round2(12.3456), 12.35);
        assert_eq!(round2(0.004), 0.0);
        assert_eq!(round2(3600.0), 3600.0);
    }

    #[test]
    fn test_malformed_container_degrades() {
        let mut record = TelemetryRecord::new("DJI_0002.mp4");
        let mut stream = Cursor::new(vec![0u8; 256]);
        extract_stream(&mut stream, &mut record);

        assert!(record.capture_time.is_none());
        assert!(record.video_duration_seconds.is_none());
        assert!(record.video_width.is_none());
        assert!(record.video_frame_rate.is_none());
    }
}
