//! Still-image telemetry extraction
//!
//! Two passes over the same byte stream. Pass 1 reads the standard EXIF tag
//! block (timestamp, model, GPS, altitude). Pass 2 re-reads a bounded prefix
//! of the file as best-effort text and merges the vendor XMP fragments found
//! there. Pass 2 supersedes pass 1 for everything except the two coordinate
//! fields, where the tag block wins (see [`crate::xmp::Precedence`]).
//!
//! Nothing here fails the file: a missing or corrupt tag block, an
//! unparsable timestamp, or an unreadable window each degrade to absent
//! fields.

use std::io::{BufReader, Read, Seek, SeekFrom};

use chrono::NaiveDateTime;
use exif::{In, Tag, Value};
use tracing::debug;

use crate::gps::dms_to_decimal;
use crate::record::TelemetryRecord;
use crate::xmp;

/// Prefix window scanned for vendor fragments. Devices place the XMP packet
/// near the head of the file, well inside this bound.
const VENDOR_SCAN_WINDOW: usize = 50_000;

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Populate `record` from a still-image stream. The stream's final read
/// position is unspecified afterwards.
pub(crate) fn extract<R: Read + Seek>(stream: &mut R, record: &mut TelemetryRecord) {
    read_tag_block(stream, record);

    // Model defaults even when the tag block is missing entirely
    if record.drone_model.is_none() {
        record.drone_model = Some("Unknown".to_string());
    }

    scan_vendor_window(stream, record);
}

fn read_tag_block<R: Read + Seek>(stream: &mut R, record: &mut TelemetryRecord) {
    if let Err(e) = stream.seek(SeekFrom::Start(0)) {
        debug!("cannot rewind {} for tag block: {}", record.filename, e);
        return;
    }

    let mut reader = BufReader::new(&mut *stream);
    let exif_data = match exif::Reader::new().read_from_container(&mut reader) {
        Ok(data) => data,
        Err(e) => {
            debug!("no usable tag block in {}: {}", record.filename, e);
            return;
        }
    };

    let get_ascii = |tag: Tag| -> Option<String> {
        exif_data
            .get_field(tag, In::PRIMARY)
            .and_then(|f| match &f.value {
                Value::Ascii(v) if !v.is_empty() => {
                    let s = String::from_utf8_lossy(&v[0]);
                    let s = s.trim_matches('\0').trim();
                    (!s.is_empty()).then(|| s.to_string())
                }
                _ => None,
            })
    };

    let get_rationals = |tag: Tag| -> Option<Vec<(u32, u32)>> {
        exif_data
            .get_field(tag, In::PRIMARY)
            .and_then(|f| match &f.value {
                Value::Rational(v) if !v.is_empty() => {
                    Some(v.iter().map(|r| (r.num, r.denom)).collect())
                }
                _ => None,
            })
    };

    if let Some(raw) = get_ascii(Tag::DateTimeOriginal) {
        // Unparsable timestamps stay absent
        record.capture_time = NaiveDateTime::parse_from_str(&raw, EXIF_DATETIME_FORMAT).ok();
    }

    record.drone_model = get_ascii(Tag::Model);

    // Both coordinates or neither; a lone latitude is useless downstream.
    // Missing reference tags default to the northern/eastern hemispheres.
    if let (Some(lat), Some(lon)) = (
        get_rationals(Tag::GPSLatitude),
        get_rationals(Tag::GPSLongitude),
    ) {
        let lat_ref = get_ascii(Tag::GPSLatitudeRef)
            .and_then(|s| s.chars().next())
            .unwrap_or('N');
        let lon_ref = get_ascii(Tag::GPSLongitudeRef)
            .and_then(|s| s.chars().next())
            .unwrap_or('E');
        record.gps_latitude = Some(dms_to_decimal(&lat, lat_ref));
        record.gps_longitude = Some(dms_to_decimal(&lon, lon_ref));
    }

    if let Some((num, den)) = get_rationals(Tag::GPSAltitude).and_then(|v| v.first().copied()) {
        if den != 0 {
            record.absolute_altitude = Some(f64::from(num) / f64::from(den));
        }
    }
}

fn scan_vendor_window<R: Read + Seek>(stream: &mut R, record: &mut TelemetryRecord) {
    if let Err(e) = stream.seek(SeekFrom::Start(0)) {
        debug!("cannot rewind {} for vendor scan: {}", record.filename, e);
        return;
    }

    let mut window = vec![0u8; VENDOR_SCAN_WINDOW];
    let mut filled = 0;
    while filled < window.len() {
        match stream.read(&mut window[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) => {
                // Scan whatever arrived before the error
                debug!("vendor scan read failed for {}: {}", record.filename, e);
                break;
            }
        }
    }
    if filled == 0 {
        return;
    }

    let text = String::from_utf8_lossy(&window[..filled]);
    xmp::apply_fragments(record, &text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn fake_jpeg_with(body: &[u8]) -> Cursor<Vec<u8>> {
        // SOI marker plus arbitrary bytes; not a conforming JPEG, which is
        // exactly the degraded case the extractor must survive
        let mut bytes = vec![0xff, 0xd8];
        bytes.extend_from_slice(body);
        Cursor::new(bytes)
    }

    #[test]
    fn test_sparse_image_degrades_to_model_fallback() {
        let mut stream = fake_jpeg_with(b"no metadata in here at all");
        let mut record = TelemetryRecord::new("DJI_0001.jpg");
        extract(&mut stream, &mut record);

        assert_eq!(record.drone_model.as_deref(), Some("Unknown"));
        assert!(record.capture_time.is_none());
        assert!(record.gps_latitude.is_none());
        assert!(record.relative_altitude.is_none());
        assert!(record.rtk_flag.is_none());
    }

    #[test]
    fn test_vendor_fragments_found_without_tag_block() {
        let mut stream = fake_jpeg_with(
            br#"<rdf:Description drone-dji:DroneModel="M3E"
                drone-dji:RelativeAltitude="+33.40"
                drone-dji:GpsLatitude="30.5"
                drone-dji:RtkFlag="50"/>"#,
        );
        let mut record = TelemetryRecord::new("DJI_0001.jpg");
        extract(&mut stream, &mut record);

        assert_eq!(record.drone_model.as_deref(), Some("M3E"));
        assert_eq!(record.relative_altitude, Some(33.4));
        assert_eq!(record.gps_latitude, Some(30.5));
        assert_eq!(record.rtk_flag, Some(50));
    }

    #[test]
    fn test_fragment_outside_window_is_not_seen() {
        let mut body = vec![b'x'; VENDOR_SCAN_WINDOW + 100];
        let inside = br#"drone-dji:GimbalPitchDegree="-90.0""#;
        body[100..100 + inside.len()].copy_from_slice(inside);
        let outside = br#"drone-dji:GimbalYawDegree="45.0""#;
        let at = VENDOR_SCAN_WINDOW + 10;
        body.resize(at + outside.len() + 10, b'x');
        body[at..at + outside.len()].copy_from_slice(outside);

        let mut stream = fake_jpeg_with(&body);
        let mut record = TelemetryRecord::new("DJI_0001.jpg");
        extract(&mut stream, &mut record);

        assert_eq!(record.gimbal_pitch, Some(-90.0));
        assert!(record.gimbal_yaw.is_none());
    }
}
