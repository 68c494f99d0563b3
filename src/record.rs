//! Canonical telemetry record
//!
//! One `TelemetryRecord` per processed file, with every field always present.
//! Absent values are explicit `None`s so downstream consumers branch on
//! values, never on missing keys. Populated from the EXIF tag block and the
//! vendor XMP fragments for stills, or from the container atoms for video.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// RTK solution flag reported by the device protocol for a fixed
/// (high-precision) solution. Protocol convention, not derivable.
pub const RTK_FLAG_FIXED: i64 = 50;

/// File class, decided from the filename extension alone. Parsing outcome
/// never changes it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Jpeg,
    Video,
    #[default]
    Unknown,
}

impl FileType {
    pub fn from_filename(filename: &str) -> Self {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("jpg") | Some("jpeg") => FileType::Jpeg,
            Some("mp4") | Some("mov") => FileType::Video,
            _ => FileType::Unknown,
        }
    }
}

/// Flight/camera telemetry extracted from one survey drone media file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryRecord {
    // ---- Identity / provenance ----
    /// Original filename (with extension)
    pub filename: String,

    /// Absolute source path, when the input was a filesystem path
    pub full_path: Option<String>,

    /// Name of the immediate parent directory, when a path was supplied
    pub folder_name: Option<String>,

    /// File size in bytes (0 when it could not be determined)
    pub file_size: u64,

    pub file_type: FileType,

    /// MD5 hex digest of the full content, used as a dedup key downstream.
    /// Absent when the content could not be hashed.
    pub content_hash: Option<String>,

    // ---- Temporal ----
    /// Capture timestamp; absent when unparsable or a known device
    /// placeholder
    pub capture_time: Option<NaiveDateTime>,

    // ---- Device ----
    pub drone_model: Option<String>,
    pub drone_serial: Option<String>,
    pub camera_serial: Option<String>,
    pub protocol_version: Option<String>,
    pub image_source: Option<String>,

    // ---- Position ----
    /// Signed decimal degrees (south negative)
    pub gps_latitude: Option<f64>,
    /// Signed decimal degrees (west negative)
    pub gps_longitude: Option<f64>,
    pub absolute_altitude: Option<f64>,
    pub relative_altitude: Option<f64>,
    pub altitude_type: Option<String>,
    pub gps_status: Option<String>,

    // ---- Gimbal / flight attitude ----
    pub gimbal_roll: Option<f64>,
    pub gimbal_yaw: Option<f64>,
    pub gimbal_pitch: Option<f64>,
    pub flight_roll: Option<f64>,
    pub flight_yaw: Option<f64>,
    pub flight_pitch: Option<f64>,
    /// 0/1 per device protocol
    pub cam_reverse: Option<i64>,
    /// 0/1 per device protocol
    pub gimbal_reverse: Option<i64>,

    // ---- Flight speed ----
    pub flight_x_speed: Option<f64>,
    pub flight_y_speed: Option<f64>,
    pub flight_z_speed: Option<f64>,

    // ---- RTK precision ----
    /// See [`RTK_FLAG_FIXED`]
    pub rtk_flag: Option<i64>,
    pub rtk_std_lon: Option<f64>,
    pub rtk_std_lat: Option<f64>,
    pub rtk_std_hgt: Option<f64>,
    pub surveying_mode: Option<String>,

    // ---- Laser rangefinder ----
    pub lrf_status: Option<String>,
    pub lrf_target_distance: Option<f64>,
    pub lrf_target_lon: Option<f64>,
    pub lrf_target_lat: Option<f64>,
    pub lrf_target_alt: Option<f64>,
    pub lrf_target_abs_alt: Option<f64>,

    // ---- Mission ----
    pub flight_line_info: Option<String>,

    // ---- Video-only ----
    /// Seconds, rounded to 2 decimals
    pub video_duration_seconds: Option<f64>,
    pub video_frame_rate: Option<f64>,
    pub video_width: Option<u32>,
    pub video_height: Option<u32>,
}

impl TelemetryRecord {
    /// Fresh record for `filename` with every metadata field absent and
    /// `file_type` already decided from the extension.
    pub fn new(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            file_type: FileType::from_filename(filename),
            ..Default::default()
        }
    }

    /// Both coordinates present. Note that `0.0` can also be the converter's
    /// fallback for a malformed tag, so a `true` here is not a plausibility
    /// check.
    pub fn has_position(&self) -> bool {
        self.gps_latitude.is_some() && self.gps_longitude.is_some()
    }

    /// Device reported a fixed RTK solution
    pub fn is_rtk_fixed(&self) -> bool {
        self.rtk_flag == Some(RTK_FLAG_FIXED)
    }

    pub fn video_resolution(&self) -> Option<(u32, u32)> {
        match (self.video_width, self.video_height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_from_extension() {
        assert_eq!(FileType::from_filename("DJI_0001.JPG"), FileType::Jpeg);
        assert_eq!(FileType::from_filename("DJI_0001.jpeg"), FileType::Jpeg);
        assert_eq!(FileType::from_filename("DJI_0002.MP4"), FileType::Video);
        assert_eq!(FileType::from_filename("clip.mov"), FileType::Video);
        assert_eq!(FileType::from_filename("notes.txt"), FileType::Unknown);
        assert_eq!(FileType::from_filename("no_extension"), FileType::Unknown);
        assert_eq!(FileType::from_filename(""), FileType::Unknown);
    }

    #[test]
    fn test_new_record_is_all_absent() {
        let record = TelemetryRecord::new("DJI_0001.jpg");
        assert_eq!(record.filename, "DJI_0001.jpg");
        assert_eq!(record.file_type, FileType::Jpeg);
        assert_eq!(record.file_size, 0);
        assert!(record.content_hash.is_none());
        assert!(record.capture_time.is_none());
        assert!(record.gps_latitude.is_none());
        assert!(record.rtk_flag.is_none());
        assert!(record.video_duration_seconds.is_none());
    }

    #[test]
    fn test_rtk_fixed_flag() {
        let mut record = TelemetryRecord::new("DJI_0001.jpg");
        assert!(!record.is_rtk_fixed());
        record.rtk_flag = Some(16);
        assert!(!record.is_rtk_fixed());
        record.rtk_flag = Some(RTK_FLAG_FIXED);
        assert!(record.is_rtk_fixed());
    }

    #[test]
    fn test_record_serializes_with_all_fields() {
        let record = TelemetryRecord::new("notes.txt");
        let json = serde_json::to_value(&record).unwrap();
        // Absent fields serialize as explicit nulls, never as missing keys
        assert_eq!(json["file_type"], "unknown");
        assert!(json["gps_latitude"].is_null());
        assert!(json["lrf_status"].is_null());
        assert!(json.get("video_frame_rate").is_some());
    }
}
