//! Vendor XMP fragment scanning
//!
//! Survey drones embed flight telemetry as `drone-dji:Name="value"` text
//! fragments inside the image file, outside the EXIF tag block. This module
//! scans a decoded text window for those fragments and merges them into the
//! record.
//!
//! The recognized tags live in one declarative table: tag name, declared
//! target type, and merge precedence. Adding a vendor field is a table row
//! plus its record slot, not new control flow. Coercion returns an `Option`
//! so a malformed value leaves the field at its prior value and the scan
//! continues.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::record::TelemetryRecord;

/// XMP namespace prefix the fragments are keyed under
pub const VENDOR_NAMESPACE: &str = "drone-dji";

/// Target type a fragment value is coerced into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Float,
    Int,
}

/// How a fragment value merges with what the EXIF pass already set.
///
/// Coordinates are `KeepExisting`: the tag block is the primary source and a
/// fragment must never overwrite it. Every other tag is `Replace`: the
/// fragment supersedes the tag-block value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    Replace,
    KeepExisting,
}

/// Recognized vendor tags: (tag, declared type, precedence)
pub const VENDOR_FIELDS: &[(&str, FieldKind, Precedence)] = &[
    // Device
    ("Version", FieldKind::Text, Precedence::Replace),
    ("ImageSource", FieldKind::Text, Precedence::Replace),
    ("DroneModel", FieldKind::Text, Precedence::Replace),
    ("DroneSerialNumber", FieldKind::Text, Precedence::Replace),
    ("CameraSerialNumber", FieldKind::Text, Precedence::Replace),
    // Position
    ("GpsStatus", FieldKind::Text, Precedence::Replace),
    ("AltitudeType", FieldKind::Text, Precedence::Replace),
    ("GpsLatitude", FieldKind::Float, Precedence::KeepExisting),
    ("GpsLongitude", FieldKind::Float, Precedence::KeepExisting),
    ("AbsoluteAltitude", FieldKind::Float, Precedence::Replace),
    ("RelativeAltitude", FieldKind::Float, Precedence::Replace),
    // Gimbal / flight attitude
    ("GimbalRollDegree", FieldKind::Float, Precedence::Replace),
    ("GimbalYawDegree", FieldKind::Float, Precedence::Replace),
    ("GimbalPitchDegree", FieldKind::Float, Precedence::Replace),
    ("FlightRollDegree", FieldKind::Float, Precedence::Replace),
    ("FlightYawDegree", FieldKind::Float, Precedence::Replace),
    ("FlightPitchDegree", FieldKind::Float, Precedence::Replace),
    ("CamReverse", FieldKind::Int, Precedence::Replace),
    ("GimbalReverse", FieldKind::Int, Precedence::Replace),
    // Flight speed
    ("FlightXSpeed", FieldKind::Float, Precedence::Replace),
    ("FlightYSpeed", FieldKind::Float, Precedence::Replace),
    ("FlightZSpeed", FieldKind::Float, Precedence::Replace),
    // RTK
    ("RtkFlag", FieldKind::Int, Precedence::Replace),
    ("RtkStdLon", FieldKind::Float, Precedence::Replace),
    ("RtkStdLat", FieldKind::Float, Precedence::Replace),
    ("RtkStdHgt", FieldKind::Float, Precedence::Replace),
    ("SurveyingMode", FieldKind::Text, Precedence::Replace),
    // Laser rangefinder
    ("LRFStatus", FieldKind::Text, Precedence::Replace),
    ("LRFTargetDistance", FieldKind::Float, Precedence::Replace),
    ("LRFTargetLon", FieldKind::Float, Precedence::Replace),
    ("LRFTargetLat", FieldKind::Float, Precedence::Replace),
    ("LRFTargetAlt", FieldKind::Float, Precedence::Replace),
    ("LRFTargetAbsAlt", FieldKind::Float, Precedence::Replace),
    // Mission
    ("FlightLineInfo", FieldKind::Text, Precedence::Replace),
];

/// One fragment anywhere in the window: `drone-dji:Name="value"`
static FRAGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"drone-dji:([A-Za-z]+)="([^"]+)""#).unwrap());

/// A fragment value after coercion to its declared type
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Float(f64),
    Int(i64),
}

/// Coerce a captured fragment string to its declared type. `None` means the
/// value is malformed for that type and the field keeps its prior value.
pub fn coerce(raw: &str, kind: FieldKind) -> Option<FieldValue> {
    match kind {
        FieldKind::Text => Some(FieldValue::Text(raw.to_string())),
        FieldKind::Float => raw.trim().parse::<f64>().ok().map(FieldValue::Float),
        FieldKind::Int => raw.trim().parse::<i64>().ok().map(FieldValue::Int),
    }
}

/// Scan `text` for vendor fragments and merge them into `record`.
///
/// The first occurrence of each tag wins within the window; later duplicates
/// are ignored. Unrecognized tags and uncoercible values are skipped without
/// aborting the scan.
pub fn apply_fragments(record: &mut TelemetryRecord, text: &str) {
    let mut seen: HashSet<&str> = HashSet::new();

    for caps in FRAGMENT_RE.captures_iter(text) {
        let tag = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let raw = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

        let Some(&(name, kind, precedence)) =
            VENDOR_FIELDS.iter().find(|(name, _, _)| *name == tag)
        else {
            continue;
        };
        if !seen.insert(name) {
            continue;
        }
        let Some(value) = coerce(raw, kind) else {
            continue;
        };
        assign(record, name, value, precedence);
    }
}

fn set_text(slot: &mut Option<String>, value: String, precedence: Precedence) {
    if precedence == Precedence::KeepExisting && slot.is_some() {
        return;
    }
    *slot = Some(value);
}

fn set_float(slot: &mut Option<f64>, value: f64, precedence: Precedence) {
    if precedence == Precedence::KeepExisting && slot.is_some() {
        return;
    }
    *slot = Some(value);
}

fn set_int(slot: &mut Option<i64>, value: i64, precedence: Precedence) {
    if precedence == Precedence::KeepExisting && slot.is_some() {
        return;
    }
    *slot = Some(value);
}

/// Route a coerced value to its record slot. The table and this mapping are
/// the complete definition of the merge; nothing else writes vendor fields.
fn assign(record: &mut TelemetryRecord, tag: &str, value: FieldValue, precedence: Precedence) {
    use FieldValue::*;

    match (tag, value) {
        ("Version", Text(v)) => set_text(&mut record.protocol_version, v, precedence),
        ("ImageSource", Text(v)) => set_text(&mut record.image_source, v, precedence),
        ("DroneModel", Text(v)) => set_text(&mut record.drone_model, v, precedence),
        ("DroneSerialNumber", Text(v)) => set_text(&mut record.drone_serial, v, precedence),
        ("CameraSerialNumber", Text(v)) => set_text(&mut record.camera_serial, v, precedence),
        ("GpsStatus", Text(v)) => set_text(&mut record.gps_status, v, precedence),
        ("AltitudeType", Text(v)) => set_text(&mut record.altitude_type, v, precedence),
        ("GpsLatitude", Float(v)) => set_float(&mut record.gps_latitude, v, precedence),
        ("GpsLongitude", Float(v)) => set_float(&mut record.gps_longitude, v, precedence),
        ("AbsoluteAltitude", Float(v)) => set_float(&mut record.absolute_altitude, v, precedence),
        ("RelativeAltitude", Float(v)) => set_float(&mut record.relative_altitude, v, precedence),
        ("GimbalRollDegree", Float(v)) => set_float(&mut record.gimbal_roll, v, precedence),
        ("GimbalYawDegree", Float(v)) => set_float(&mut record.gimbal_yaw, v, precedence),
        ("GimbalPitchDegree", Float(v)) => set_float(&mut record.gimbal_pitch, v, precedence),
        ("FlightRollDegree", Float(v)) => set_float(&mut record.flight_roll, v, precedence),
        ("FlightYawDegree", Float(v)) => set_float(&mut record.flight_yaw, v, precedence),
        ("FlightPitchDegree", Float(v)) => set_float(&mut record.flight_pitch, v, precedence),
        ("CamReverse", Int(v)) => set_int(&mut record.cam_reverse, v, precedence),
        ("GimbalReverse", Int(v)) => set_int(&mut record.gimbal_reverse, v, precedence),
        ("FlightXSpeed", Float(v)) => set_float(&mut record.flight_x_speed, v, precedence),
        ("FlightYSpeed", Float(v)) => set_float(&mut record.flight_y_speed, v, precedence),
        ("FlightZSpeed", Float(v)) => set_float(&mut record.flight_z_speed, v, precedence),
        ("RtkFlag", Int(v)) => set_int(&mut record.rtk_flag, v, precedence),
        ("RtkStdLon", Float(v)) => set_float(&mut record.rtk_std_lon, v, precedence),
        ("RtkStdLat", Float(v)) => set_float(&mut record.rtk_std_lat, v, precedence),
        ("RtkStdHgt", Float(v)) => set_float(&mut record.rtk_std_hgt, v, precedence),
        ("SurveyingMode", Text(v)) => set_text(&mut record.surveying_mode, v, precedence),
        ("LRFStatus", Text(v)) => set_text(&mut record.lrf_status, v, precedence),
        ("LRFTargetDistance", Float(v)) => {
            set_float(&mut record.lrf_target_distance, v, precedence)
        }
        ("LRFTargetLon", Float(v)) => set_float(&mut record.lrf_target_lon, v, precedence),
        ("LRFTargetLat", Float(v)) => set_float(&mut record.lrf_target_lat, v, precedence),
        ("LRFTargetAlt", Float(v)) => set_float(&mut record.lrf_target_alt, v, precedence),
        ("LRFTargetAbsAlt", Float(v)) => set_float(&mut record.lrf_target_abs_alt, v, precedence),
        ("FlightLineInfo", Text(v)) => set_text(&mut record.flight_line_info, v, precedence),
        _ => {}
    }
}
