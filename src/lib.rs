//! drone_telemetry - flight/camera telemetry extraction for survey drone media
//!
//! Given a raw file byte stream or path, recovers capture time, GPS position,
//! gimbal/flight attitude and speed, RTK precision indicators, laser
//! rangefinder targets, and video attributes into one fixed-schema
//! [`TelemetryRecord`] per file. Partially corrupt, truncated, or sparse
//! files degrade field by field instead of failing the batch; the only
//! per-file error is a source that cannot be read at all.
//!
//! Still images are read twice: the standard EXIF tag block, then a bounded
//! text window scanned for vendor `drone-dji:` XMP fragments. Video metadata
//! comes from the MP4/MOV container atoms. Storage, dedup, and batch
//! orchestration all live with the caller.

mod error;
mod extract;
mod still;
mod video;

pub mod gps;
pub mod hash;
pub mod record;
pub mod xmp;

pub use error::TelemetryError;
pub use extract::{extract_path, extract_stream};
pub use record::{FileType, TelemetryRecord, RTK_FLAG_FIXED};

pub type Result<T> = std::result::Result<T, TelemetryError>;
