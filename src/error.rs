use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The source could not be read at all. This is the only failure the
    /// dispatcher surfaces to callers; everything below it degrades per-field.
    #[error("unreadable source {file}: {source}")]
    Unreadable {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("container parse error: {0}")]
    Container(#[from] mp4::Error),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
