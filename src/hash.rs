//! Content hashing
//!
//! MD5 hex digests over full file content, computed in fixed-size chunks.
//! The digest is a pure function of the bytes (never of path or name) and is
//! used downstream as a dedup key. Hashing failures are not errors: callers
//! get `None` and treat the dedup key as unknown.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use tracing::debug;

const CHUNK_SIZE: usize = 8192;

/// Digest the file at `path`. `None` on any I/O error.
pub fn hash_path(path: &Path) -> Option<String> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            debug!("cannot open {} for hashing: {}", path.display(), e);
            return None;
        }
    };
    digest_to_eof(&mut file)
}

/// Digest a seekable stream from its start. The read position is restored to
/// its pre-call value on every exit path, so hashing is invisible to later
/// read passes. `None` on any I/O error.
pub fn hash_stream<R: Read + Seek>(stream: &mut R) -> Option<String> {
    let original_pos = stream.stream_position().ok()?;
    stream.seek(SeekFrom::Start(0)).ok()?;

    let digest = digest_to_eof(stream);

    // Restore even when digesting failed partway
    if stream.seek(SeekFrom::Start(original_pos)).is_err() {
        return None;
    }
    digest
}

fn digest_to_eof<R: Read>(reader: &mut R) -> Option<String> {
    let mut context = md5::Context::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => context.consume(&buf[..n]),
            Err(e) => {
                debug!("read failed while hashing: {}", e);
                return None;
            }
        }
    }
    Some(format!("{:x}", context.compute()))
}
