use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;

use crate::error::HelperError;

/// Byte length of `path`. A file that does not exist reports zero.
pub fn file_len(path: impl AsRef<Path>) -> Result<u64, HelperError> {
    let path = path.as_ref();
    match std::fs::metadata(path) {
        Ok(metadata) => Ok(metadata.len()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(error) => Err(HelperError::io(
            format!("failed to stat {}", path.display()),
            error,
        )),
    }
}

/// Reads exactly `size` bytes at `start` and returns them base64-encoded.
pub fn read_range_base64(
    path: impl AsRef<Path>,
    start: i64,
    size: i32,
) -> Result<String, HelperError> {
    let bytes = read_range(path, start, size)?;
    Ok(BASE64_STANDARD.encode(bytes))
}

/// Reads exactly `size` bytes at `start`.
///
/// A window that runs past the end of the file is a
/// [`HelperError::ShortRead`], reported before any buffer is allocated. Short
/// reads are continued at the following offset.
pub fn read_range(path: impl AsRef<Path>, start: i64, size: i32) -> Result<Vec<u8>, HelperError> {
    let path = path.as_ref();
    let start = u64::try_from(start).map_err(|_| {
        HelperError::invalid_field("start", start.to_string(), "must not be negative")
    })?;
    let size = usize::try_from(size).map_err(|_| {
        HelperError::invalid_field("size", size.to_string(), "must not be negative")
    })?;

    let mut file = File::open(path)
        .map_err(|error| HelperError::io(format!("failed to open {}", path.display()), error))?;
    let len = file
        .metadata()
        .map_err(|error| HelperError::io(format!("failed to stat {}", path.display()), error))?
        .len();
    let available = len.saturating_sub(start);
    if available < size as u64 {
        return Err(HelperError::ShortRead {
            path: path.to_path_buf(),
            start,
            expected: size,
            actual: available as usize,
        });
    }

    file.seek(SeekFrom::Start(start)).map_err(|error| {
        HelperError::io(
            format!("failed to seek {} to {start}", path.display()),
            error,
        )
    })?;

    let mut buffer = vec![0u8; size];
    let mut filled = 0usize;
    while filled < size {
        match file.read(&mut buffer[filled..]) {
            Ok(0) => {
                return Err(HelperError::ShortRead {
                    path: path.to_path_buf(),
                    start,
                    expected: size,
                    actual: filled,
                });
            }
            Ok(read) => filled += read,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => {
                return Err(HelperError::io(
                    format!("failed to read {}", path.display()),
                    error,
                ));
            }
        }
    }

    Ok(buffer)
}
