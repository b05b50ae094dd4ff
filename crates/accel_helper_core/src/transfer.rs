//! Client side of the archive transfer: a deployer asks a running helper to
//! dump and archive, pulls the archive back in base64 range reads, and
//! unpacks it locally.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use tar::Archive;

use crate::contract::{
    request_body, KEY_FILE, KEY_SIZE, KEY_SRPATH, KEY_START, KEY_TYPE, SUCCESS_MARKER,
};
use crate::error::HelperError;

pub const DEFAULT_PART_SIZE: u32 = 3 * 1024 * 1024;
pub const DEFAULT_ARCHIVE_PATH: &str = "/tmp/srctl.tar.gz";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangePart {
    pub part_id: usize,
    pub start: u64,
    pub size: u32,
}

impl RangePart {
    pub fn end_exclusive(&self) -> u64 {
        self.start + u64::from(self.size)
    }
}

/// Sends one request body to a helper and returns the response text.
///
/// Implementations map non-success HTTP statuses to errors.
pub trait HelperTransport {
    fn post(&self, body: &str) -> Result<String, HelperError>;
}

impl<F> HelperTransport for F
where
    F: Fn(&str) -> Result<String, HelperError>,
{
    fn post(&self, body: &str) -> Result<String, HelperError> {
        self(body)
    }
}

/// Splits `[0, total_len)` into contiguous parts of at most `part_size` bytes.
pub fn plan_range_parts(total_len: u64, part_size: u32) -> Result<Vec<RangePart>, HelperError> {
    if part_size == 0 {
        return Err(HelperError::invalid_field(
            "part_size",
            "0",
            "must be a positive integer",
        ));
    }

    let part_count = total_len.div_ceil(u64::from(part_size));
    let mut parts = Vec::with_capacity(usize::try_from(part_count).unwrap_or_default());
    let mut cursor = 0u64;
    while cursor < total_len {
        let remaining = total_len - cursor;
        let size = remaining.min(u64::from(part_size)) as u32;
        parts.push(RangePart {
            part_id: parts.len(),
            start: cursor,
            size,
        });
        cursor += u64::from(size);
    }

    validate_parts(total_len, &parts)?;
    Ok(parts)
}

fn validate_parts(total_len: u64, parts: &[RangePart]) -> Result<(), HelperError> {
    let mut expected_start = 0u64;
    for part in parts {
        if part.start != expected_start || part.size == 0 {
            return Err(HelperError::Transport(format!(
                "range plan is not contiguous at part {}",
                part.part_id
            )));
        }
        expected_start = part.end_exclusive();
    }

    if expected_start != total_len {
        return Err(HelperError::Transport(format!(
            "range plan covers {expected_start} of {total_len} bytes"
        )));
    }

    Ok(())
}

/// Asks the helper to dump into `source_dir` and archive it to `archive`.
///
/// Returns the helper's report when it starts with the success marker.
pub fn trigger_dump(
    transport: &impl HelperTransport,
    source_dir: &str,
    archive: &str,
) -> Result<String, HelperError> {
    let body = request_body(&[
        (KEY_SRPATH, source_dir),
        (KEY_TYPE, "dump"),
        (KEY_FILE, archive),
    ]);
    let report = transport.post(&body)?;
    if report.starts_with(SUCCESS_MARKER) {
        Ok(report)
    } else {
        Err(HelperError::Remote(report))
    }
}

pub fn query_size(transport: &impl HelperTransport, file: &str) -> Result<u64, HelperError> {
    let body = request_body(&[(KEY_TYPE, "size"), (KEY_FILE, file)]);
    let reply = transport.post(&body)?;
    let trimmed = reply.trim();
    trimmed
        .parse::<u64>()
        .map_err(|_| HelperError::Remote(format!("unexpected size reply: {trimmed}")))
}

pub fn fetch_part(
    transport: &impl HelperTransport,
    file: &str,
    part: &RangePart,
) -> Result<Vec<u8>, HelperError> {
    let start = part.start.to_string();
    let size = part.size.to_string();
    let body = request_body(&[(KEY_START, &start), (KEY_SIZE, &size), (KEY_FILE, file)]);
    let reply = transport.post(&body)?;

    let bytes = BASE64_STANDARD.decode(reply.trim()).map_err(|error| {
        HelperError::Remote(format!(
            "part {} is not valid base64 ({error}): {}",
            part.part_id,
            preview(&reply)
        ))
    })?;

    if bytes.len() != part.size as usize {
        return Err(HelperError::Remote(format!(
            "part {} returned {} bytes, expected {}",
            part.part_id,
            bytes.len(),
            part.size
        )));
    }

    Ok(bytes)
}

/// Downloads `file` from the helper by range reads and reassembles it.
pub fn download_file(
    transport: &impl HelperTransport,
    file: &str,
    part_size: u32,
) -> Result<Vec<u8>, HelperError> {
    let total_len = query_size(transport, file)?;
    let parts = plan_range_parts(total_len, part_size)?;

    let mut contents = Vec::with_capacity(usize::try_from(total_len).unwrap_or_default());
    for part in &parts {
        contents.extend_from_slice(&fetch_part(transport, file, part)?);
    }

    Ok(contents)
}

pub fn archive_digest(contents: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(contents);
    format!("{:x}", hasher.finalize())
}

/// Unpacks a gzip-compressed tar stream into `dest`, creating it if needed.
pub fn unpack_archive(archive: impl Read, dest: &Path) -> Result<(), HelperError> {
    fs::create_dir_all(dest).map_err(|source| HelperError::CreateDir {
        dir: dest.to_path_buf(),
        source,
    })?;
    Archive::new(GzDecoder::new(archive))
        .unpack(dest)
        .map_err(|error| {
            HelperError::io(format!("failed to unpack into {}", dest.display()), error)
        })
}

/// Unpacks the downloaded archive at `archive_path` into `dest` and deletes it.
pub fn extract_downloaded_archive(archive_path: &Path, dest: &Path) -> Result<(), HelperError> {
    let file = File::open(archive_path).map_err(|error| {
        HelperError::io(format!("failed to open {}", archive_path.display()), error)
    })?;
    unpack_archive(file, dest)?;
    fs::remove_file(archive_path).map_err(|error| {
        HelperError::io(
            format!("failed to remove {}", archive_path.display()),
            error,
        )
    })
}

fn preview(text: &str) -> &str {
    let end = text
        .char_indices()
        .nth(120)
        .map(|(index, _)| index)
        .unwrap_or(text.len());
    &text[..end]
}
