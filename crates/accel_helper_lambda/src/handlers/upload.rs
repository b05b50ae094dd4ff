use std::path::Path;

use accel_helper_core::contract::{
    RequestFields, KEY_ACCESS_KEY_ID, KEY_ACCESS_KEY_SECRET, KEY_BUCKET, KEY_ENDPOINT, KEY_FILE,
    KEY_NAS_FILE_PATH, SUCCESS_MARKER,
};
use accel_helper_core::HelperError;
use serde_json::json;

use crate::adapters::process::{run_step, CommandInvocation};
use crate::handlers::dispatch::HelperContext;
use crate::logging::log_info;

const OSS_SCHEME: &str = "oss://";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OssUploadRequest<'a> {
    pub file_path: &'a str,
    pub access_key_id: &'a str,
    pub access_key_secret: &'a str,
    pub endpoint: &'a str,
    pub bucket: &'a str,
}

impl<'a> OssUploadRequest<'a> {
    pub fn from_fields(fields: &'a RequestFields) -> Result<Self, HelperError> {
        Ok(Self {
            file_path: fields.require(KEY_FILE)?,
            access_key_id: fields.require(KEY_ACCESS_KEY_ID)?,
            access_key_secret: fields.require(KEY_ACCESS_KEY_SECRET)?,
            endpoint: fields.require(KEY_ENDPOINT)?,
            bucket: fields.require(KEY_BUCKET)?,
        })
    }
}

/// Text after the last `/`, or the whole path when there is none.
pub fn object_name(file_path: &str) -> &str {
    match file_path.rfind('/') {
        Some(index) => &file_path[index + 1..],
        None => file_path,
    }
}

/// `my-bucket` becomes `oss://my-bucket/`.
pub fn normalize_bucket(bucket: &str) -> String {
    let mut normalized = bucket.to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    if !normalized.starts_with(OSS_SCHEME) {
        normalized.insert_str(0, OSS_SCHEME);
    }
    normalized
}

/// Uploads a file to object storage with the bundled storage CLI.
///
/// Steps run strictly in order and the first failing step aborts the upload.
pub fn upload_to_object_storage(
    context: &HelperContext<'_>,
    request: &OssUploadRequest<'_>,
) -> Result<String, HelperError> {
    let bucket = normalize_bucket(request.bucket);
    let object_path = format!("{bucket}{}", object_name(request.file_path));
    let endpoint = request.endpoint;
    let work_dir = &context.config.work_dir;
    let packaged_cli = context.config.storage_cli.to_string_lossy().into_owned();
    let cli = context
        .config
        .staged_storage_cli
        .to_string_lossy()
        .into_owned();
    let credentials = [
        "-e",
        endpoint,
        "-i",
        request.access_key_id,
        "-k",
        request.access_key_secret,
    ];

    let steps = [
        (
            CommandInvocation::new("cp", work_dir).args([packaged_cli.as_str(), cli.as_str()]),
            "cp ossutil64 success".to_string(),
            "cp ossutil64 error".to_string(),
        ),
        (
            CommandInvocation::new("chmod", work_dir).args(["u+x", cli.as_str()]),
            "chmod u+x ossutil64 success".to_string(),
            "chmod u+x ossutil64 error".to_string(),
        ),
        (
            CommandInvocation::new("ping", work_dir).args(["-c", "1", "-W", "1", endpoint]),
            format!("oss endpoint [{endpoint}] is reachable"),
            format!("oss endpoint [{endpoint}] is unreachable"),
        ),
        (
            CommandInvocation::new(cli.as_str(), work_dir)
                .args(["mb", bucket.as_str()])
                .args(credentials),
            format!("create oss bucket [{bucket}] success"),
            format!("create oss bucket [{bucket}] error"),
        ),
        (
            CommandInvocation::new(cli.as_str(), work_dir)
                .args(["cp", request.file_path, object_path.as_str(), "-f"])
                .args(credentials),
            format!(
                "upload file {} to oss [{object_path}] success",
                request.file_path
            ),
            format!(
                "upload file {} to oss [{object_path}] error",
                request.file_path
            ),
        ),
        (
            CommandInvocation::new(cli.as_str(), work_dir)
                .args(["stat", object_path.as_str()])
                .args(credentials),
            format!("stat oss file {object_path} success"),
            format!("stat oss file {object_path} error"),
        ),
    ];

    for (invocation, success_message, failure_message) in &steps {
        run_step(context.runner, invocation, success_message, failure_message)?;
    }

    log_info(
        "oss_upload",
        "upload_completed",
        json!({ "file": request.file_path, "object": object_path }),
    );
    Ok(SUCCESS_MARKER.to_string())
}

/// Copies `source` onto a mounted shared filesystem at `destination`.
pub fn upload_to_shared_filesystem(
    context: &HelperContext<'_>,
    source: &str,
    destination: &str,
) -> Result<String, HelperError> {
    let destination_path = Path::new(destination);
    let parent = destination_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .ok_or_else(|| {
            HelperError::invalid_field(KEY_NAS_FILE_PATH, destination, "has no parent directory")
        })?;

    if !parent.exists() {
        std::fs::create_dir_all(parent).map_err(|source| HelperError::CreateDir {
            dir: parent.to_path_buf(),
            source,
        })?;
    }

    let existed = destination_path.exists();

    run_step(
        context.runner,
        &CommandInvocation::new("cp", &context.config.work_dir).args([source, destination]),
        &format!("copied {source} to {destination}"),
        &format!("copy {source} to {destination} encountered error"),
    )?;

    if !destination_path.exists() {
        return Ok(format!("nas file {destination} does not exist"));
    }

    log_info(
        "nas_upload",
        "upload_completed",
        json!({ "file": source, "destination": destination, "overwritten": existed }),
    );
    if existed {
        Ok(format!("{SUCCESS_MARKER} (overwritten)"))
    } else {
        Ok(SUCCESS_MARKER.to_string())
    }
}

/// Reads `file` and `nasFilePath` from the request and runs the copy.
pub fn upload_fields_to_shared_filesystem(
    context: &HelperContext<'_>,
    fields: &RequestFields,
) -> Result<String, HelperError> {
    let source = fields.require(KEY_FILE)?;
    let destination = fields.require(KEY_NAS_FILE_PATH)?;
    upload_to_shared_filesystem(context, source, destination)
}
