use accel_helper_core::contract::{Operation, RequestFields, KEY_FILE, KEY_SRPATH};
use accel_helper_core::range::{file_len, read_range_base64};
use accel_helper_core::HelperError;
use serde_json::json;

use crate::adapters::process::CommandRunner;
use crate::adapters::process_context::ProcessContext;
use crate::config::HelperConfig;
use crate::handlers::dump::run_dump;
use crate::handlers::upload::{
    upload_fields_to_shared_filesystem, upload_to_object_storage, OssUploadRequest,
};
use crate::logging::{log_error, log_info};

/// Everything an operation needs besides the request itself.
#[derive(Clone, Copy)]
pub struct HelperContext<'a> {
    pub config: &'a HelperConfig,
    pub runner: &'a dyn CommandRunner,
    pub process: &'a ProcessContext,
}

/// Result of one request at the dispatcher boundary.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Text returned verbatim with a success status, including reported
    /// upload failures.
    Reply(String),
    /// Failure the HTTP adapter turns into an error status.
    Fatal(HelperError),
}

impl DispatchOutcome {
    fn from_fatal_result(result: Result<String, HelperError>) -> Self {
        match result {
            Ok(text) => Self::Reply(text),
            Err(error) => Self::Fatal(error),
        }
    }

    fn from_reported_result(operation: Operation, result: Result<String, HelperError>) -> Self {
        match result {
            Ok(text) => Self::Reply(text),
            Err(error) => {
                log_error(
                    "dispatcher",
                    "upload_failed",
                    json!({ "operation": operation.as_str(), "error": error.to_string() }),
                );
                Self::Reply(error.to_string())
            }
        }
    }
}

/// Performs the single operation selected by the request's `type` field.
pub fn dispatch(fields: &RequestFields, context: &HelperContext<'_>) -> DispatchOutcome {
    let operation = fields.operation();
    log_info(
        "dispatcher",
        "operation_selected",
        json!({ "operation": operation.as_str(), "file": fields.get(KEY_FILE) }),
    );

    match operation {
        Operation::Dump => DispatchOutcome::from_fatal_result(dump(fields, context)),
        Operation::OssUpload => DispatchOutcome::from_reported_result(
            operation,
            OssUploadRequest::from_fields(fields)
                .and_then(|request| upload_to_object_storage(context, &request)),
        ),
        Operation::NasUpload => DispatchOutcome::from_reported_result(
            operation,
            upload_fields_to_shared_filesystem(context, fields),
        ),
        Operation::Size => DispatchOutcome::from_fatal_result(size(fields)),
        Operation::RangeRead => DispatchOutcome::from_fatal_result(range_read(fields)),
    }
}

fn dump(fields: &RequestFields, context: &HelperContext<'_>) -> Result<String, HelperError> {
    let source_dir = fields.require(KEY_SRPATH)?;
    run_dump(context, source_dir, fields.get(KEY_FILE))
}

fn size(fields: &RequestFields) -> Result<String, HelperError> {
    let file = fields.require(KEY_FILE)?;
    Ok(file_len(file)?.to_string())
}

fn range_read(fields: &RequestFields) -> Result<String, HelperError> {
    let file = fields.require(KEY_FILE)?;
    let start = fields.start_offset()?;
    let size = fields.range_size()?;
    read_range_base64(file, start, size)
}
