use accel_helper_core::contract::parse_body;
use accel_helper_core::HelperError;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::handlers::dispatch::{dispatch, DispatchOutcome, HelperContext};
use crate::logging::{log_error, log_info};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiGatewayResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub headers: Value,
    pub body: String,
}

/// Handles one HTTP trigger event end to end.
pub fn handle_http_event(event: Value, context: &HelperContext<'_>) -> ApiGatewayResponse {
    match extract_body_text(&event) {
        Ok(body) => handle_http_body(&body, context),
        Err(error) => fatal_response(&error),
    }
}

/// Handles a request whose body has already been read as text.
pub fn handle_http_body(body: &str, context: &HelperContext<'_>) -> ApiGatewayResponse {
    let fields = parse_body(body);
    log_info(
        "http_adapter",
        "request_received",
        json!({ "body_length": body.len(), "field_count": fields.len() }),
    );

    match dispatch(&fields, context) {
        DispatchOutcome::Reply(text) => text_response(200, text),
        DispatchOutcome::Fatal(error) => fatal_response(&error),
    }
}

/// The request body as one line of text.
///
/// Accepts runtime events with a `body` string (optionally base64-encoded) or a
/// bare string event. Line breaks (`\n`, `\r\n` or a lone `\r`) are dropped so
/// the payload reads as a single line.
pub fn extract_body_text(event: &Value) -> Result<String, HelperError> {
    let raw = match event {
        Value::String(text) => text.clone(),
        Value::Object(object) => {
            let encoded = object
                .get("isBase64Encoded")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            match object.get("body") {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(text)) if encoded => decode_base64_body(text)?,
                Some(Value::String(text)) => text.clone(),
                Some(other) => {
                    return Err(HelperError::invalid_field(
                        "body",
                        other.to_string(),
                        "request body must be a string",
                    ));
                }
            }
        }
        _ => String::new(),
    };

    Ok(raw.split(['\r', '\n']).collect())
}

fn decode_base64_body(text: &str) -> Result<String, HelperError> {
    let bytes = BASE64_STANDARD
        .decode(text)
        .map_err(|error| HelperError::invalid_field("body", text, error))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn text_response(status_code: u16, body: String) -> ApiGatewayResponse {
    ApiGatewayResponse {
        status_code,
        headers: json!({"Content-Type": "text/plain"}),
        body,
    }
}

/// `Exception:<message>` followed by the bracketed cause chain.
fn fatal_response(error: &HelperError) -> ApiGatewayResponse {
    let message = error.to_string();
    let causes = error.cause_chain();
    log_error(
        "http_adapter",
        "fatal_response",
        json!({ "error": message, "causes": causes }),
    );
    text_response(500, format!("Exception:{message}\n[{}]", causes.join(", ")))
}
