use accel_helper_lambda::adapters::process::SystemCommandRunner;
use accel_helper_lambda::adapters::process_context::ProcessContext;
use accel_helper_lambda::config::HelperConfig;
use accel_helper_lambda::handlers::dispatch::HelperContext;
use accel_helper_lambda::handlers::http::{handle_http_event, ApiGatewayResponse};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

async fn handle_request(event: LambdaEvent<Value>) -> Result<ApiGatewayResponse, Error> {
    let config = HelperConfig::from_env();
    let process = ProcessContext::capture();
    let runner = SystemCommandRunner;

    let response = tokio::task::block_in_place(|| {
        let context = HelperContext {
            config: &config,
            runner: &runner,
            process: &process,
        };
        handle_http_event(event.payload, &context)
    });
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}
