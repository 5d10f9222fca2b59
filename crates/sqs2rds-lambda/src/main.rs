// AWS Lambda binary entry point
//
// Build with: cargo build -p sqs2rds-lambda
//
// The lambda_runtime crate provides the tokio runtime, so we use #[tokio::main]

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    sqs2rds_lambda::run().await
}
