//! reply-tuner - consultant chatbot prompt learning
//!
//! Serves reply generation over HTTP and runs the prompt improvement loop.

use reply_tuner::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    dotenv::dotenv().ok();

    // INFO by default, RUST_LOG overrides
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    cli::run().await
}
