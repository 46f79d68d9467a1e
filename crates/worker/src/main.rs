use std::process::ExitCode;

use nftdonate_worker::{OpenAiModel, WorkerEnv, execute};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();
    let env = WorkerEnv::from_env();
    let code = execute(&env, std::io::stdin(), OpenAiModel::connect).await;
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

// stdout carries the result document; logs go to stderr.
fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
