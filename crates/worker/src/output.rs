use std::fs;

use nftdonate_types::RecommendationResult;
use tracing::info;

use crate::{WorkerEnv, WorkerError};

/// Write `result` to the output location, creating the directory if needed.
///
/// The file holds pretty-printed JSON; the compact form is echoed on stdout
/// for local runs.
pub fn write_output(env: &WorkerEnv, result: &RecommendationResult) -> Result<(), WorkerError> {
    fs::create_dir_all(&env.output_dir)
        .map_err(|error| WorkerError::output(format!("{}: {error}", env.output_dir.display())))?;

    let pretty = serde_json::to_string_pretty(result).map_err(|error| WorkerError::output(error.to_string()))?;
    let path = env.output_file();
    fs::write(&path, pretty).map_err(|error| WorkerError::output(format!("{}: {error}", path.display())))?;
    info!(path = %path.display(), error = result.error, "output written");

    let compact = serde_json::to_string(result).map_err(|error| WorkerError::output(error.to_string()))?;
    println!("{compact}");
    Ok(())
}
