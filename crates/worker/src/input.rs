use std::fs;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};

use nftdonate_types::TaskRequest;
use nftdonate_util::{parse_json_strict, path_from_env};
use tracing::{debug, info};

use crate::WorkerError;

pub const INPUT_DIR_ENV: &str = "IEXEC_IN";
pub const OUTPUT_DIR_ENV: &str = "IEXEC_OUT";
const DEFAULT_INPUT_DIR: &str = "/iexec_in";
const DEFAULT_OUTPUT_DIR: &str = "/iexec_out";
const INPUT_FILE_NAME: &str = "iexec_in.txt";
const OUTPUT_FILE_NAME: &str = "computed.json";

/// Well-known locations provided by the execution environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerEnv {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl WorkerEnv {
    /// Resolve the directories from `IEXEC_IN` / `IEXEC_OUT`.
    pub fn from_env() -> Self {
        Self {
            input_dir: path_from_env(INPUT_DIR_ENV, DEFAULT_INPUT_DIR),
            output_dir: path_from_env(OUTPUT_DIR_ENV, DEFAULT_OUTPUT_DIR),
        }
    }

    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn input_file(&self) -> PathBuf {
        self.input_dir.join(INPUT_FILE_NAME)
    }

    pub fn output_file(&self) -> PathBuf {
        self.output_dir.join(OUTPUT_FILE_NAME)
    }
}

/// Load and validate the task input.
///
/// The input file wins when it exists. Otherwise the document is read from
/// `stdin`, which only happens in local runs.
pub fn read_input(input_file: &Path, stdin: impl Read) -> Result<TaskRequest, WorkerError> {
    let text = match fs::read_to_string(input_file) {
        Ok(text) => {
            debug!(path = %input_file.display(), "reading input file");
            text
        }
        Err(error) if error.kind() == ErrorKind::NotFound => {
            info!(path = %input_file.display(), "input file absent; reading stdin for local testing");
            read_stdin(stdin)?
        }
        Err(error) => return Err(WorkerError::input(format!("{}: {error}", input_file.display()))),
    };

    let value = parse_json_strict(&text, "input document").map_err(|error| WorkerError::input(error.to_string()))?;
    let request: TaskRequest = serde_json::from_value(value).map_err(|error| WorkerError::input(error.to_string()))?;
    request.validate()?;
    Ok(request)
}

fn read_stdin(mut stdin: impl Read) -> Result<String, WorkerError> {
    let mut buffer = String::new();
    stdin
        .read_to_string(&mut buffer)
        .map_err(|error| WorkerError::input(format!("stdin: {error}")))?;
    Ok(buffer)
}
