//! Worker runtime executed once per task inside the confidential environment.
//!
//! A run reads the task's input document, resolves the model credential from
//! the injected secrets, asks the reasoning model for recommendations, and
//! always leaves a result document behind: the validated recommendations on
//! success, or an error document on any failure. [`execute`] is the single
//! place where a run's outcome becomes the output document and exit code.

mod credential;
mod error;
mod input;
mod model;
mod output;
mod prompt;
mod runtime;

pub use credential::{API_KEY_ENV, ApiKey, resolve_credential};
pub use error::WorkerError;
pub use input::{WorkerEnv, read_input};
pub use model::{OpenAiModel, ReasoningModel};
pub use output::write_output;
pub use prompt::{SYSTEM_PROMPT, build_prompt};
pub use runtime::{EXIT_FAILURE, EXIT_SUCCESS, execute, recommend, run};
