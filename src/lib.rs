pub mod config;
pub mod error;
pub mod escape;
pub mod executor;

pub use config::{ExecutorConfig, Messages, RunConfig};
pub use error::ExecError;
pub use escape::{Escaper, HtmlEscaper, Verbatim};
pub use executor::{execute, Executor, Outcome, ProgramOutput};
