//! Black-box tests for the library API and the `runcap` binary

mod cli;
mod executor;
