//! Executor scenarios through the public API

use runcap::{execute, ExecError, Executor, ExecutorConfig, Outcome, RunConfig, Verbatim};
use std::time::{Duration, Instant};

const MIB: usize = 1024 * 1024;

#[test]
fn test_echo_hello() {
    let config = ExecutorConfig::new(Duration::from_secs(5), MIB);
    let outcome = execute(&["/bin/echo", "hello"], &config).unwrap();

    assert_eq!(
        outcome,
        Outcome::Completed {
            stdout: "hello\n".to_string(),
            stderr: String::new(),
            exit_code: Some(0),
        }
    );
}

#[test]
fn test_sleep_times_out_promptly() {
    let config = ExecutorConfig::new(Duration::from_secs(1), MIB);
    let start = Instant::now();
    let outcome = execute(&["sleep", "60"], &config).unwrap();

    assert_eq!(outcome, Outcome::TimedOut);
    assert!(start.elapsed() < Duration::from_secs(10));
}

#[test]
fn test_twice_the_cap_is_too_long() {
    let cap = 32 * 1024;
    let script = format!("head -c {} /dev/zero | tr '\\0' a; echo", 2 * cap);
    let config = ExecutorConfig::new(Duration::from_secs(30), cap);
    let outcome = execute(&["/bin/sh", "-c", script.as_str()], &config).unwrap();

    assert_eq!(outcome, Outcome::OutputTooLong);
}

#[test]
fn test_endless_output_never_reports_timeout() {
    let config = ExecutorConfig::new(Duration::from_secs(5), MIB);
    let outcome = execute(&["yes"], &config).unwrap();
    assert_eq!(outcome, Outcome::OutputTooLong);
}

#[test]
fn test_nonexistent_executable() {
    let config = ExecutorConfig::default();
    let err = execute(&["/definitely/not/here"], &config).unwrap_err();
    assert!(err.is_spawn());
    assert!(matches!(err, ExecError::Spawn { .. }));
}

#[test]
fn test_executor_is_reusable() {
    let executor = Executor::new(ExecutorConfig::new(Duration::from_secs(5), MIB))
        .with_escaper(Verbatim);

    for word in ["one", "two", "<three>"] {
        let outcome = executor.execute(&["/bin/echo", word]).unwrap();
        assert_eq!(
            outcome,
            Outcome::Completed {
                stdout: format!("{word}\n"),
                stderr: String::new(),
                exit_code: Some(0),
            }
        );
    }
}

#[test]
fn test_concurrent_executions_are_independent() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            std::thread::spawn(move || {
                let config = ExecutorConfig::new(Duration::from_secs(10), MIB);
                execute(&["/bin/echo".to_string(), i.to_string()], &config).unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let outcome = handle.join().unwrap();
        assert_eq!(
            outcome,
            Outcome::Completed {
                stdout: format!("{i}\n"),
                stderr: String::new(),
                exit_code: Some(0),
            }
        );
    }
}

#[test]
fn test_config_file_drives_execution() {
    let config = RunConfig::from_toml_str(
        r#"
        command = ["/bin/sh", "-c", "echo from-config"]
        timeout_ms = 5000
        max_output_size = 1024
        "#,
    )
    .unwrap();

    let executor = Executor::new(config.executor_config().unwrap());
    let output = executor.run(&config.command).unwrap();
    assert!(!output.is_error);
    assert_eq!(output.stdout, "from-config\n");
}
