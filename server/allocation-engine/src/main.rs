//! Binary entrypoint: read one JSON request from stdin, write one JSON object to stdout.
//!
//! The output is an EngineOutput on success, or an ErrorOutput (exit status 1)
//! when the request is invalid. Logs go to stderr; set `RUST_LOG` to adjust.

use allocation_engine::types::ErrorOutput;
use allocation_engine::{run, EngineError, EngineInput};
use std::io::{self, Read, Write};
use tracing_subscriber::EnvFilter;

fn main() {
  setup_logging();

  let mut out = io::BufWriter::new(io::stdout().lock());
  let code = match run_binary() {
    Ok(json) => {
      let _ = out.write_all(&json);
      0
    }
    Err(e) => {
      tracing::error!("request rejected: {}", e);
      let err = match e.field() {
        Some(field) => ErrorOutput::new(e.to_string()).with_field(field),
        None => ErrorOutput::new(e.to_string()),
      };
      let _ = serde_json::to_writer(&mut out, &err);
      1
    }
  };
  let _ = writeln!(out);
  let _ = out.flush();
  drop(out);
  std::process::exit(code);
}

fn run_binary() -> Result<Vec<u8>, EngineError> {
  let mut raw = String::new();
  io::stdin()
    .lock()
    .read_to_string(&mut raw)
    .map_err(|e| EngineError::validation("stdin", &e.to_string()))?;
  let input: EngineInput = serde_json::from_str(&raw)?;

  let output = run(&input)?;
  Ok(serde_json::to_vec(&output)?)
}

fn setup_logging() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .init();
}
