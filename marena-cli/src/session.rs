//! Executes parsed commands against an in-process arena.

use crate::command::{self, Command, ParseError};
use anyhow::{Context, Result};
use marena_core::{MemoryService, ValueKind};
use serde::Serialize;
use std::sync::Arc;

/// What the caller should do after a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Print the text and keep reading.
    Continue(String),
    /// Print nothing; the line was blank or a comment.
    Skip,
    /// Stop reading input.
    Exit,
}

/// One interactive or scripted session.
#[derive(Clone)]
pub struct Session {
    service: Arc<MemoryService>,
}

impl Session {
    /// Start a session over `service`.
    pub fn new(service: Arc<MemoryService>) -> Self {
        Self { service }
    }

    /// The arena this session drives.
    pub fn service(&self) -> &Arc<MemoryService> {
        &self.service
    }

    /// Parse and execute one input line.
    ///
    /// Arena failures are part of the response; only output rendering
    /// errors are returned as `Err`.
    pub fn execute_line(&self, line: &str) -> Result<Outcome> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(Outcome::Skip);
        }

        match command::parse(trimmed) {
            Ok(command) => self.execute(&command),
            Err(ParseError::Empty) => Ok(Outcome::Skip),
            Err(e) => {
                tracing::debug!(line = trimmed, error = %e, "Rejected command");
                Ok(Outcome::Continue(format!("error: {}", e)))
            }
        }
    }

    /// Execute one line on the blocking pool.
    ///
    /// Commands take the arena lock and `collect()` waits on the collector,
    /// so the async caller stays free to observe Ctrl-C.
    pub async fn execute_line_blocking(&self, line: String) -> Result<Outcome> {
        let session = self.clone();
        tokio::task::spawn_blocking(move || session.execute_line(&line))
            .await
            .context("Command task failed")?
    }

    /// Execute a parsed command.
    pub fn execute(&self, command: &Command) -> Result<Outcome> {
        let output = match command {
            Command::Create { size, type_tag } => render(&self.service.create(*size, type_tag))?,
            Command::Set { id, value } => render(&self.service.set(*id, value))?,
            Command::Get { id } => render(&self.service.get(*id))?,
            Command::IncreaseRefCount { id } => {
                render(&self.service.increase_ref_count(*id))?
            }
            Command::DecreaseRefCount { id } => {
                render(&self.service.decrease_ref_count(*id))?
            }
            Command::Summary => render(&self.service.summary())?,
            Command::Blocks => render(&self.service.blocks())?,
            Command::Collect => {
                let manager = self.service.manager();
                manager.flush_collection();
                render(&CollectReport {
                    state: manager.collector_state().to_string(),
                    stats: manager.collector_stats(),
                    summary: self.service.summary(),
                })?
            }
            Command::Help => help(),
            Command::Exit => return Ok(Outcome::Exit),
        };

        Ok(Outcome::Continue(output))
    }
}

#[derive(Serialize)]
struct CollectReport {
    state: String,
    stats: marena_core::CollectorStats,
    summary: marena_core::ArenaSummary,
}

fn render<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("Failed to render response")
}

fn help() -> String {
    let types: Vec<String> = ValueKind::all()
        .iter()
        .map(|k| format!("{} ({} bytes)", k.tag(), k.width()))
        .collect();

    format!(
        "Commands:\n\
         \x20 create(size, type)      create a block, returns its id\n\
         \x20 set(id, value)          store a value; quote it to keep spaces\n\
         \x20 get(id)                 read a value\n\
         \x20 increaseRefCount(id)    add a reference\n\
         \x20 decreaseRefCount(id)    drop a reference\n\
         \x20 summary()               arena usage\n\
         \x20 blocks()                block listing by offset\n\
         \x20 collect()               wait for pending collection\n\
         \x20 help()                  this text\n\
         \x20 exit()                  leave\n\
         Types: {}",
        types.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use marena_core::{ArenaConfig, NullSink};

    fn session() -> Session {
        let config = ArenaConfig::for_testing(64).with_autostart(false);
        let service = MemoryService::with_sink(&config, Arc::new(NullSink)).unwrap();
        Session::new(Arc::new(service))
    }

    fn output(outcome: Outcome) -> serde_json::Value {
        match outcome {
            Outcome::Continue(text) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected output, got {other:?}"),
        }
    }

    #[test]
    fn test_create_set_get() {
        let s = session();

        let created = output(s.execute_line("create(4, int)").unwrap());
        assert_eq!(created["id"], 1);
        assert_eq!(created["ok"], true);

        let set = output(s.execute_line("set(1, 99)").unwrap());
        assert_eq!(set["ok"], true);

        let got = output(s.execute_line("get(1)").unwrap());
        assert_eq!(got["value"], "99");
    }

    #[test]
    fn test_failures_are_responses() {
        let s = session();

        let created = output(s.execute_line("create(3, int)").unwrap());
        assert_eq!(created["id"], -1);
        assert_eq!(created["ok"], false);

        let dec = output(s.execute_line("decreaseRefCount(5)").unwrap());
        assert_eq!(dec["new_count"], -1);
    }

    #[test]
    fn test_collect_reclaims() {
        let s = session();
        s.execute_line("create(8, double)").unwrap();
        s.execute_line("decreaseRefCount(1)").unwrap();

        let report = output(s.execute_line("collect()").unwrap());
        assert_eq!(report["stats"]["reclaimed"], 1);
        assert_eq!(report["summary"]["allocated_blocks"], 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_blocking_execution_keeps_runtime_free() {
        let s = session();
        s.execute_line("create(8, double)").unwrap();
        s.execute_line("decreaseRefCount(1)").unwrap();

        let (report, ticked) = tokio::join!(
            s.execute_line_blocking("collect()".to_string()),
            async {
                tokio::task::yield_now().await;
                true
            }
        );

        assert!(ticked);
        let report = output(report.unwrap());
        assert_eq!(report["stats"]["reclaimed"], 1);
        assert_eq!(
            s.execute_line_blocking("exit()".to_string()).await.unwrap(),
            Outcome::Exit
        );
    }

    #[test]
    fn test_skip_and_exit() {
        let s = session();
        assert_eq!(s.execute_line("").unwrap(), Outcome::Skip);
        assert_eq!(s.execute_line("# comment").unwrap(), Outcome::Skip);
        assert_eq!(s.execute_line("exit()").unwrap(), Outcome::Exit);
    }

    #[test]
    fn test_parse_errors_are_printed() {
        let s = session();
        match s.execute_line("frobnicate(1)").unwrap() {
            Outcome::Continue(text) => assert!(text.starts_with("error: unknown command")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_help_lists_types() {
        let s = session();
        match s.execute_line("help()").unwrap() {
            Outcome::Continue(text) => {
                assert!(text.contains("long long (8 bytes)"));
                assert!(text.contains("increaseRefCount"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
