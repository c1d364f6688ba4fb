//! Run command - execute a script of commands, one per line.

use crate::session::{Outcome, Session};
use anyhow::{Context, Result};
use std::path::Path;

/// Execute every line of `path`, stopping early at `exit()` or Ctrl-C.
pub async fn run(session: &Session, path: &Path) -> Result<()> {
    let script = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read script: {}", path.display()))?;

    tracing::info!(path = %path.display(), lines = script.lines().count(), "Running script");

    let execute = async {
        for line in script.lines() {
            match session.execute_line_blocking(line.to_string()).await? {
                Outcome::Continue(text) => println!("{}", text),
                Outcome::Skip => {}
                Outcome::Exit => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    };

    tokio::select! {
        result = execute => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
            Ok(())
        }
    }
}
