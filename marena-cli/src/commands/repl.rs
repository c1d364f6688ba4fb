//! Repl command - read commands from stdin until exit, EOF or Ctrl-C.

use crate::session::{Outcome, Session};
use anyhow::{Context, Result};
use std::io::IsTerminal;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Run the interactive loop.
pub async fn run(session: &Session) -> Result<()> {
    let interactive = std::io::stdin().is_terminal();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    if interactive {
        println!("marena {} - type help() for commands", env!("CARGO_PKG_VERSION"));
    }

    loop {
        if interactive {
            stdout.write_all(b"> ").await?;
            stdout.flush().await?;
        }

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        };

        let Some(line) = line else {
            break;
        };

        let outcome = tokio::select! {
            outcome = session.execute_line_blocking(line) => outcome?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        };

        match outcome {
            Outcome::Continue(text) => println!("{}", text),
            Outcome::Skip => {}
            Outcome::Exit => break,
        }
    }

    Ok(())
}
