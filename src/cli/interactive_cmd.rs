use std::io::IsTerminal;
use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::context;
use crate::cli::output::{to_json, OutputOptions};
use crate::cli::report_cmd::{self, describe_flush, ReportPayload};
use crate::core::config::AppConfig;
use crate::core::input::{parse_line, LineCommand};
use crate::core::session::Session;

const PROMPT: &str = "Bandwidth used in GB ('save' to store, 'quit' to exit): ";

/// Read usage values from stdin, re-rendering the report after each one.
/// The session is flushed on `save`, `quit`, and end of input.
pub async fn run(config_path: Option<&Path>, opts: &OutputOptions) -> Result<()> {
    let config = context::load_config(config_path)?;
    let now = context::now();
    let mut session = context::open_session(&config, &now).await?;
    let show_prompt = std::io::stdin().is_terminal() && !opts.is_json();

    show(&mut session, &config, opts)?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if show_prompt {
            eprint!("{}", PROMPT);
        }
        let Some(line) = lines.next_line().await.context("failed to read input")? else {
            break;
        };

        match parse_line(&line) {
            Ok(LineCommand::Usage(value)) => {
                session.set_used(value);
                show(&mut session, &config, opts)?;
            }
            Ok(LineCommand::Save) => save(&mut session, &config).await?,
            Ok(LineCommand::Quit) => break,
            Ok(LineCommand::Empty) => {}
            Err(e) => {
                tracing::warn!(input = %line.trim(), error = %e, "rejected input");
                eprintln!("{}", e);
            }
        }
    }

    save(&mut session, &config).await
}

fn show(session: &mut Session, config: &AppConfig, opts: &OutputOptions) -> Result<()> {
    let outcome = report_cmd::recompute(session, config);
    if opts.is_json() {
        // one document per line
        println!("{}", to_json(&ReportPayload::new(session, &outcome), false)?);
    } else {
        println!("{}", report_cmd::render_text(session, &outcome, opts.use_color));
    }
    Ok(())
}

async fn save(session: &mut Session, config: &AppConfig) -> Result<()> {
    let summary = session
        .flush(config.history.fill_missing_days)
        .await
        .context("failed to save settings")?;
    eprintln!("{}", describe_flush(session, &summary));
    Ok(())
}
