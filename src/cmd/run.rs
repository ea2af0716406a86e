//! Reconciliation run: `tracker-updater run`.

use std::process::ExitCode;

use anyhow::Result;
use tracing::{info, warn};
use tracker_updater::reconcile::{Pass, Reconciler, RunReport};
use tracker_updater::ui;

use super::super::Cli;
use super::{EXIT_FATAL, load_config};

pub async fn cmd_run(cli: &Cli) -> Result<ExitCode> {
    let config = load_config(cli)?;
    for warning in config.warnings() {
        warn!("{}", warning);
    }
    info!(
        rt = %config.rt.url,
        dev_tracker = %config.dev_tracker.url,
        community = %config.community.url,
        "starting reconciliation"
    );

    let reconciler = Reconciler::from_config(&config)?;
    let mut report = RunReport::default();

    for pass in Pass::ALL {
        ui::pass_banner(pass);
        if config.interactive && !confirm_pass(pass) {
            info!(%pass, "pass skipped by operator");
            ui::pass_skipped(pass);
            continue;
        }
        match reconciler.run_pass(pass).await {
            Ok(pass_report) => {
                ui::pass_summary(&pass_report);
                report.passes.push(pass_report);
            }
            Err(err) => {
                ui::fatal(&err);
                return Ok(ExitCode::from(EXIT_FATAL));
            }
        }
    }

    ui::run_summary(&report);
    Ok(ExitCode::SUCCESS)
}

fn confirm_pass(pass: Pass) -> bool {
    use dialoguer::Confirm;
    Confirm::new()
        .with_prompt(format!("Run {}?", pass))
        .default(true)
        .interact()
        .unwrap_or_else(|e| {
            warn!(error = %e, "no terminal for confirmation; skipping pass");
            false
        })
}
