//! Run the maintenance worker in the foreground

use crate::system_config::SystemConfig;
use crate::util;
use anyhow::{Context, Result};
use cowork_watcher::{ActiveContext, MaintenanceLock, Session};
use owo_colors::OwoColorize;
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

pub async fn run(context: &ActiveContext, config: &SystemConfig) -> Result<()> {
    let lock = MaintenanceLock::acquire(&context.root, &context.user)
        .context("Another process is maintaining this root")?;

    let (session, first_pass) =
        Session::open(&context.root, &context.user, config.worker_config()).await?;
    let mut worker_events = session.subscribe_worker();

    println!(
        "{} Maintaining {} for {} (Ctrl-C to stop)",
        "●".green(),
        context.root.display().to_string().cyan(),
        context.user.cyan()
    );

    let bar = util::copy_progress_bar()?;
    let mut first_pass = first_pass;
    let mut first_pass_done = false;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            result = &mut first_pass, if !first_pass_done => {
                first_pass_done = true;
                match result {
                    Ok(Ok(report)) => info!(?report, "initial maintenance finished"),
                    Ok(Err(e)) => util::say(&bar, format!("{} {:#}", "✗".red(), e)),
                    Err(_) => break,
                }
            }
            event = worker_events.recv() => match event {
                Ok(event) => util::render_worker_event(&bar, &event),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    bar.finish_and_clear();
    session.close().await?;
    lock.release()?;
    println!("{} Stopped", "✓".green());
    Ok(())
}
