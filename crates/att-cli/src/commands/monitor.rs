//! Foreground geofence monitoring.
//!
//! The engine's monitor only runs while this process does, so `monitor` (and
//! `check-in --watch`) keep the process alive until the session closes or
//! the user interrupts.

use std::io::Write;

use anyhow::{Context, Result};
use att_core::{Identity, SessionId};
use chrono::Utc;

use crate::commands::util::{Engine, local_time};

pub async fn run<W: Write>(writer: &mut W, engine: &Engine, identity: &Identity) -> Result<()> {
    let session = engine
        .open_session(&identity.user_id)?
        .context("no open session (check in first)")?;
    if !engine.resume_monitoring(&identity.user_id).await? {
        writeln!(
            writer,
            "Session {} is not bound to a work location; nothing to monitor.",
            session.id
        )?;
        return Ok(());
    }
    watch_until_closed(writer, engine, &session.id).await
}

/// Polls the session until it closes or Ctrl-C is pressed.
pub async fn watch_until_closed<W: Write>(
    writer: &mut W,
    engine: &Engine,
    session_id: &SessionId,
) -> Result<()> {
    writeln!(
        writer,
        "Monitoring session {session_id} every {}s (Ctrl-C to stop).",
        engine.config().monitor_interval().as_secs()
    )?;
    writer.flush()?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(engine.config().monitor_interval());
    let mut last_warning = None;

    loop {
        tokio::select! {
            result = &mut ctrl_c => {
                result.context("failed to listen for Ctrl-C")?;
                writeln!(writer, "Stopped monitoring; the session stays open.")?;
                return Ok(());
            }
            _ = ticker.tick() => {
                let session = engine.session(session_id)?;
                if !session.is_open() {
                    let closed_at = session.check_out_time.unwrap_or_else(Utc::now);
                    writeln!(
                        writer,
                        "Session closed at {}: {}",
                        local_time(closed_at, engine.config().timezone),
                        session.notes.as_deref().unwrap_or("checked out")
                    )?;
                    return Ok(());
                }
                let warning = engine
                    .monitor_status(session_id)
                    .and_then(|status| status.warning);
                if warning != last_warning {
                    if let Some(warning) = &warning {
                        writeln!(writer, "warning: {warning}")?;
                        writer.flush()?;
                    }
                    last_warning = warning;
                }
            }
        }
    }
}
