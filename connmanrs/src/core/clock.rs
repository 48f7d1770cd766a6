//! Clock operations: time update mode and manual time.
//!
//! Besides the daemon's clock properties, changing the time touches the
//! host: a manual time is written to the hardware clock, and switching to
//! automatic updates restarts the time daemon around a one-shot NTP sync.
//! Those steps are separate processes run on a best-effort basis; their
//! failures are logged and never returned.

use chrono::Local;
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::process::Command;

use crate::api::models::{Clock, ClockProperties, ClockSync, ConnManConfig, ConnmanError};
use crate::codec::{decode, Property};
use crate::dbus::{Bus, Session};
use crate::types::constants::{property, time_updates};
use crate::Result;

/// Reads every property of the daemon's clock.
pub(crate) async fn clock_properties(
    bus: &Arc<dyn Bus>,
    config: &ConnManConfig,
) -> Result<ClockProperties> {
    let props = Session::clock(bus.clone(), &config.service)
        .properties()
        .await?;
    Ok(decode(props)?)
}

/// Reads the `TimeUpdates` mode, `manual` or `auto`.
pub(crate) async fn time_method(bus: &Arc<dyn Bus>, config: &ConnManConfig) -> Result<String> {
    let value = Session::clock(bus.clone(), &config.service)
        .get(property::TIME_UPDATES)
        .await?;
    Ok(String::from_variant(property::TIME_UPDATES, value)?)
}

/// Snapshot of the local clock plus the daemon's update mode.
///
/// If the mode cannot be read the snapshot carries an empty `method`.
pub(crate) async fn current_time(bus: &Arc<dyn Bus>, config: &ConnManConfig) -> Clock {
    let clock = Clock::from_time(&Local::now());
    match time_method(bus, config).await {
        Ok(method) => clock.with_method(method),
        Err(e) => {
            warn!("Failed to read clock update mode: {e}");
            clock
        }
    }
}

/// Switches to manual updates and sets the time to `clock`.
pub(crate) async fn set_manual_time(
    bus: &Arc<dyn Bus>,
    config: &ConnManConfig,
    clock: &Clock,
) -> Result<()> {
    let timestamp = clock.to_time()?.timestamp();
    let seconds = u64::try_from(timestamp)
        .map_err(|_| ConnmanError::InvalidTime(format!("{timestamp} is before the epoch")))?;

    let session = Session::clock(bus.clone(), &config.service);
    session
        .set(property::TIME_UPDATES, time_updates::MANUAL)
        .await?;
    session.set(property::TIME, seconds).await?;
    info!("Clock set to {seconds} (manual updates)");

    write_hardware_clock(&config.clock).await;
    Ok(())
}

/// Switches to automatic updates and forces a sync.
pub(crate) async fn set_auto_time(bus: &Arc<dyn Bus>, config: &ConnManConfig) -> Result<()> {
    Session::clock(bus.clone(), &config.service)
        .set(property::TIME_UPDATES, time_updates::AUTO)
        .await?;
    info!("Clock switched to automatic updates");

    force_time_sync(&config.clock).await;
    Ok(())
}

async fn write_hardware_clock(sync: &ClockSync) {
    if !sync.enabled {
        return;
    }
    run_best_effort(&sync.hwclock, &["-w"]).await;
}

async fn force_time_sync(sync: &ClockSync) {
    if !sync.enabled {
        return;
    }
    run_best_effort(&sync.systemctl, &["stop", &sync.time_daemon]).await;
    run_best_effort(&sync.ntpdate, &["-s", &sync.ntp_server]).await;
    run_best_effort(&sync.systemctl, &["start", &sync.time_daemon]).await;
}

/// Runs a command to completion, logging instead of failing.
async fn run_best_effort(program: &str, args: &[&str]) -> bool {
    let cmdline = format!("{program} {}", args.join(" "));
    match Command::new(program).args(args).status().await {
        Ok(status) if status.success() => {
            debug!("`{cmdline}` succeeded");
            true
        }
        Ok(status) => {
            warn!("`{cmdline}` exited with {status}");
            false
        }
        Err(e) => {
            warn!("Failed to run `{cmdline}`: {e}");
            false
        }
    }
}
