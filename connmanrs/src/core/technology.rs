//! Technology operations: power and scanning.

use log::{debug, info};
use std::sync::Arc;

use crate::api::models::{ConnManConfig, Technology};
use crate::codec::{decode, ObjectPath};
use crate::dbus::{Bus, Session};
use crate::types::constants::{method, path, property};
use crate::Result;

/// Reads the wifi technology from its fixed path.
pub(crate) async fn wifi(bus: &Arc<dyn Bus>, config: &ConnManConfig) -> Result<Technology> {
    let props = Session::wifi(bus.clone(), &config.service).properties().await?;
    let mut tech: Technology = decode(props)?;
    tech.path = ObjectPath::from(path::WIFI);
    Ok(tech)
}

/// Powers `tech` on or off.
pub(crate) async fn set_powered(
    bus: &Arc<dyn Bus>,
    config: &ConnManConfig,
    tech: &Technology,
    powered: bool,
) -> Result<()> {
    Session::technology(bus.clone(), &config.service, &tech.path)
        .set(property::POWERED, powered)
        .await?;
    info!(
        "{} '{}'",
        if powered { "Enabled" } else { "Disabled" },
        tech.name
    );
    Ok(())
}

/// Asks `tech` to scan for services. Returns once the daemon has finished.
pub(crate) async fn scan(
    bus: &Arc<dyn Bus>,
    config: &ConnManConfig,
    tech: &Technology,
) -> Result<()> {
    debug!("Scanning on '{}'", tech.name);
    Session::technology(bus.clone(), &config.service, &tech.path)
        .call(method::SCAN, Vec::new())
        .await?;
    Ok(())
}
