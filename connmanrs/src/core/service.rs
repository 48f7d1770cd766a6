//! Service operations: connect, disconnect and configuration changes.

use log::{debug, info};
use std::sync::Arc;

use crate::api::models::{ConnManConfig, Service};
use crate::codec::{encode, Variant};
use crate::core::manager::AgentGuard;
use crate::dbus::{Agent, Bus, Session};
use crate::types::constants::{method, property};
use crate::Result;

/// Connects to `svc`.
///
/// Services secured with `psk` or `wep` get a credential agent holding
/// `passphrase` for the duration of the `Connect` call. The agent is
/// unregistered and withdrawn afterwards whatever `Connect` returned, and
/// the `Connect` outcome is what the caller sees. Dropping the returned
/// future mid-call still tears the agent down, on a spawned task.
pub(crate) async fn connect(
    bus: &Arc<dyn Bus>,
    config: &ConnManConfig,
    svc: &Service,
    passphrase: &str,
) -> Result<()> {
    let session = Session::service(bus.clone(), &config.service, &svc.path);

    if !svc.is_secured() {
        debug!("Connecting to '{}' without credentials", svc.name);
        session.call(method::CONNECT, Vec::new()).await?;
        info!("Connected to '{}'", svc.name);
        return Ok(());
    }

    debug!(
        "Connecting to '{}' | security={:?}",
        svc.name, svc.security
    );
    let agent = Agent::new(config.agent_path.clone(), passphrase);
    let guard = AgentGuard::acquire(bus, &config.service, agent).await?;

    let outcome = session.call(method::CONNECT, Vec::new()).await;
    guard.release().await;

    outcome?;
    info!("Connected to '{}'", svc.name);
    Ok(())
}

/// Disconnects `svc`.
pub(crate) async fn disconnect(
    bus: &Arc<dyn Bus>,
    config: &ConnManConfig,
    svc: &Service,
) -> Result<()> {
    Session::service(bus.clone(), &config.service, &svc.path)
        .call(method::DISCONNECT, Vec::new())
        .await?;
    info!("Disconnected from '{}'", svc.name);
    Ok(())
}

/// Writes `svc.ipv4_configuration` to `IPv4.Configuration`.
pub(crate) async fn apply_ipv4(
    bus: &Arc<dyn Bus>,
    config: &ConnManConfig,
    svc: &Service,
) -> Result<()> {
    let settings = encode(&svc.ipv4_configuration)?;
    Session::service(bus.clone(), &config.service, &svc.path)
        .set(property::IPV4_CONFIGURATION, Variant::Dict(settings))
        .await?;
    info!(
        "Applied IPv4 method '{}' to '{}'",
        svc.ipv4_configuration.method, svc.name
    );
    Ok(())
}

/// Writes `svc.nameservers_configuration` to `Nameservers.Configuration`.
pub(crate) async fn apply_nameservers(
    bus: &Arc<dyn Bus>,
    config: &ConnManConfig,
    svc: &Service,
) -> Result<()> {
    Session::service(bus.clone(), &config.service, &svc.path)
        .set(
            property::NAMESERVERS_CONFIGURATION,
            svc.nameservers_configuration.clone(),
        )
        .await?;
    info!(
        "Applied {} nameserver(s) to '{}'",
        svc.nameservers_configuration.len(),
        svc.name
    );
    Ok(())
}
