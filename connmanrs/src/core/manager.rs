//! Manager-level operations: enumeration and agent registration.

use log::{debug, warn};
use std::sync::Arc;

use crate::api::models::{ConnmanError, Service, Technology};
use crate::codec::{decode, ObjectPath, PropertyMap, Variant};
use crate::dbus::{Agent, Bus, Session};
use crate::types::constants::method;
use crate::Result;

/// Calls an enumeration method and decodes every returned object.
async fn list_objects<T: PropertyMap>(
    bus: &Arc<dyn Bus>,
    service: &str,
    method_name: &str,
) -> Result<Vec<(ObjectPath, T)>> {
    let manager = Session::manager(bus.clone(), service);
    let objects = manager
        .call(method_name, Vec::new())
        .await?
        .into_objects(method_name)?;
    debug!("{method_name} returned {} object(s)", objects.len());

    objects
        .into_iter()
        .map(|(path, props)| Ok((path, decode(props)?)))
        .collect()
}

/// Lists every service the daemon knows, in the daemon's order.
pub(crate) async fn list_services(bus: &Arc<dyn Bus>, service: &str) -> Result<Vec<Service>> {
    let objects = list_objects::<Service>(bus, service, method::GET_SERVICES).await?;
    Ok(objects
        .into_iter()
        .map(|(path, mut svc)| {
            svc.path = path;
            svc
        })
        .collect())
}

/// Lists every technology the daemon manages.
pub(crate) async fn list_technologies(
    bus: &Arc<dyn Bus>,
    service: &str,
) -> Result<Vec<Technology>> {
    let objects = list_objects::<Technology>(bus, service, method::GET_TECHNOLOGIES).await?;
    Ok(objects
        .into_iter()
        .map(|(path, mut tech)| {
            tech.path = path;
            tech
        })
        .collect())
}

/// Registers the agent exported at `agent_path` with the manager.
pub(crate) async fn register_agent(
    bus: &Arc<dyn Bus>,
    service: &str,
    agent_path: &ObjectPath,
) -> Result<()> {
    Session::manager(bus.clone(), service)
        .call(
            method::REGISTER_AGENT,
            vec![Variant::ObjectPath(agent_path.clone())],
        )
        .await?;
    debug!("Registered agent {agent_path}");
    Ok(())
}

/// Unregisters the agent at `agent_path` from the manager.
pub(crate) async fn unregister_agent(
    bus: &Arc<dyn Bus>,
    service: &str,
    agent_path: &ObjectPath,
) -> Result<()> {
    Session::manager(bus.clone(), service)
        .call(
            method::UNREGISTER_AGENT,
            vec![Variant::ObjectPath(agent_path.clone())],
        )
        .await?;
    debug!("Unregistered agent {agent_path}");
    Ok(())
}

/// An exported and registered credential agent.
///
/// [`AgentGuard::release`] unregisters and withdraws the agent. A guard
/// dropped unreleased, e.g. when the connect future is cancelled, hands the
/// same teardown to the runtime so the daemon never keeps a dangling agent.
pub(crate) struct AgentGuard {
    bus: Arc<dyn Bus>,
    service: String,
    path: ObjectPath,
    released: bool,
}

impl AgentGuard {
    /// Exports `agent` and registers it with the manager.
    ///
    /// If registration fails the agent is withdrawn again before the error
    /// is returned.
    pub(crate) async fn acquire(bus: &Arc<dyn Bus>, service: &str, agent: Agent) -> Result<Self> {
        let path = agent.path().clone();
        bus.export_agent(agent).await.map_err(|e| match e {
            e @ ConnmanError::AgentUnavailable(_) => e,
            other => ConnmanError::AgentUnavailable(other.to_string()),
        })?;

        if let Err(e) = register_agent(bus, service, &path).await {
            if let Err(withdraw_err) = bus.withdraw_agent(&path).await {
                warn!("Failed to withdraw agent {path} after failed registration: {withdraw_err}");
            }
            return Err(e);
        }

        Ok(Self {
            bus: bus.clone(),
            service: service.to_string(),
            path,
            released: false,
        })
    }

    /// Unregisters and withdraws the agent. Failures are logged only.
    pub(crate) async fn release(mut self) {
        teardown(&self.bus, &self.service, &self.path).await;
        self.released = true;
    }
}

impl Drop for AgentGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                debug!("Agent {} dropped while registered; tearing down", self.path);
                let bus = self.bus.clone();
                let service = std::mem::take(&mut self.service);
                let path = self.path.clone();
                handle.spawn(async move {
                    teardown(&bus, &service, &path).await;
                });
            }
            Err(_) => warn!(
                "Agent {} dropped outside a runtime; it stays registered",
                self.path
            ),
        }
    }
}

async fn teardown(bus: &Arc<dyn Bus>, service: &str, path: &ObjectPath) {
    if let Err(e) = unregister_agent(bus, service, path).await {
        warn!("Failed to unregister agent {path}: {e}");
    }
    if let Err(e) = bus.withdraw_agent(path).await {
        warn!("Failed to withdraw agent {path}: {e}");
    }
}
