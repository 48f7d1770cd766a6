//! The credential agent ConnMan calls back into while connecting.
//!
//! ConnMan asks a registered agent for secrets when a secured service is
//! connected. This agent only knows one passphrase and hands it out for
//! every request.

use log::{debug, info, warn};
use std::collections::HashMap;
use zbus::{fdo, interface};
use zvariant::{OwnedObjectPath, OwnedValue};

use crate::codec::{ObjectPath, PropertyDict, Variant, dict_to_bus};
use crate::types::constants::property;

/// A passphrase responder exported at a fixed object path.
#[derive(Clone, PartialEq, Eq)]
pub struct Agent {
    path: ObjectPath,
    passphrase: String,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("path", &self.path)
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

impl Agent {
    /// Creates an agent answering with `passphrase`, to be exported at `path`.
    pub fn new(path: impl Into<ObjectPath>, passphrase: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            passphrase: passphrase.into(),
        }
    }

    /// Object path the agent is exported at.
    pub fn path(&self) -> &ObjectPath {
        &self.path
    }

    /// Answer to `RequestInput`: only the passphrase, whatever was asked.
    pub fn request_input(&self, service: &str) -> PropertyDict {
        debug!("Passphrase requested for {service}");
        let mut reply = PropertyDict::new();
        reply.insert(
            property::PASSPHRASE.to_string(),
            Variant::Str(self.passphrase.clone()),
        );
        reply
    }

    /// Handles `ReportError`. The error is logged; the call never fails.
    pub fn report_error(&self, service: &str, error: &str) {
        warn!("{service}: {error}");
    }
}

/// `net.connman.Agent` object served on the bus.
pub(crate) struct AgentInterface {
    agent: Agent,
}

impl AgentInterface {
    pub(crate) fn new(agent: Agent) -> Self {
        Self { agent }
    }
}

#[interface(name = "net.connman.Agent")]
impl AgentInterface {
    async fn request_input(
        &self,
        service: OwnedObjectPath,
        _fields: HashMap<String, OwnedValue>,
    ) -> fdo::Result<HashMap<String, OwnedValue>> {
        let reply = dict_to_bus(self.agent.request_input(service.as_str()))
            .map_err(|e| fdo::Error::Failed(e.to_string()))?;
        reply
            .into_iter()
            .map(|(key, value)| {
                OwnedValue::try_from(value)
                    .map(|value| (key, value))
                    .map_err(|e| fdo::Error::Failed(e.to_string()))
            })
            .collect()
    }

    async fn report_error(&self, service: OwnedObjectPath, error: String) -> fdo::Result<()> {
        self.agent.report_error(service.as_str(), &error);
        Ok(())
    }

    async fn release(&self) {
        info!("Agent at {} released by the daemon", self.agent.path());
    }

    async fn cancel(&self) {
        debug!("Agent request cancelled");
    }
}
