//! The transport seam between control operations and the system bus.
//!
//! [`Bus`] is the small set of primitives every ConnMan operation is built
//! from: call a method, set a property, export or withdraw the credential
//! agent. [`SystemBus`] implements it over a zbus connection to the system
//! bus; tests substitute an in-memory daemon.

use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::fmt;
use zbus::Connection;
use zbus::proxy::CacheProperties;
use zvariant::{OwnedObjectPath, OwnedValue, StructureBuilder};

use crate::api::models::ConnmanError;
use crate::codec::{ObjectPath, PropertyDict, Variant, dict_from_bus};
use crate::dbus::agent::{Agent, AgentInterface};
use crate::types::constants::method;
use crate::Result;

/// One remote object and the interface calls are addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Well-known bus name of the owner.
    pub service: String,
    /// Object path.
    pub path: ObjectPath,
    /// Interface name.
    pub interface: String,
}

impl Target {
    /// Creates a target from its three parts.
    pub fn new(
        service: impl Into<String>,
        path: impl Into<ObjectPath>,
        interface: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            path: path.into(),
            interface: interface.into(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} ({})", self.service, self.path, self.interface)
    }
}

/// The payload of a method reply, in the shapes ConnMan replies with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// No return value.
    Empty,
    /// A property dictionary (`a{sv}`), e.g. from `GetProperties`.
    Properties(PropertyDict),
    /// Objects with their properties (`a(oa{sv})`), e.g. from `GetServices`.
    Objects(Vec<(ObjectPath, PropertyDict)>),
}

impl Reply {
    fn shape(&self) -> &'static str {
        match self {
            Self::Empty => "no value",
            Self::Properties(_) => "a{sv}",
            Self::Objects(_) => "a(oa{sv})",
        }
    }

    /// Unwraps a property dictionary reply.
    ///
    /// # Errors
    ///
    /// Returns `ConnmanError::UnexpectedReply` for any other shape.
    pub fn into_properties(self, method: &str) -> Result<PropertyDict> {
        match self {
            Self::Properties(dict) => Ok(dict),
            other => Err(other.unexpected(method, "a{sv}")),
        }
    }

    /// Unwraps an object list reply.
    ///
    /// # Errors
    ///
    /// Returns `ConnmanError::UnexpectedReply` for any other shape.
    pub fn into_objects(self, method: &str) -> Result<Vec<(ObjectPath, PropertyDict)>> {
        match self {
            Self::Objects(objects) => Ok(objects),
            other => Err(other.unexpected(method, "a(oa{sv})")),
        }
    }

    fn unexpected(&self, method: &str, expected: &'static str) -> ConnmanError {
        ConnmanError::UnexpectedReply {
            method: method.to_string(),
            expected,
            found: self.shape().to_string(),
        }
    }
}

/// Primitive operations on the message bus.
///
/// Every method awaits the daemon's reply; nothing is retried and no
/// timeout is added beyond what the implementation is configured with.
#[async_trait]
pub trait Bus: Send + Sync + fmt::Debug {
    /// Calls `target.interface.method(args...)` and returns the reply.
    async fn call(&self, target: &Target, method: &str, args: Vec<Variant>) -> Result<Reply>;

    /// Calls `target.interface.SetProperty(name, value)`, boxing `value` in
    /// a variant.
    async fn set_property(&self, target: &Target, name: &str, value: Variant) -> Result<()>;

    /// Exports `agent` at its path so the daemon can call back into it.
    async fn export_agent(&self, agent: Agent) -> Result<()>;

    /// Withdraws the agent exported at `path`.
    async fn withdraw_agent(&self, path: &ObjectPath) -> Result<()>;

    /// Releases the underlying connection.
    async fn close(&self) -> Result<()>;
}

/// [`Bus`] over a zbus connection to the system bus.
#[derive(Debug, Clone)]
pub struct SystemBus {
    conn: Connection,
}

impl SystemBus {
    /// Connects to the system bus. `None` leaves calls unbounded.
    pub async fn connect(method_timeout: Option<std::time::Duration>) -> Result<Self> {
        let mut builder = zbus::connection::Builder::system()?;
        if let Some(timeout) = method_timeout {
            builder = builder.method_timeout(timeout);
        }
        let conn = builder.build().await?;
        Ok(Self { conn })
    }

    /// Wraps an existing connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    /// The underlying zbus connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    async fn proxy(&self, target: &Target) -> Result<zbus::Proxy<'_>> {
        Ok(zbus::proxy::Builder::new(&self.conn)
            .destination(target.service.clone())?
            .path(target.path.as_str().to_string())?
            .interface(target.interface.clone())?
            .cache_properties(CacheProperties::No)
            .build()
            .await?)
    }
}

#[async_trait]
impl Bus for SystemBus {
    async fn call(&self, target: &Target, method: &str, args: Vec<Variant>) -> Result<Reply> {
        debug!("Calling {method} on {target} with {} argument(s)", args.len());
        let proxy = self.proxy(target).await?;

        let message = if args.is_empty() {
            proxy.call_method(method, &()).await?
        } else {
            let mut body = StructureBuilder::new();
            for arg in args {
                body = body.append_field(arg.into_bus_value()?);
            }
            proxy.call_method(method, &body.build()?).await?
        };

        let body = message.body();
        let signature = body.signature().to_string();
        match signature.as_str() {
            "" => Ok(Reply::Empty),
            "a{sv}" => {
                let map: HashMap<String, OwnedValue> = body.deserialize()?;
                Ok(Reply::Properties(dict_from_bus(map)?))
            }
            "a(oa{sv})" => {
                let objects: Vec<(OwnedObjectPath, HashMap<String, OwnedValue>)> =
                    body.deserialize()?;
                let objects = objects
                    .into_iter()
                    .map(|(path, map)| Ok((ObjectPath::from(path), dict_from_bus(map)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Reply::Objects(objects))
            }
            other => Err(ConnmanError::UnexpectedReply {
                method: method.to_string(),
                expected: "no value, a{sv} or a(oa{sv})",
                found: other.to_string(),
            }),
        }
    }

    async fn set_property(&self, target: &Target, name: &str, value: Variant) -> Result<()> {
        debug!("Setting {name} on {target}");
        let proxy = self.proxy(target).await?;
        let value = value.into_bus_value()?;
        proxy
            .call_method(method::SET_PROPERTY, &(name, value))
            .await?;
        Ok(())
    }

    async fn export_agent(&self, agent: Agent) -> Result<()> {
        let path = agent.path().as_str().to_string();
        let added = self
            .conn
            .object_server()
            .at(path.as_str(), AgentInterface::new(agent))
            .await?;
        if !added {
            return Err(ConnmanError::AgentUnavailable(format!(
                "an agent is already exported at {path}"
            )));
        }
        debug!("Exported agent at {path}");
        Ok(())
    }

    async fn withdraw_agent(&self, path: &ObjectPath) -> Result<()> {
        let removed = self
            .conn
            .object_server()
            .remove::<AgentInterface, _>(path.as_str())
            .await?;
        debug!("Withdrew agent at {path} (was exported: {removed})");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.conn.clone().close().await?;
        Ok(())
    }
}
