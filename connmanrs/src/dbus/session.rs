//! A logical connection to one remote object and interface.

use log::debug;
use std::sync::Arc;

use crate::api::models::ConnmanError;
use crate::codec::{ObjectPath, PropertyDict, Variant};
use crate::dbus::bus::{Bus, Reply, SystemBus, Target};
use crate::types::constants::{interface, method, path};
use crate::Result;

/// Calls, property reads and property writes against one
/// `(service, object path, interface)` triple.
///
/// A session either owns its transport ([`Session::open`], a fresh system
/// bus connection released by [`Session::close`]) or borrows a shared one
/// ([`Session::bind`]), which lets callers reuse a connection explicitly.
///
/// Every call waits for the daemon's reply. No timeout is applied unless
/// the underlying [`SystemBus`] was built with one.
///
/// # Example
///
/// ```no_run
/// use connmanrs::Session;
///
/// # async fn example() -> connmanrs::Result<()> {
/// let clock = Session::open("net.connman", "/", "net.connman.Clock").await?;
/// let updates = clock.get("TimeUpdates").await?;
/// println!("time updates: {:?}", updates);
/// clock.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Session {
    bus: Arc<dyn Bus>,
    target: Target,
    owned: bool,
}

impl Session {
    /// Opens a fresh system bus connection bound to the given object.
    ///
    /// # Errors
    ///
    /// Returns `ConnmanError::Transport` if the bus cannot be reached.
    pub async fn open(
        service: &str,
        object_path: impl Into<ObjectPath>,
        interface_name: &str,
    ) -> Result<Self> {
        let bus = SystemBus::connect(None).await?;
        Ok(Self {
            bus: Arc::new(bus),
            target: Target::new(service, object_path, interface_name),
            owned: true,
        })
    }

    /// Binds to the given object over an existing bus.
    pub fn bind(
        bus: Arc<dyn Bus>,
        service: &str,
        object_path: impl Into<ObjectPath>,
        interface_name: &str,
    ) -> Self {
        Self {
            bus,
            target: Target::new(service, object_path, interface_name),
            owned: false,
        }
    }

    /// The manager object.
    pub fn manager(bus: Arc<dyn Bus>, service: &str) -> Self {
        Self::bind(bus, service, path::ROOT, interface::MANAGER)
    }

    /// The clock object.
    pub fn clock(bus: Arc<dyn Bus>, service: &str) -> Self {
        Self::bind(bus, service, path::ROOT, interface::CLOCK)
    }

    /// The wifi technology object.
    pub fn wifi(bus: Arc<dyn Bus>, service: &str) -> Self {
        Self::bind(bus, service, path::WIFI, interface::TECHNOLOGY)
    }

    /// A service object at a daemon-assigned path.
    pub fn service(bus: Arc<dyn Bus>, service: &str, object_path: &ObjectPath) -> Self {
        Self::bind(bus, service, object_path.clone(), interface::SERVICE)
    }

    /// A technology object at a daemon-assigned path.
    pub fn technology(bus: Arc<dyn Bus>, service: &str, object_path: &ObjectPath) -> Self {
        Self::bind(bus, service, object_path.clone(), interface::TECHNOLOGY)
    }

    /// The object and interface this session talks to.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// The bus this session runs over.
    pub fn bus(&self) -> &Arc<dyn Bus> {
        &self.bus
    }

    /// Invokes `interface.method_name(args...)` on the bound object.
    ///
    /// # Errors
    ///
    /// The daemon's error (`ConnmanError::Remote`) or the transport's,
    /// unchanged.
    pub async fn call(&self, method_name: &str, args: Vec<Variant>) -> Result<Reply> {
        self.bus.call(&self.target, method_name, args).await
    }

    /// Fetches every property of the bound object via `GetProperties`.
    pub async fn properties(&self) -> Result<PropertyDict> {
        self.call(method::GET_PROPERTIES, Vec::new())
            .await?
            .into_properties(method::GET_PROPERTIES)
    }

    /// Fetches every property and returns the one named `name`.
    ///
    /// # Errors
    ///
    /// Returns `ConnmanError::InvalidProperty` if the object has no such
    /// property.
    pub async fn get(&self, name: &str) -> Result<Variant> {
        self.properties()
            .await?
            .remove(name)
            .ok_or_else(|| ConnmanError::InvalidProperty(name.to_string()))
    }

    /// Writes one property via `SetProperty`.
    pub async fn set(&self, name: &str, value: impl Into<Variant>) -> Result<()> {
        self.bus
            .set_property(&self.target, name, value.into())
            .await
    }

    /// Releases the transport if this session owns it.
    ///
    /// Closing a connection twice may fail; callers can treat that error as
    /// cleanup noise.
    pub async fn close(self) -> Result<()> {
        if self.owned {
            self.bus.close().await
        } else {
            debug!("Session on {} ends; shared bus left open", self.target);
            Ok(())
        }
    }
}
