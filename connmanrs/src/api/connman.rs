use std::sync::Arc;

use crate::api::models::{Clock, ClockProperties, ConnManConfig, Service, Technology};
use crate::codec::ObjectPath;
use crate::core::clock::{
    clock_properties, current_time, set_auto_time, set_manual_time, time_method,
};
use crate::core::manager::{list_services, list_technologies, register_agent, unregister_agent};
use crate::core::service::{apply_ipv4, apply_nameservers, connect, disconnect};
use crate::core::technology::{scan, set_powered, wifi};
use crate::dbus::{Bus, Session, SystemBus};
use crate::Result;

/// High-level interface to ConnMan over D-Bus.
///
/// This is the main entry point for enumerating and controlling services,
/// technologies and the clock of a ConnMan daemon.
///
/// # Creating an Instance
///
/// ```no_run
/// use connmanrs::ConnMan;
///
/// # async fn example() -> connmanrs::Result<()> {
/// let cm = ConnMan::new().await?;
/// # Ok(())
/// # }
/// ```
///
/// # Examples
///
/// ## Connecting to a Wi-Fi network
///
/// ```no_run
/// use connmanrs::ConnMan;
///
/// # async fn example() -> connmanrs::Result<()> {
/// let cm = ConnMan::new().await?;
///
/// let wifi = cm.wifi().await?;
/// if !wifi.powered {
///     cm.enable_technology(&wifi).await?;
/// }
/// cm.scan(&wifi).await?;
///
/// for svc in cm.list_services().await? {
///     if svc.name == "HomeWiFi" {
///         cm.connect(&svc, "password123").await?;
///     }
/// }
/// # Ok(())
/// # }
/// ```
///
/// ## Static addressing
///
/// ```no_run
/// use connmanrs::{ConnMan, Ipv4Config};
///
/// # async fn example() -> connmanrs::Result<()> {
/// let cm = ConnMan::new().await?;
///
/// let mut svc = cm.list_services().await?.remove(0);
/// svc.ipv4_configuration = Ipv4Config {
///     method: "manual".into(),
///     address: "192.168.1.20".into(),
///     netmask: "255.255.255.0".into(),
///     gateway: "192.168.1.1".into(),
/// };
/// cm.apply_ipv4(&svc).await?;
///
/// svc.nameservers_configuration = vec!["1.1.1.1".into()];
/// cm.apply_nameservers(&svc).await?;
/// # Ok(())
/// # }
/// ```
///
/// # Entities are snapshots
///
/// Every listing builds fresh values from the daemon's reply. Nothing is
/// cached; re-fetch to observe changes made by the daemon.
///
/// # Thread Safety
///
/// `ConnMan` is `Clone`; clones share the same bus connection. Separate
/// handles created with [`ConnMan::new`] use separate connections.
#[derive(Debug, Clone)]
pub struct ConnMan {
    bus: Arc<dyn Bus>,
    config: ConnManConfig,
}

impl ConnMan {
    /// Creates a new `ConnMan` connected to the system D-Bus.
    pub async fn new() -> Result<Self> {
        Self::with_config(ConnManConfig::default()).await
    }

    /// Creates a new `ConnMan` with custom configuration.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use connmanrs::{ConnMan, ConnManConfig};
    /// use std::time::Duration;
    ///
    /// # async fn example() -> connmanrs::Result<()> {
    /// let config = ConnManConfig::new().with_method_timeout(Duration::from_secs(60));
    /// let cm = ConnMan::with_config(config).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn with_config(config: ConnManConfig) -> Result<Self> {
        let bus = SystemBus::connect(config.method_timeout).await?;
        Ok(Self {
            bus: Arc::new(bus),
            config,
        })
    }

    /// Creates a `ConnMan` over an existing bus.
    ///
    /// `config.method_timeout` only applies to buses this crate connects
    /// itself.
    pub fn with_bus(bus: Arc<dyn Bus>, config: ConnManConfig) -> Self {
        Self { bus, config }
    }

    /// Returns the current configuration.
    pub fn config(&self) -> &ConnManConfig {
        &self.config
    }

    /// Binds a session to any object of the daemon over this handle's bus.
    pub fn session(&self, object_path: impl Into<ObjectPath>, interface: &str) -> Session {
        Session::bind(
            self.bus.clone(),
            &self.config.service,
            object_path,
            interface,
        )
    }

    /// Lists every service known to the daemon.
    pub async fn list_services(&self) -> Result<Vec<Service>> {
        list_services(&self.bus, &self.config.service).await
    }

    /// Lists every technology managed by the daemon.
    pub async fn list_technologies(&self) -> Result<Vec<Technology>> {
        list_technologies(&self.bus, &self.config.service).await
    }

    /// Reads the wifi technology.
    pub async fn wifi(&self) -> Result<Technology> {
        wifi(&self.bus, &self.config).await
    }

    /// Registers an agent exported at `path` with the manager.
    pub async fn register_agent(&self, path: &ObjectPath) -> Result<()> {
        register_agent(&self.bus, &self.config.service, path).await
    }

    /// Unregisters the agent at `path`.
    pub async fn unregister_agent(&self, path: &ObjectPath) -> Result<()> {
        unregister_agent(&self.bus, &self.config.service, path).await
    }

    /// Connects to a service.
    ///
    /// For services secured with `psk` or `wep` a credential agent answering
    /// with `passphrase` is registered for the duration of the call and
    /// removed afterwards, whether or not the connection succeeded. Other
    /// services ignore `passphrase`.
    ///
    /// # Errors
    ///
    /// Returns `ConnmanError::AgentUnavailable` if the agent cannot be
    /// exported, or the daemon's error for `RegisterAgent` or `Connect`.
    pub async fn connect(&self, svc: &Service, passphrase: &str) -> Result<()> {
        connect(&self.bus, &self.config, svc, passphrase).await
    }

    /// Disconnects a service.
    pub async fn disconnect(&self, svc: &Service) -> Result<()> {
        disconnect(&self.bus, &self.config, svc).await
    }

    /// Applies `svc.ipv4_configuration`.
    pub async fn apply_ipv4(&self, svc: &Service) -> Result<()> {
        apply_ipv4(&self.bus, &self.config, svc).await
    }

    /// Applies `svc.nameservers_configuration`.
    pub async fn apply_nameservers(&self, svc: &Service) -> Result<()> {
        apply_nameservers(&self.bus, &self.config, svc).await
    }

    /// Powers a technology on.
    pub async fn enable_technology(&self, tech: &Technology) -> Result<()> {
        set_powered(&self.bus, &self.config, tech, true).await
    }

    /// Powers a technology off.
    pub async fn disable_technology(&self, tech: &Technology) -> Result<()> {
        set_powered(&self.bus, &self.config, tech, false).await
    }

    /// Scans for services on a technology.
    pub async fn scan(&self, tech: &Technology) -> Result<()> {
        scan(&self.bus, &self.config, tech).await
    }

    /// Reads every clock property.
    pub async fn clock_properties(&self) -> Result<ClockProperties> {
        clock_properties(&self.bus, &self.config).await
    }

    /// Returns the clock update mode, `manual` or `auto`.
    pub async fn time_method(&self) -> Result<String> {
        time_method(&self.bus, &self.config).await
    }

    /// Returns the local time along with the daemon's update mode.
    ///
    /// An unreachable daemon yields an empty `method` rather than an error.
    pub async fn time(&self) -> Clock {
        current_time(&self.bus, &self.config).await
    }

    /// Sets the time manually.
    ///
    /// The time is then written to the hardware clock on a best-effort
    /// basis, see [`ClockSync`](crate::ClockSync).
    pub async fn set_manual_time(&self, clock: &Clock) -> Result<()> {
        set_manual_time(&self.bus, &self.config, clock).await
    }

    /// Switches to automatic time updates.
    ///
    /// The time daemon is then restarted around a one-shot sync on a
    /// best-effort basis, see [`ClockSync`](crate::ClockSync).
    pub async fn set_auto_time(&self) -> Result<()> {
        set_auto_time(&self.bus, &self.config).await
    }

    /// Closes the bus connection.
    ///
    /// Clones of this handle stop working. Closing twice may fail; such an
    /// error is safe to ignore.
    pub async fn close(self) -> Result<()> {
        self.bus.close().await
    }
}
