//! Constants for the ConnMan D-Bus API.
//!
//! Well-known names, object paths, interface names and property names used
//! when talking to the connection manager daemon.

/// Well-known bus name of the ConnMan daemon.
pub const SERVICE: &str = "net.connman";

/// Fixed object paths.
pub mod path {
    /// Manager and clock objects live at the root path.
    pub const ROOT: &str = "/";
    /// The wifi technology object.
    pub const WIFI: &str = "/net/connman/technology/wifi";
    /// Where this library exports its credential agent.
    pub const AGENT: &str = "/test/agent";
}

/// Interface names.
pub mod interface {
    pub const MANAGER: &str = "net.connman.Manager";
    pub const SERVICE: &str = "net.connman.Service";
    pub const TECHNOLOGY: &str = "net.connman.Technology";
    pub const CLOCK: &str = "net.connman.Clock";
}

/// Method names invoked on the daemon.
pub mod method {
    pub const GET_SERVICES: &str = "GetServices";
    pub const GET_TECHNOLOGIES: &str = "GetTechnologies";
    pub const REGISTER_AGENT: &str = "RegisterAgent";
    pub const UNREGISTER_AGENT: &str = "UnregisterAgent";
    pub const GET_PROPERTIES: &str = "GetProperties";
    pub const SET_PROPERTY: &str = "SetProperty";
    pub const CONNECT: &str = "Connect";
    pub const DISCONNECT: &str = "Disconnect";
    pub const SCAN: &str = "Scan";
}

/// Property names written by the control operations.
pub mod property {
    pub const IPV4_CONFIGURATION: &str = "IPv4.Configuration";
    pub const NAMESERVERS_CONFIGURATION: &str = "Nameservers.Configuration";
    pub const POWERED: &str = "Powered";
    pub const TIME_UPDATES: &str = "TimeUpdates";
    pub const TIME: &str = "Time";
    pub const PASSPHRASE: &str = "Passphrase";
}

/// Values of the clock `TimeUpdates` property.
pub mod time_updates {
    pub const MANUAL: &str = "manual";
    pub const AUTO: &str = "auto";
}

/// Security methods that need a passphrase from an agent.
pub mod security {
    pub const PSK: &str = "psk";
    pub const WEP: &str = "wep";

    /// Returns whether a security method requires a credential.
    pub fn requires_credential(method: &str) -> bool {
        matches!(method, PSK | WEP)
    }
}

/// Defaults for the best-effort clock side effects.
pub mod clock_sync {
    pub const HWCLOCK: &str = "hwclock";
    pub const SYSTEMCTL: &str = "systemctl";
    pub const NTPDATE: &str = "ntpdate";
    pub const TIME_DAEMON: &str = "ntpd";
    pub const NTP_SERVER: &str = "0.develer.pool.ntp.org";
}
