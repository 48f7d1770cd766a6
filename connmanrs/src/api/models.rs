use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Timelike};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::codec::{ObjectPath, VariantType};
use crate::property_map;
use crate::types::constants::{clock_sync, path, security, SERVICE};

property_map! {
    /// IPv4 settings of a service, either as currently applied (`IPv4`)
    /// or as requested by the user (`IPv4.Configuration`).
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct Ipv4Config {
        /// `dhcp`, `manual`, `off` or `fixed`.
        pub method: String => "Method",
        /// Dotted-quad address.
        pub address: String => "Address",
        /// Dotted-quad netmask.
        pub netmask: String => "Netmask",
        /// Default gateway.
        pub gateway: String => "Gateway",
    }
}

property_map! {
    /// IPv6 settings of a service.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct Ipv6Config {
        /// `auto`, `manual`, `6to4`, `off` or `fixed`.
        pub method: String => "Method",
        /// IPv6 address.
        pub address: String => "Address",
        /// Prefix length of the address.
        pub prefix_length: u8 => "PrefixLength",
        /// Default gateway.
        pub gateway: String => "Gateway",
        /// Privacy extension setting: `disabled`, `enabled` or `preferred`.
        pub privacy: String => "Privacy",
    }
}

property_map! {
    /// Link-layer settings of a service.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct EthernetConfig {
        /// `auto` or `manual`.
        pub method: String => "Method",
        /// Kernel interface name, e.g. `wlan0`.
        pub interface: String => "Interface",
        /// Hardware address.
        pub address: String => "Address",
        /// Link MTU.
        pub mtu: u16 => "MTU",
    }
}

property_map! {
    /// Proxy settings of a service.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct ProxyConfig {
        /// `direct`, `auto` or `manual`.
        pub method: String => "Method",
        /// Proxy auto-configuration URL.
        pub url: String => "URL",
        /// Manual proxy servers.
        pub servers: Vec<String> => "Servers",
        /// Hosts bypassing the proxy.
        pub excludes: Vec<String> => "Excludes",
    }
}

property_map! {
    /// VPN provider details of a service.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct Provider {
        /// VPN server host.
        pub host: String => "Host",
        /// VPN domain.
        pub domain: String => "Domain",
        /// Provider name.
        pub name: String => "Name",
        /// Provider type, e.g. `openvpn`.
        pub provider_type: String => "Type",
    }
}

property_map! {
    /// A network connection known to the daemon, e.g. one Wi-Fi access point.
    ///
    /// `path` is the identity assigned by the daemon. Every other field
    /// mirrors the property of the same name; `*_configuration` fields hold
    /// the user-requested settings (`IPv4.Configuration`, ...), the plain
    /// ones what is currently in effect.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct Service {
        /// Object path of the service.
        pub path: ObjectPath => "Path",
        /// Human readable name (the SSID for Wi-Fi).
        pub name: String => "Name",
        /// Technology type, e.g. `wifi` or `ethernet`.
        pub service_type: String => "Type",
        /// Connection state, e.g. `idle`, `ready`, `online`.
        pub state: String => "State",
        /// Last error reported for this service.
        pub error: String => "Error",
        /// Security methods, e.g. `psk`, `wep`, `ieee8021x`, `none`.
        pub security: Vec<String> => "Security",
        /// Signal strength in percent.
        pub strength: u8 => "Strength",
        /// Whether the service is saved.
        pub favorite: bool => "Favorite",
        /// Whether the daemon connects to it automatically.
        pub auto_connect: bool => "AutoConnect",
        /// Whether the service comes from a read-only provisioning file.
        pub immutable: bool => "Immutable",
        /// Whether a cellular service is roaming.
        pub roaming: bool => "Roaming",
        /// Whether multicast DNS is active.
        pub mdns: bool => "mDNS",
        /// Requested multicast DNS setting.
        pub mdns_configuration: bool => "mDNSConfiguration",
        /// Link-layer settings.
        pub ethernet: EthernetConfig => "Ethernet",
        /// IPv4 settings in effect.
        pub ipv4: Ipv4Config => "IPv4",
        /// Requested IPv4 settings.
        pub ipv4_configuration: Ipv4Config => "IPv4Configuration",
        /// IPv6 settings in effect.
        pub ipv6: Ipv6Config => "IPv6",
        /// Requested IPv6 settings.
        pub ipv6_configuration: Ipv6Config => "IPv6Configuration",
        /// Proxy settings in effect.
        pub proxy: ProxyConfig => "Proxy",
        /// Requested proxy settings.
        pub proxy_configuration: ProxyConfig => "ProxyConfiguration",
        /// VPN provider details.
        pub provider: Provider => "Provider",
        /// Search domains in effect.
        pub domains: Vec<String> => "Domains",
        /// Requested search domains.
        pub domains_configuration: Vec<String> => "DomainsConfiguration",
        /// Nameservers in effect.
        pub nameservers: Vec<String> => "Nameservers",
        /// Requested nameservers.
        pub nameservers_configuration: Vec<String> => "NameserversConfiguration",
        /// Timeservers in effect.
        pub timeservers: Vec<String> => "Timeservers",
        /// Requested timeservers.
        pub timeservers_configuration: Vec<String> => "TimeserversConfiguration",
    }
}

impl Service {
    /// Returns whether connecting needs a passphrase (`psk` or `wep`).
    pub fn is_secured(&self) -> bool {
        self.security
            .iter()
            .any(|method| security::requires_credential(method))
    }
}

property_map! {
    /// A network medium managed by the daemon, e.g. the Wi-Fi radio.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct Technology {
        /// Object path of the technology.
        pub path: ObjectPath => "Path",
        /// Human readable name.
        pub name: String => "Name",
        /// Technology type, e.g. `wifi`, `ethernet`, `cellular`.
        pub technology_type: String => "Type",
        /// Whether the radio or link is powered.
        pub powered: bool => "Powered",
        /// Whether at least one service of this technology is connected.
        pub connected: bool => "Connected",
        /// Whether tethering is enabled.
        pub tethering: bool => "Tethering",
        /// SSID used when tethering over Wi-Fi.
        pub tethering_identifier: String => "TetheringIdentifier",
        /// Passphrase used when tethering over Wi-Fi.
        pub tethering_passphrase: String => "TetheringPassphrase",
    }
}

property_map! {
    /// Properties of the daemon's `net.connman.Clock` object.
    #[derive(Debug, Clone, Default, PartialEq, Eq)]
    pub struct ClockProperties {
        /// Seconds since the epoch.
        pub time: u64 => "Time",
        /// `manual` or `auto`.
        pub time_updates: String => "TimeUpdates",
        /// Current timezone, e.g. `Europe/Rome`.
        pub timezone: String => "Timezone",
        /// `manual` or `auto`.
        pub timezone_updates: String => "TimezoneUpdates",
        /// Configured NTP servers.
        pub timeservers: Vec<String> => "Timeservers",
    }
}

/// A wall-clock snapshot, minute resolution, in local time.
///
/// `method` is the daemon's `TimeUpdates` mode at the time the snapshot was
/// taken; it is ignored when setting the time.
///
/// # Examples
///
/// ```rust
/// use connmanrs::Clock;
///
/// let clock = Clock::parse("9", "05", "2024", "6", "15").unwrap();
/// assert_eq!((clock.hours, clock.minutes), (9, 5));
/// assert_eq!((clock.year, clock.month, clock.day), (2024, 6, 15));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clock {
    /// `manual` or `auto`; empty when unknown.
    pub method: String,
    /// Hour of the day, 0-23.
    pub hours: u32,
    /// Minute of the hour, 0-59.
    #[serde(rename = "mins")]
    pub minutes: u32,
    /// Calendar year.
    pub year: i32,
    /// Month, 1-12.
    pub month: u32,
    /// Day of the month, 1-31.
    pub day: u32,
}

impl Clock {
    /// Snapshot of the given instant. Seconds are dropped.
    pub fn from_time<Tz: TimeZone>(time: &DateTime<Tz>) -> Self {
        Self {
            method: String::new(),
            hours: time.hour(),
            minutes: time.minute(),
            year: time.year(),
            month: time.month(),
            day: time.day(),
        }
    }

    /// The instant this snapshot denotes in the local timezone.
    ///
    /// The fields are read as local wall-clock time, never as UTC, so a
    /// snapshot taken with [`Clock::from_time`] on `Local::now()` maps back
    /// to the same instant and [`ConnMan::set_manual_time`](crate::ConnMan::set_manual_time)
    /// sends the Unix time the user meant.
    ///
    /// # Errors
    ///
    /// Returns `ConnmanError::InvalidTime` if the fields do not form a valid
    /// date and time, or the time does not exist locally (DST gap).
    pub fn to_time(&self) -> Result<DateTime<Local>, ConnmanError> {
        let naive = NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|date| date.and_hms_opt(self.hours, self.minutes, 0))
            .ok_or_else(|| {
                ConnmanError::InvalidTime(format!(
                    "{}/{}/{} {}:{}",
                    self.day, self.month, self.year, self.hours, self.minutes
                ))
            })?;

        Local
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| ConnmanError::InvalidTime(format!("{naive} does not exist locally")))
    }

    /// Builds a snapshot from decimal strings, as typed in by a user.
    ///
    /// # Errors
    ///
    /// Returns `ConnmanError::InvalidTime` if a field is not a number or
    /// the result is not a valid date and time.
    pub fn parse(
        hours: &str,
        mins: &str,
        year: &str,
        month: &str,
        day: &str,
    ) -> Result<Self, ConnmanError> {
        fn number<T: std::str::FromStr>(label: &str, raw: &str) -> Result<T, ConnmanError> {
            raw.trim()
                .parse()
                .map_err(|_| ConnmanError::InvalidTime(format!("invalid {label}: {raw:?}")))
        }

        let clock = Self {
            method: String::new(),
            hours: number("hours", hours)?,
            minutes: number("minutes", mins)?,
            year: number("year", year)?,
            month: number("month", month)?,
            day: number("day", day)?,
        };
        clock.to_time()?;
        Ok(clock)
    }

    /// Sets the `method` field.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }
}

/// Commands run around clock changes.
///
/// Setting the time manually writes it to the hardware clock; switching to
/// automatic time restarts the time daemon around a one-shot NTP sync. All of
/// these are best effort: failures are logged and never returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockSync {
    /// Whether the commands run at all.
    pub enabled: bool,
    /// Program writing the system time to the hardware clock (`-w`).
    pub hwclock: String,
    /// Service manager used to stop and start the time daemon.
    pub systemctl: String,
    /// Program performing the one-shot sync (`-s <server>`).
    pub ntpdate: String,
    /// Unit name of the time daemon.
    pub time_daemon: String,
    /// NTP server for the one-shot sync.
    pub ntp_server: String,
}

impl ClockSync {
    /// No side effects at all; only the daemon's properties change.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

impl Default for ClockSync {
    fn default() -> Self {
        Self {
            enabled: true,
            hwclock: clock_sync::HWCLOCK.to_string(),
            systemctl: clock_sync::SYSTEMCTL.to_string(),
            ntpdate: clock_sync::NTPDATE.to_string(),
            time_daemon: clock_sync::TIME_DAEMON.to_string(),
            ntp_server: clock_sync::NTP_SERVER.to_string(),
        }
    }
}

/// Configuration for a [`ConnMan`](crate::ConnMan) handle.
///
/// # Examples
///
/// ```rust
/// use connmanrs::{ClockSync, ConnManConfig};
/// use std::time::Duration;
///
/// let config = ConnManConfig::new()
///     .with_method_timeout(Duration::from_secs(30))
///     .with_clock_sync(ClockSync::disabled());
/// assert_eq!(config.method_timeout, Some(Duration::from_secs(30)));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnManConfig {
    /// Well-known bus name of the daemon.
    pub service: String,
    /// Upper bound on every method call. `None` waits as long as the
    /// transport does.
    pub method_timeout: Option<Duration>,
    /// Object path the credential agent is exported at.
    pub agent_path: ObjectPath,
    /// Side effects of clock changes.
    pub clock: ClockSync,
}

impl ConnManConfig {
    /// Returns the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Talks to a daemon under another bus name.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    /// Bounds every method call.
    #[must_use]
    pub fn with_method_timeout(mut self, timeout: Duration) -> Self {
        self.method_timeout = Some(timeout);
        self
    }

    /// Exports the credential agent at another path.
    #[must_use]
    pub fn with_agent_path(mut self, path: impl Into<ObjectPath>) -> Self {
        self.agent_path = path.into();
        self
    }

    /// Replaces the clock side effects.
    #[must_use]
    pub fn with_clock_sync(mut self, clock: ClockSync) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for ConnManConfig {
    /// Defaults:
    /// - `service`: `net.connman`
    /// - `method_timeout`: `None`
    /// - `agent_path`: `/test/agent`
    /// - `clock`: [`ClockSync::default()`]
    fn default() -> Self {
        Self {
            service: SERVICE.to_string(),
            method_timeout: None,
            agent_path: ObjectPath::from(path::AGENT),
            clock: ClockSync::default(),
        }
    }
}

/// Errors raised while mapping dictionaries onto structures.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The dictionary holds a key that names no field.
    #[error("no such field {0} in structure")]
    NoSuchField(String),

    /// The field exists but cannot be assigned from a dictionary.
    #[error("cannot set {0} field value")]
    NotSettable(String),

    /// The value's type differs from the field's declared type.
    #[error("value type ({found}) does not match field type ({expected}) of {field}")]
    TypeMismatch {
        /// Normalized property name.
        field: String,
        /// Declared type of the field.
        expected: VariantType,
        /// Type of the incoming value.
        found: VariantType,
    },

    /// Only structures can be encoded into a dictionary.
    #[error("expected struct, found {0}")]
    NotAStruct(VariantType),

    /// A bus value outside the shapes ConnMan uses.
    #[error("unsupported D-Bus value of type `{0}`")]
    UnsupportedValue(String),

    /// A bus value could not be built or taken apart.
    #[error("malformed D-Bus value: {0}")]
    Malformed(#[from] zvariant::Error),
}

/// Errors returned by ConnMan operations.
#[derive(Debug, Error)]
pub enum ConnmanError {
    /// The bus connection failed or a call could not be delivered.
    #[error("D-Bus error: {0}")]
    Transport(zbus::Error),

    /// The daemon rejected the call.
    #[error("{name}: {message}")]
    Remote {
        /// D-Bus error name, e.g. `net.connman.Error.InvalidArguments`.
        name: String,
        /// Message attached to the error, possibly empty.
        message: String,
    },

    /// A dictionary could not be mapped onto a structure.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The requested property is not in the object's property dictionary.
    #[error("invalid property: {0}")]
    InvalidProperty(String),

    /// The reply did not have the shape the method returns.
    #[error("unexpected reply to {method}: expected {expected}, found {found}")]
    UnexpectedReply {
        /// Method that was called.
        method: String,
        /// Expected reply shape.
        expected: &'static str,
        /// Received reply shape.
        found: String,
    },

    /// A clock value does not denote a valid instant.
    #[error("invalid time: {0}")]
    InvalidTime(String),

    /// The credential agent could not be exported.
    #[error("could not spawn a new agent: {0}")]
    AgentUnavailable(String),
}

impl From<zbus::Error> for ConnmanError {
    fn from(e: zbus::Error) -> Self {
        match e {
            zbus::Error::MethodError(name, message, _) => Self::Remote {
                name: name.to_string(),
                message: message.unwrap_or_default(),
            },
            other => Self::Transport(other),
        }
    }
}

impl From<zvariant::Error> for ConnmanError {
    fn from(e: zvariant::Error) -> Self {
        Self::Codec(CodecError::Malformed(e))
    }
}
