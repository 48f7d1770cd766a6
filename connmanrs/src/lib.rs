//! A Rust library for ConnMan over D-Bus.
//!
//! This crate provides a high-level async API for the common ConnMan
//! operations:
//!
//! - Listing services and technologies
//! - Connecting to open and passphrase-secured services
//! - Applying static IPv4 and nameserver settings
//! - Powering and scanning technologies
//! - Reading and setting the clock
//!
//! # Example
//!
//! ```no_run
//! use connmanrs::ConnMan;
//!
//! # async fn example() -> connmanrs::Result<()> {
//! let cm = ConnMan::new().await?;
//!
//! // List services
//! for svc in cm.list_services().await? {
//!     println!("{} [{}] {}%", svc.name, svc.state, svc.strength);
//! }
//!
//! // Connect to one
//! let services = cm.list_services().await?;
//! if let Some(svc) = services.iter().find(|s| s.name == "MyNetwork") {
//!     cm.connect(svc, "password123").await?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Property Dictionaries
//!
//! ConnMan describes every object as a dictionary of named, typed values.
//! The [`codec`] layer maps those dictionaries onto plain structs such as
//! [`Service`] and back. Keys are matched after dropping punctuation, so
//! `IPv4.Configuration` lands in the `ipv4_configuration` field. Your own
//! structs can join in through [`property_map!`].
//!
//! # Error Handling
//!
//! All operations return `Result<T, ConnmanError>`. Errors reported by the
//! daemon come back as [`ConnmanError::Remote`] with the D-Bus error name
//! intact; decoding problems are [`ConnmanError::Codec`].
//!
//! # Logging
//!
//! This crate uses the [`log`](https://docs.rs/log) facade for logging. To see
//! log output, add a logging implementation like `env_logger`. For example:
//!
//! ```no_run,ignore
//! env_logger::init();
//! // ...
//! ```

// Internal implementation modules
mod core;
mod types;

// Public API modules
pub mod api;
pub mod codec;
pub mod dbus;

// Re-exported public API
pub use api::connman::ConnMan;
pub use api::models::{
    Clock, ClockProperties, ClockSync, CodecError, ConnManConfig, ConnmanError, EthernetConfig,
    Ipv4Config, Ipv6Config, Provider, ProxyConfig, Service, Technology,
};
pub use codec::{
    ObjectPath, Property, PropertyDict, PropertyMap, Variant, VariantType, decode, encode,
    normalize_key,
};
pub use dbus::{Agent, Bus, Reply, Session, SystemBus, Target};

/// A specialized `Result` type for ConnMan operations.
pub type Result<T> = std::result::Result<T, ConnmanError>;
