//! D-Bus plumbing for talking to ConnMan.
//!
//! This module holds the [`Bus`] transport seam and its system bus
//! implementation, the [`Session`] bound to one remote object, and the
//! credential [`Agent`] exported while connecting to secured services.
//!
//! # ConnMan D-Bus Structure
//!
//! - `/` - Manager (`net.connman.Manager`) and clock (`net.connman.Clock`)
//! - `/net/connman/technology/*` - Technology objects
//! - `/net/connman/service/*` - Service objects

pub(crate) mod agent;
pub(crate) mod bus;
pub(crate) mod session;

pub use agent::Agent;
pub use bus::{Bus, Reply, SystemBus, Target};
pub use session::Session;
