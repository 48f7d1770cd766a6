//! Core internal logic for ConnMan control operations.
//!
//! Each operation binds a [`Session`](crate::Session) to the object it
//! targets, performs one or a fixed sequence of calls, and maps the replies
//! through the dictionary codec.

pub(crate) mod clock;
pub(crate) mod manager;
pub(crate) mod service;
pub(crate) mod technology;
