//! Cross-cutting utilities: logging bootstrap, the stop-control gate, and
//! the payload compression service.

pub mod compression;
pub mod logging;
pub mod stopcontrol;
