//! Domain Module
//!
//! Core types and port traits shared by the facade and the storage engine.

pub mod operation;
pub mod ports;

pub use operation::*;
pub use ports::*;
