//! Host-mode support: glue between the protocol engine's host stack and
//! an external SPI host controller.

pub mod max3421;

pub use max3421::{InterruptLine, Max3421Bridge};
