//! XInput2 hierarchy event model for xiwatch
//!
//! This crate decodes hierarchy-changed notifications into device
//! change records and derives the environment variables passed to the
//! dispatched command.

mod model;
mod decode;
mod env;

pub use decode::decode_hierarchy_event;
pub use env::dispatch_environment;
pub use model::*;
