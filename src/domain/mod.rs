// Domain layer: models, wire messages and the ports the core talks through.

pub mod messages;
pub mod model;
pub mod ports;
