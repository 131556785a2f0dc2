// Domain layer: window model and the ports the worker talks through.

pub mod model;
pub mod ports;
