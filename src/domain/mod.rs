// Domain layer: import context, API response models and ports.

pub mod model;
pub mod ports;
