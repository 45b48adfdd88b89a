// Adapters layer: concrete implementations for external systems (http transport, intake directory).

pub mod http;
pub mod intake;
