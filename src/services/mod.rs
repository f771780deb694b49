pub mod flow;
pub mod ports;
pub mod sessions;
pub mod store;
