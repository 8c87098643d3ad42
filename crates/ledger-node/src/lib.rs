pub mod api;
pub mod constants;
pub mod transport;
