pub mod config;
pub mod emulator;
pub mod session;
pub mod telemetry;
pub mod transport;
