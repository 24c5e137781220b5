pub mod bus;
pub mod telemetry;
