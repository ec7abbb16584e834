pub mod heading;
pub mod telemetry;
