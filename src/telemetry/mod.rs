//! Report to governor telemetry delivery.

mod exporter;
mod payload;
mod sink;

pub use exporter::{TELEMETRY_SUCCESS_STATUS, TelemetryExporter};
pub use payload::{Container, TelemetryPayload, Workload};
pub use sink::{HttpTelemetrySink, SinkResponse, TelemetrySink};
