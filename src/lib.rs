pub mod auth;
pub mod config;
pub mod error;
pub mod report;
pub mod retry;
pub mod store;
pub mod telemetry;
mod utils;

pub use auth::{BearerTokenProvider, CredentialProvider, SharedCredentialProvider};
pub use error::ExportError;
pub use report::AssessmentReport;
pub use telemetry::TelemetryExporter;
