/// SvcProbe - Network Service Scanner Library
///
/// A concurrent TCP/HTTP service scanner: expands a port specification,
/// probes each port with banner collection, HTTP probing, and an optional
/// TLS retry, then reports the identified services.

// Module declarations
pub mod catalog;
pub mod config;
pub mod detection;
pub mod error;
pub mod logging;
pub mod net;
pub mod output;
pub mod ports;
pub mod report;
pub mod scanner;
pub mod timer;

// Re-export commonly used types
pub use catalog::ServiceCatalog;
pub use config::ScanConfig;
pub use detection::ServiceRecord;
pub use error::{ScanError, ScanResult};
pub use net::{HostState, HttpRequest, HttpResponse, TlsInfo};
pub use ports::parse_port_spec;
pub use report::ReportBuilder;
pub use scanner::{ProgressReporter, Scanner, TaskStatus};
pub use timer::Timer;

/// Application display name
pub const NAME: &str = "SvcProbe";

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Project repository
pub const REPOSITORY: &str = env!("CARGO_PKG_REPOSITORY");
