/// Embedded IANA service name catalog
///
/// Loads the bundled `(port, protocol, service, summary)` CSV resource into
/// an indexed map for service identification fallback lookups.

use crate::error::{ScanError, ScanResult};
use std::collections::HashMap;
use tracing::debug;

/// Embedded CSV resource with one record per line
const CSV_DATA: &str = include_str!("../data/services.csv");

/// Indexed `(port, protocol)` to `(service, summary)` lookup table
#[derive(Debug, Clone)]
pub struct ServiceCatalog {
    entries: HashMap<(u16, String), (String, String)>,
}

impl ServiceCatalog {
    /// Load the embedded CSV resource
    pub fn load() -> ScanResult<Self> {
        Self::from_csv(CSV_DATA)
    }

    /// Build a catalog from CSV data with `port,protocol,service,summary`
    /// records (quoted cells permitted)
    pub fn from_csv(data: &str) -> ScanResult<Self> {
        let mut entries = HashMap::new();

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(data.as_bytes());

        for record in reader.records() {
            let record = record.map_err(|e| {
                ScanError::invalid_arg("catalog", format!("Malformed CSV record: {}", e))
            })?;

            if record.len() != 4 {
                return Err(ScanError::invalid_arg(
                    "catalog",
                    format!("Expected 4 CSV fields, found {}", record.len()),
                ));
            }

            let port: u16 = record[0].parse().map_err(|_| {
                ScanError::invalid_arg(
                    "catalog",
                    format!("Invalid port number in CSV record: {}", &record[0]),
                )
            })?;

            entries.insert(
                (port, record[1].to_string()),
                (record[2].to_string(), record[3].to_string()),
            );
        }

        debug!("Loaded service catalog with {} entries", entries.len());

        Ok(Self { entries })
    }

    /// Look up the service name and summary registered for a port
    pub fn lookup(&self, port: u16, protocol: &str) -> Option<(&str, &str)> {
        self.entries
            .get(&(port, protocol.to_string()))
            .map(|(service, summary)| (service.as_str(), summary.as_str()))
    }

    /// Number of indexed records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog holds no records
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
