/// Concurrent port-scan engine
///
/// Dispatches one probe task per configured port onto a bounded set of
/// concurrent workers, tracks per-port task status for the progress
/// reporter, and aggregates one `ServiceRecord` per port for the report
/// builder.

pub mod progress;

pub use progress::ProgressReporter;

use crate::catalog::ServiceCatalog;
use crate::config::ScanConfig;
use crate::detection::ServiceRecord;
use crate::error::ScanResult;
use crate::net::{self, http, HostState, HttpRequest, TcpClient, TlsClient};
use crate::output;
use crate::report::{self, ReportBuilder};
use crate::timer::Timer;
use chrono::{DateTime, Local};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};

/// Ports shown in the startup banner before truncation
const PORT_PREVIEW_LEN: usize = 7;

/// Per-port task lifecycle marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    NotStarted,
    Executing,
    Complete,
}

/// Network service scanner over one target and a set of ports
pub struct Scanner {
    config: ScanConfig,
    catalog: ServiceCatalog,
    statuses: Mutex<HashMap<u16, TaskStatus>>,
    records: Mutex<Vec<ServiceRecord>>,
    progress: ProgressReporter,
    timer: Timer,
}

impl Scanner {
    /// Create a scanner from a validated configuration
    pub fn new(config: ScanConfig) -> ScanResult<Self> {
        let catalog = ServiceCatalog::load()?;
        let progress = ProgressReporter::new(config.ports.len());

        Ok(Self {
            config,
            catalog,
            statuses: Mutex::new(HashMap::new()),
            records: Mutex::new(Vec::new()),
            progress,
            timer: Timer::new(),
        })
    }

    /// Perform the scan: validate, dispatch one task per port, wait for
    /// the workers to drain, and emit the final report
    pub async fn run(&mut self) -> ScanResult<()> {
        self.config.validate()?;

        // The scan aborts up front when the target cannot be resolved;
        // individual port failures never do
        let probe = TcpClient::new(&self.config, self.config.ports[0]);
        probe.resolve().await?;

        {
            let mut statuses = self.statuses.lock().unwrap();

            for &port in &self.config.ports {
                statuses.insert(port, TaskStatus::NotStarted);
            }
        }

        let start_time = self.timer.start();
        self.print_startup(start_time);

        info!(
            "Scanning {} ports on '{}' with {} workers",
            self.config.ports.len(),
            self.config.target,
            self.config.threads
        );

        {
            let this: &Scanner = self;

            let mut tasks = stream::iter(this.config.ports.clone())
                .map(|port| this.scan_port(port))
                .buffer_unordered(this.config.threads);

            while tasks.next().await.is_some() {}
        }

        self.timer.stop();
        self.emit_report()
    }

    /// Aggregated records, sorted by ascending port number
    pub fn records(&self) -> Vec<ServiceRecord> {
        let mut records = self.records.lock().unwrap().clone();
        records.sort_by_key(|record| record.port);
        records
    }

    /// Task status for a port, when the port is part of the scan
    pub fn status(&self, port: u16) -> Option<TaskStatus> {
        self.statuses.lock().unwrap().get(&port).copied()
    }

    /// One port's probe task
    async fn scan_port(&self, port: u16) {
        self.progress.poll(self.completed_tasks());
        self.set_status(port, TaskStatus::Executing);

        let mut record = self.probe_port(port).await;
        record.update_from_catalog(&self.catalog);

        self.set_status(port, TaskStatus::Complete);
        self.records.lock().unwrap().push(record);
    }

    /// Connect, probe, and identify one port
    ///
    /// State machine: connect, banner read, optional HTTP exchange, and a
    /// single TLS retry when the open port produced no identity.
    async fn probe_port(&self, port: u16) -> ServiceRecord {
        let mut client = TcpClient::new(&self.config, port);

        if let Err(e) = client.connect().await {
            info!("{}", e.summary());
            return ServiceRecord::new(port, client.host_state());
        }

        let mut record = ServiceRecord::new(port, HostState::Open);

        let banner = client.recv_banner().await;
        record.state = client.host_state();

        if !banner.is_empty() {
            record.parse_banner(&String::from_utf8_lossy(&banner));
        }

        if record.state == HostState::Open && (banner.is_empty() || self.config.curl) {
            self.probe_http_tcp(&mut client, &mut record).await;
        }

        client.disconnect();

        // Open but silent in both probes: the peer may only speak TLS
        if self.config.tls_enabled && record.state == HostState::Open && !record.identified() {
            self.retry_over_tls(port, &mut record).await;
        }

        record
    }

    /// HTTP exchange over the established TCP stream
    async fn probe_http_tcp(&self, client: &mut TcpClient, record: &mut ServiceRecord) {
        let request = self.build_request();
        let endpoint = net::port_notation(record.port);

        let stream = match client.stream_mut() {
            Some(stream) => stream,
            None => return,
        };

        match http::exchange(
            stream,
            &request,
            self.config.recv_timeout,
            self.config.send_timeout,
            &endpoint,
        )
        .await
        {
            Ok(response) => record.apply_http(request, response),
            Err(e) => debug!("HTTP probe failed on {}: {}", endpoint, e),
        }
    }

    /// Retry the banner and HTTP probes over a fresh TLS connection
    async fn retry_over_tls(&self, port: u16, record: &mut ServiceRecord) {
        let endpoint = net::port_notation(port);

        let mut tls_client = match TlsClient::connect(&self.config, port).await {
            Ok(client) => client,
            Err(e) => {
                info!("{}", e.summary());
                return;
            }
        };

        let banner = tls_client.recv_banner().await;

        if !banner.is_empty() {
            record.parse_banner(&String::from_utf8_lossy(&banner));
        }

        if banner.is_empty() || self.config.curl {
            let request = self.build_request();

            match http::exchange(
                tls_client.stream_mut(),
                &request,
                self.config.recv_timeout,
                self.config.send_timeout,
                &endpoint,
            )
            .await
            {
                Ok(response) => record.apply_http(request, response),
                Err(e) => debug!("HTTPS probe failed on {}: {}", endpoint, e),
            }
        }

        record.state = tls_client.host_state();
        record.set_tls_info(tls_client.info().clone());
    }

    /// Probe request with the configured method and URI
    fn build_request(&self) -> HttpRequest {
        let method = if self.config.curl { "GET" } else { "HEAD" };
        HttpRequest::new(method, &self.config.target, &self.config.uri)
    }

    /// Record a task status transition
    fn set_status(&self, port: u16, status: TaskStatus) {
        self.statuses.lock().unwrap().insert(port, status);
    }

    /// Count of completed tasks in the status map
    fn completed_tasks(&self) -> usize {
        self.statuses
            .lock()
            .unwrap()
            .values()
            .filter(|status| **status == TaskStatus::Complete)
            .count()
    }

    /// Print the startup banner with the scan parameters
    fn print_startup(&self, start_time: DateTime<Local>) {
        let preview: Vec<String> = self
            .config
            .ports
            .iter()
            .take(PORT_PREVIEW_LEN)
            .map(u16::to_string)
            .collect();

        let mut ports_str = preview.join(", ");

        if self.config.ports.len() > PORT_PREVIEW_LEN {
            ports_str.push_str(&format!(
                " ... ({} not shown)",
                self.config.ports.len() - PORT_PREVIEW_LEN
            ));
        }

        println!("{}", output::header(&report::app_title(), true));
        println!("{}", output::field("Time  ", &Timer::timestamp(start_time), true));
        println!("{}", output::field("Target", &self.config.target, true));
        println!("{}", output::field("Ports ", &ports_str, true));

        // Separate the banner from connection status lines
        if self.config.verbose {
            println!();
        }
    }

    /// Print the scan summary and report, then save the report file when
    /// an output path was configured
    fn emit_report(&self) -> ScanResult<()> {
        let records = self.records();
        let builder = ReportBuilder::new(&self.config, &self.timer, records);

        println!();
        println!("{}", builder.summary(true));
        println!();

        if self.config.out_json && self.config.out_path.is_none() {
            println!("{}", builder.json_string());
        } else {
            println!("{}", builder.text_table());

            if self.config.verbose {
                for record in builder.records() {
                    if record.state == HostState::Open {
                        println!("{}\n", record.details(true));
                    }
                }
            }
        }

        builder.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn test_config(ports: Vec<u16>) -> ScanConfig {
        ScanConfig {
            target: "127.0.0.1".to_string(),
            ports,
            threads: 4,
            connect_timeout: Duration::from_millis(500),
            recv_timeout: Duration::from_millis(300),
            send_timeout: Duration::from_millis(300),
            ..Default::default()
        }
    }

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    async fn spawn_http_listener() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut request = vec![0u8; 1024];
                    let _ = socket.read(&mut request).await;

                    let _ = socket
                        .write_all(b"HTTP/1.1 200 OK\r\nServer: nginx/1.25.0\r\n\r\n")
                        .await;
                });
            }
        });

        port
    }

    async fn spawn_banner_listener(banner: &'static [u8]) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let _ = socket.write_all(banner).await;
            }
        });

        port
    }

    #[tokio::test]
    async fn test_scan_produces_one_record_per_port() {
        let open = spawn_http_listener().await;
        let closed = closed_port().await;

        let mut scanner = Scanner::new(test_config(vec![open, closed])).unwrap();
        scanner.run().await.unwrap();

        let records = scanner.records();
        assert_eq!(records.len(), 2);

        // Sorted ascending regardless of completion order
        assert!(records[0].port < records[1].port);
    }

    #[tokio::test]
    async fn test_scan_identifies_http_service() {
        let port = spawn_http_listener().await;

        let mut scanner = Scanner::new(test_config(vec![port])).unwrap();
        scanner.run().await.unwrap();

        let records = scanner.records();
        let record = &records[0];

        assert_eq!(record.state, HostState::Open);
        assert_eq!(record.service, "http (1.1)");
        assert_eq!(record.summary, "nginx 1.25.0");
        assert_eq!(record.banner, "nginx/1.25.0");
        assert_eq!(record.response.as_ref().unwrap().status, 200);
    }

    #[tokio::test]
    async fn test_scan_identifies_banner_service() {
        let port = spawn_banner_listener(b"ssh-2.0-openssh_9.3\r\n").await;

        let mut scanner = Scanner::new(test_config(vec![port])).unwrap();
        scanner.run().await.unwrap();

        let records = scanner.records();
        let record = &records[0];

        assert_eq!(record.service, "ssh (2.0)");
        assert_eq!(record.summary, "openssh 9.3");
        assert!(record.response.is_none());
    }

    #[tokio::test]
    async fn test_scan_short_banner_stays_unknown() {
        let port = spawn_banner_listener(b"hello\n").await;

        let mut scanner = Scanner::new(test_config(vec![port])).unwrap();
        scanner.run().await.unwrap();

        let records = scanner.records();
        let record = &records[0];

        assert_eq!(record.summary, "hello");
        assert_eq!(record.banner, "hello");
    }

    #[tokio::test]
    async fn test_closed_port_record_is_bare() {
        let closed = closed_port().await;

        let mut scanner = Scanner::new(test_config(vec![closed])).unwrap();
        scanner.run().await.unwrap();

        let records = scanner.records();
        let record = &records[0];

        assert_eq!(record.state, HostState::Closed);
        assert!(record.banner.is_empty());
        assert!(record.tls_info.is_none());
        assert!(record.response.is_none());
        assert!(!record.service.is_empty());
    }

    #[tokio::test]
    async fn test_all_tasks_complete() {
        let open = spawn_http_listener().await;
        let closed = closed_port().await;

        let mut scanner = Scanner::new(test_config(vec![open, closed])).unwrap();
        scanner.run().await.unwrap();

        assert_eq!(scanner.status(open), Some(TaskStatus::Complete));
        assert_eq!(scanner.status(closed), Some(TaskStatus::Complete));
    }

    #[tokio::test]
    async fn test_unresolvable_target_aborts() {
        let mut config = test_config(vec![80]);
        config.target = "host.invalid.".to_string();

        let mut scanner = Scanner::new(config).unwrap();
        let result = scanner.run().await;

        assert!(matches!(result, Err(crate::error::ScanError::Resolve { .. })));
        assert!(scanner.records().is_empty());
    }
}
