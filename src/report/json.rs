/// JSON report generator
///
/// Builds the structured scan report document. Object keys serialize in
/// insertion order and the output shape is deterministic for a given set
/// of records.

use crate::config::ScanConfig;
use crate::detection::ServiceRecord;
use crate::timer::Timer;
use serde::Serialize;
use serde_json::{json, Value};

/// Build the scan report document
pub fn document(config: &ScanConfig, timer: &Timer, records: &[ServiceRecord]) -> Value {
    let services: Vec<Value> = records.iter().map(service_object).collect();

    let report_path = config
        .out_path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_default();

    json!({
        "appInfo": {
            "name": crate::NAME,
            "repository": crate::REPOSITORY,
        },
        "scanSummary": {
            "duration": timer.elapsed_str(),
            "startTime": timer.beg_timestamp(),
            "endTime": timer.end_timestamp(),
            "reportPath": report_path,
            "executable": config.exe_path,
            "arguments": config.argv,
        },
        "scanResults": {
            "target": config.target,
            "services": services,
        },
    })
}

/// Serialize the report document with four-space indentation
pub fn render(config: &ScanConfig, timer: &Timer, records: &[ServiceRecord]) -> String {
    let document = document(config, timer, records);

    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);

    match document.serialize(&mut serializer) {
        Ok(()) => String::from_utf8_lossy(&buffer).to_string(),
        Err(_) => document.to_string(),
    }
}

/// Build one record's service object, with TLS and HTTP blocks attached
/// only when those probes produced data
fn service_object(record: &ServiceRecord) -> Value {
    let mut value = json!({
        "port": record.port,
        "protocol": record.proto,
        "state": record.state.to_string(),
        "service": record.service,
        "summary": record.summary,
        "banner": record.banner,
    });

    if let Value::Object(object) = &mut value {
        if let Some(tls) = &record.tls_info {
            object.insert("cipherSuite".to_string(), json!(tls.cipher_suite));
            object.insert("x509Issuer".to_string(), json!(tls.issuer));
            object.insert("x509Subject".to_string(), json!(tls.subject));
        }

        if let (Some(request), Some(response)) = (&record.request, &record.response) {
            object.insert(
                "httpInfo".to_string(),
                json!({
                    "request": {
                        "version": request.version,
                        "method": request.method,
                        "uri": request.uri,
                        "headers": request.headers,
                    },
                    "response": {
                        "version": response.version,
                        "status": response.status,
                        "reason": response.reason,
                        "headers": response.headers,
                        "body": response.body,
                    },
                }),
            );
        }
    }

    value
}
