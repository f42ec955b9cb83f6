// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;

const DEFAULT_TRACE_INGEST_PORT: u16 = 7276;
const DEFAULT_TRACE_FLUSH_INTERVAL_SECS: u64 = 3;
const DEFAULT_TENANT_TOKEN_HEADER: &str = "x-tenant-token";

/// Read-only service configuration, shared across requests behind an Arc and
/// never mutated after startup.
#[derive(Debug)]
pub struct Config {
    /// port the ingest endpoint listens on
    pub trace_ingest_port: u16,
    pub max_request_content_length: usize,
    /// how often the forwarder flushes buffered payloads, in seconds
    pub trace_flush_interval_secs: u64,
    /// downstream intake the forwarder exports translated payloads to
    pub trace_export_url: String,
    /// when enabled, the tenant token header is stamped onto every resource
    pub tenant_token_passthrough: bool,
    /// request header the tenant token is read from
    pub tenant_token_header: String,
    /// TLS material paths, carried as values only; termination is handled by
    /// the fronting listener
    pub tls_cert_file: Option<String>,
    pub tls_key_file: Option<String>,
    pub proxy_url: Option<String>,
}

impl Config {
    pub fn new() -> Result<Config, Box<dyn std::error::Error>> {
        let trace_export_url = env::var("TRACE_EXPORT_URL")
            .map_err(|_| anyhow::anyhow!("TRACE_EXPORT_URL environment variable is not set"))?;

        let trace_ingest_port: u16 = env::var("TRACE_INGEST_PORT")
            .ok()
            .and_then(|port| port.parse::<u16>().ok())
            .unwrap_or(DEFAULT_TRACE_INGEST_PORT);

        let trace_flush_interval_secs: u64 = env::var("TRACE_FLUSH_INTERVAL")
            .ok()
            .and_then(|interval| interval.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TRACE_FLUSH_INTERVAL_SECS);

        let tenant_token_passthrough = env::var("TRACE_TENANT_PASSTHROUGH")
            .map(|val| val.to_lowercase() == "true")
            .unwrap_or(false);

        let tenant_token_header = env::var("TRACE_TENANT_HEADER")
            .map(|header| header.to_lowercase())
            .unwrap_or_else(|_| DEFAULT_TENANT_TOKEN_HEADER.to_string());

        Ok(Config {
            trace_ingest_port,
            max_request_content_length: 10 * 1024 * 1024, // 10MB in Bytes
            trace_flush_interval_secs,
            trace_export_url,
            tenant_token_passthrough,
            tenant_token_header,
            tls_cert_file: env::var("TRACE_INGEST_TLS_CERT_FILE").ok(),
            tls_key_file: env::var("TRACE_INGEST_TLS_KEY_FILE").ok(),
            proxy_url: env::var("HTTPS_PROXY").ok(),
        })
    }
}
