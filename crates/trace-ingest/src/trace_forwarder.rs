// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::io::Write;
use std::sync::Arc;
use std::time;

use async_trait::async_trait;
use prost::Message;
use tokio::sync::{mpsc::Receiver, Mutex};
use tracing::{debug, error};

use trace_ingest_proto::otel_trace::TracesData;

use crate::codec::GZIP_ENCODING;
use crate::config::Config;
use crate::http_utils::build_client;
use crate::trace_processor::TRACE_CONTENT_TYPE;

const EXPORT_REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(30);

#[async_trait]
pub trait TraceForwarder {
    /// Listens for translated trace payloads sent to the tokio mpsc Receiver
    /// and handles buffering + deciding when to export them downstream.
    async fn start_trace_forwarder(&self, rx: Receiver<TracesData>);
}

/// Buffers translated payloads and exports them to the configured intake on
/// a fixed interval as gzip-compressed protobuf. Export failures stay inside
/// the forwarder; they are retried on the next interval and never propagate
/// back into request handling.
#[derive(Clone)]
pub struct ExportTraceForwarder {
    pub config: Arc<Config>,
}

#[async_trait]
impl TraceForwarder for ExportTraceForwarder {
    async fn start_trace_forwarder(&self, mut rx: Receiver<TracesData>) {
        let buffer: Arc<Mutex<Vec<TracesData>>> = Arc::new(Mutex::new(Vec::new()));

        let recv_buffer = Arc::clone(&buffer);
        tokio::spawn(async move {
            while let Some(traces) = rx.recv().await {
                recv_buffer.lock().await.push(traces);
            }
        });

        loop {
            tokio::time::sleep(time::Duration::from_secs(
                self.config.trace_flush_interval_secs,
            ))
            .await;
            self.flush(&buffer).await;
        }
    }
}

impl ExportTraceForwarder {
    async fn flush(&self, buffer: &Mutex<Vec<TracesData>>) {
        let batch = {
            let mut guard = buffer.lock().await;
            std::mem::take(&mut *guard)
        };
        if batch.is_empty() {
            return;
        }

        if let Some(failed) = self.send(batch).await {
            // Failed payloads go back to the front of the buffer and ride
            // the next flush interval.
            let mut guard = buffer.lock().await;
            let newer = std::mem::take(&mut *guard);
            *guard = failed.into_iter().chain(newer).collect();
        }
    }

    /// Exports a batch of payloads downstream. Returns the batch back if the
    /// export failed.
    async fn send(&self, batch: Vec<TracesData>) -> Option<Vec<TracesData>> {
        debug!("Exporting {} trace payloads", batch.len());

        let client = match build_client(self.config.proxy_url.as_deref(), EXPORT_REQUEST_TIMEOUT) {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to create export client: {e:?}");
                return Some(batch);
            }
        };

        for traces in &batch {
            let body = match encode_payload(traces) {
                Ok(body) => body,
                Err(e) => {
                    // An unencodable payload can never succeed; drop it
                    // rather than wedging the buffer.
                    error!("Failed to encode trace payload, dropping it: {e}");
                    continue;
                }
            };

            let result = client
                .post(&self.config.trace_export_url)
                .header("content-type", TRACE_CONTENT_TYPE)
                .header("content-encoding", GZIP_ENCODING)
                .body(body)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    debug!("Successfully exported trace payload");
                }
                Ok(response) => {
                    error!("Trace export rejected with status {}", response.status());
                    return Some(batch);
                }
                Err(e) => {
                    error!("Error exporting trace payload: {e:?}");
                    return Some(batch);
                }
            }
        }
        None
    }
}

fn encode_payload(traces: &TracesData) -> Result<Vec<u8>, std::io::Error> {
    let encoded = traces.encode_to_vec();
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(&encoded)?;
    encoder.finish()
}
