// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::{
    header,
    http::{self, HeaderMap},
    StatusCode,
};
use prost::Message;
use tokio::sync::mpsc::Sender;
use tracing::debug;

use trace_ingest_proto::jaeger;
use trace_ingest_proto::otel_trace::TracesData;

use crate::codec::ContentEncoding;
use crate::config::Config;
use crate::error::IngestError;
use crate::http_utils::{self, log_and_create_http_response, HttpRequest, HttpResponse};
use crate::tenant;
use crate::translate;

/// The wire media type every batch request must declare.
pub const TRACE_CONTENT_TYPE: &str = "application/x-protobuf";

#[async_trait]
pub trait TraceProcessor {
    /// Decodes the span batch request carried by `req`, translates it into a
    /// trace payload and sends it through the provided tokio mpsc Sender.
    async fn process_traces(
        &self,
        config: Arc<Config>,
        req: HttpRequest,
        tx: Sender<TracesData>,
    ) -> http::Result<HttpResponse>;
}

#[derive(Clone)]
pub struct SpanBatchProcessor {}

#[async_trait]
impl TraceProcessor for SpanBatchProcessor {
    async fn process_traces(
        &self,
        config: Arc<Config>,
        req: HttpRequest,
        tx: Sender<TracesData>,
    ) -> http::Result<HttpResponse> {
        debug!("Received trace batches to process");
        let (parts, body) = req.into_parts();

        if let Some(response) = http_utils::verify_request_content_length(
            &parts.headers,
            config.max_request_content_length,
            "Error processing trace batches",
        ) {
            return response;
        }

        if !content_type_is_protobuf(&parts.headers) {
            return log_and_create_http_response(
                &format!("Error processing trace batches: content type must be {TRACE_CONTENT_TYPE}"),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            );
        }

        // Resolve the codec up front so an unsupported token is rejected
        // before the body is read.
        let encoding = match content_encoding(&parts.headers) {
            Ok(encoding) => encoding,
            Err(err) => {
                return log_and_create_http_response(
                    &format!("Error processing trace batches: {err}"),
                    err.status_code(),
                );
            }
        };

        let body_bytes = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                return log_and_create_http_response(
                    &format!("Error reading trace request body: {e}"),
                    StatusCode::BAD_REQUEST,
                );
            }
        };

        // Decompress and deserialize; both are all-or-nothing for the whole
        // request.
        let request = match decode_request(encoding, body_bytes) {
            Ok(request) => request,
            Err(err) => {
                return log_and_create_http_response(
                    &format!("Error processing trace batches: {err}"),
                    err.status_code(),
                );
            }
        };

        let mut traces = translate::post_spans_request_to_traces(request);

        if let Some(token) = tenant::tenant_token_from_headers(
            &parts.headers,
            &config.tenant_token_header,
            config.tenant_token_passthrough,
        ) {
            tenant::inject_tenant_token(&mut traces, &token);
        }

        // Hand the payload off to the forwarder; ownership transfers and no
        // per-request state survives past this point.
        match tx.send(traces).await {
            Ok(_) => log_and_create_http_response(
                "Successfully buffered traces to be exported.",
                StatusCode::OK,
            ),
            Err(err) => {
                let err = IngestError::ConsumerRejected(err.to_string());
                log_and_create_http_response(
                    &format!("Error processing trace batches: {err}"),
                    err.status_code(),
                )
            }
        }
    }
}

fn content_type_is_protobuf(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value == TRACE_CONTENT_TYPE)
        .unwrap_or(false)
}

fn content_encoding(headers: &HeaderMap) -> Result<ContentEncoding, IngestError> {
    let token = match headers.get(header::CONTENT_ENCODING) {
        Some(value) => Some(value.to_str().map_err(|_| {
            IngestError::UnsupportedEncoding(String::from_utf8_lossy(value.as_bytes()).into_owned())
        })?),
        None => None,
    };
    ContentEncoding::from_token(token)
}

fn decode_request(
    encoding: ContentEncoding,
    body: Bytes,
) -> Result<jaeger::PostSpansRequest, IngestError> {
    let decompressed = encoding.decompress(body)?;
    Ok(jaeger::PostSpansRequest::decode(decompressed.as_ref())?)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use hyper::{Request, StatusCode};
    use prost::Message;
    use tokio::sync::mpsc::{self, Receiver, Sender};

    use trace_ingest_proto::jaeger;
    use trace_ingest_proto::otel_common::{any_value, KeyValue};
    use trace_ingest_proto::otel_trace::{status::StatusCode as SpanStatusCode, TracesData};

    use crate::config::Config;
    use crate::http_utils::full_body;
    use crate::trace_processor::{self, TraceProcessor, TRACE_CONTENT_TYPE};

    const TRACE_ID: [u8; 16] = [
        0xF1, 0xF2, 0xF3, 0xF4, 0xF5, 0xF6, 0xF7, 0xF8, 0xF9, 0xFA, 0xFB, 0xFC, 0xFD, 0xFE, 0xFF,
        0x80,
    ];
    const PARENT_SPAN_ID: [u8; 8] = [0x1F, 0x1E, 0x1D, 0x1C, 0x1B, 0x1A, 0x19, 0x18];
    const CHILD_SPAN_ID: [u8; 8] = [0xAF, 0xAE, 0xAD, 0xAC, 0xAB, 0xAA, 0xA9, 0xA8];

    fn create_test_config() -> Config {
        Config {
            trace_ingest_port: 7276,
            max_request_content_length: 10 * 1024 * 1024,
            trace_flush_interval_secs: 3,
            trace_export_url: "http://localhost:4318/v1/traces".to_string(),
            tenant_token_passthrough: false,
            tenant_token_header: "x-tenant-token".to_string(),
            tls_cert_file: None,
            tls_key_file: None,
            proxy_url: None,
        }
    }

    fn create_test_request_payload() -> jaeger::PostSpansRequest {
        jaeger::PostSpansRequest {
            batches: vec![jaeger::Batch {
                process: Some(jaeger::Process {
                    service_name: "svc-A".to_string(),
                    tags: vec![
                        jaeger::KeyValue::bool("bool", true),
                        jaeger::KeyValue::string("string", "yes"),
                        jaeger::KeyValue::int64("int64", 10_000_000),
                    ],
                }),
                spans: vec![
                    jaeger::Span {
                        trace_id: TRACE_ID.to_vec(),
                        span_id: PARENT_SPAN_ID.to_vec(),
                        operation_name: "ProxyFetch".to_string(),
                        start_time: Some(::prost_types::Timestamp {
                            seconds: 1_542_158_650,
                            nanos: 0,
                        }),
                        duration: Some(::prost_types::Duration {
                            seconds: 600,
                            nanos: 0,
                        }),
                        tags: vec![
                            jaeger::KeyValue::string("otel.status_description", "ok"),
                            jaeger::KeyValue::string("otel.status_code", "OK"),
                        ],
                        ..Default::default()
                    },
                    jaeger::Span {
                        trace_id: TRACE_ID.to_vec(),
                        span_id: CHILD_SPAN_ID.to_vec(),
                        operation_name: "DBSearch".to_string(),
                        start_time: Some(::prost_types::Timestamp {
                            seconds: 1_542_158_650,
                            nanos: 0,
                        }),
                        duration: Some(::prost_types::Duration {
                            seconds: 2,
                            nanos: 0,
                        }),
                        tags: vec![
                            jaeger::KeyValue::string("otel.status_description", "err"),
                            jaeger::KeyValue::string("otel.status_code", "ERROR"),
                        ],
                        references: vec![jaeger::SpanRef {
                            trace_id: TRACE_ID.to_vec(),
                            span_id: PARENT_SPAN_ID.to_vec(),
                            ref_type: jaeger::SpanRefType::ChildOf as i32,
                        }],
                        ..Default::default()
                    },
                ],
            }],
        }
    }

    fn encode_request_payload(payload: &jaeger::PostSpansRequest) -> Vec<u8> {
        payload.encode_to_vec()
    }

    fn compress_gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn create_channel() -> (Sender<TracesData>, Receiver<TracesData>) {
        mpsc::channel(1)
    }

    fn build_request(
        body: Vec<u8>,
        content_type: &str,
        content_encoding: Option<&str>,
    ) -> Request<crate::http_utils::Body> {
        let mut builder = Request::builder()
            .header("content-type", content_type)
            .header("content-length", body.len().to_string());
        if let Some(encoding) = content_encoding {
            builder = builder.header("content-encoding", encoding);
        }
        builder.body(full_body(body)).unwrap()
    }

    async fn assert_received_scenario_payload(rx: &mut Receiver<TracesData>) {
        let traces = rx.recv().await.unwrap();
        assert_eq!(traces.resource_spans.len(), 1);

        let resource_spans = &traces.resource_spans[0];
        let resource = resource_spans.resource.as_ref().unwrap();
        assert_eq!(
            resource.attributes[0],
            KeyValue::new(
                "service.name",
                any_value::Value::StringValue("svc-A".to_string())
            )
        );
        assert_eq!(resource.attributes.len(), 4);

        let spans = &resource_spans.scope_spans[0].spans;
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].name, "ProxyFetch");
        assert!(spans[0].parent_span_id.is_empty());
        assert_eq!(spans[0].status.as_ref().unwrap().code, SpanStatusCode::Ok as i32);
        assert_eq!(spans[1].name, "DBSearch");
        assert_eq!(spans[1].parent_span_id, PARENT_SPAN_ID.to_vec());
        assert_eq!(
            spans[1].status.as_ref().unwrap().code,
            SpanStatusCode::Error as i32
        );
    }

    #[tokio::test]
    async fn test_process_uncompressed_batches() {
        let (tx, mut rx) = create_channel();
        let request = build_request(
            encode_request_payload(&create_test_request_payload()),
            TRACE_CONTENT_TYPE,
            None,
        );

        let trace_processor = trace_processor::SpanBatchProcessor {};
        let response = trace_processor
            .process_traces(Arc::new(create_test_config()), request, tx)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_received_scenario_payload(&mut rx).await;
    }

    #[tokio::test]
    async fn test_process_gzip_compressed_batches() {
        let (tx, mut rx) = create_channel();
        let body = compress_gzip(&encode_request_payload(&create_test_request_payload()));
        let request = build_request(body, TRACE_CONTENT_TYPE, Some("gzip"));

        let trace_processor = trace_processor::SpanBatchProcessor {};
        let response = trace_processor
            .process_traces(Arc::new(create_test_config()), request, tx)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_received_scenario_payload(&mut rx).await;
    }

    #[tokio::test]
    async fn test_process_zstd_compressed_batches() {
        let (tx, mut rx) = create_channel();
        let encoded = encode_request_payload(&create_test_request_payload());
        let body = zstd::stream::encode_all(encoded.as_slice(), 0).unwrap();
        let request = build_request(body, TRACE_CONTENT_TYPE, Some("zstd"));

        let trace_processor = trace_processor::SpanBatchProcessor {};
        let response = trace_processor
            .process_traces(Arc::new(create_test_config()), request, tx)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_received_scenario_payload(&mut rx).await;
    }

    #[tokio::test]
    async fn test_unsupported_encoding_is_rejected_without_forwarding() {
        let (tx, mut rx) = create_channel();
        let request = build_request(
            encode_request_payload(&create_test_request_payload()),
            TRACE_CONTENT_TYPE,
            Some("deflate"),
        );

        let trace_processor = trace_processor::SpanBatchProcessor {};
        let response = trace_processor
            .process_traces(Arc::new(create_test_config()), request, tx)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_wrong_content_type_is_rejected() {
        let (tx, mut rx) = create_channel();
        let request = build_request(
            encode_request_payload(&create_test_request_payload()),
            "application/json",
            None,
        );

        let trace_processor = trace_processor::SpanBatchProcessor {};
        let response = trace_processor
            .process_traces(Arc::new(create_test_config()), request, tx)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_rejected() {
        let (tx, mut rx) = create_channel();
        let request = build_request(
            b"\xFF\xFF\xFF not a protobuf".to_vec(),
            TRACE_CONTENT_TYPE,
            None,
        );

        let trace_processor = trace_processor::SpanBatchProcessor {};
        let response = trace_processor
            .process_traces(Arc::new(create_test_config()), request, tx)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_truncated_compressed_stream_is_rejected() {
        let (tx, mut rx) = create_channel();
        let compressed = compress_gzip(&encode_request_payload(&create_test_request_payload()));
        let truncated = compressed[..compressed.len() / 2].to_vec();
        let request = build_request(truncated, TRACE_CONTENT_TYPE, Some("gzip"));

        let trace_processor = trace_processor::SpanBatchProcessor {};
        let response = trace_processor
            .process_traces(Arc::new(create_test_config()), request, tx)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_consumer_is_a_server_error() {
        let (tx, rx) = create_channel();
        drop(rx);
        let request = build_request(
            encode_request_payload(&create_test_request_payload()),
            TRACE_CONTENT_TYPE,
            None,
        );

        let trace_processor = trace_processor::SpanBatchProcessor {};
        let response = trace_processor
            .process_traces(Arc::new(create_test_config()), request, tx)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_tenant_token_is_injected_when_passthrough_enabled() {
        let (tx, mut rx) = create_channel();
        let mut config = create_test_config();
        config.tenant_token_passthrough = true;

        let body = encode_request_payload(&create_test_request_payload());
        let request = Request::builder()
            .header("content-type", TRACE_CONTENT_TYPE)
            .header("content-length", body.len().to_string())
            .header("x-tenant-token", "MyTenantToken")
            .body(full_body(body))
            .unwrap();

        let trace_processor = trace_processor::SpanBatchProcessor {};
        let response = trace_processor
            .process_traces(Arc::new(config), request, tx)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let traces = rx.recv().await.unwrap();
        let resource = traces.resource_spans[0].resource.as_ref().unwrap();
        assert!(resource.attributes.contains(&KeyValue::new(
            "tenant.token",
            any_value::Value::StringValue("MyTenantToken".to_string())
        )));
    }

    #[tokio::test]
    async fn test_tenant_token_is_absent_when_passthrough_disabled() {
        let (tx, mut rx) = create_channel();

        let body = encode_request_payload(&create_test_request_payload());
        let request = Request::builder()
            .header("content-type", TRACE_CONTENT_TYPE)
            .header("content-length", body.len().to_string())
            .header("x-tenant-token", "MyTenantToken")
            .body(full_body(body))
            .unwrap();

        let trace_processor = trace_processor::SpanBatchProcessor {};
        let response = trace_processor
            .process_traces(Arc::new(create_test_config()), request, tx)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let traces = rx.recv().await.unwrap();
        let resource = traces.resource_spans[0].resource.as_ref().unwrap();
        assert!(resource
            .attributes
            .iter()
            .all(|kv| kv.key != "tenant.token"));
    }
}
