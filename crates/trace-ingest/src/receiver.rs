// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper::{http, Method, Response, StatusCode};
use serde_json::json;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, error};

use trace_ingest_proto::otel_trace::TracesData;

use crate::config::Config;
use crate::http_utils::{self, log_and_create_http_response, HttpRequest, HttpResponse};
use crate::trace_forwarder::TraceForwarder;
use crate::trace_processor::TraceProcessor;

const TRACE_ENDPOINT_PATH: &str = "/v2/trace";
const INFO_ENDPOINT_PATH: &str = "/info";
const TRACE_PAYLOAD_CHANNEL_BUFFER_SIZE: usize = 10;

pub struct TraceReceiver {
    pub config: Arc<Config>,
    pub trace_processor: Arc<dyn TraceProcessor + Send + Sync>,
    pub trace_forwarder: Arc<dyn TraceForwarder + Send + Sync>,
}

impl TraceReceiver {
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error>> {
        let now = Instant::now();

        // setup a channel to send translated traces to our forwarder. tx is
        // passed through the endpoint_handler to the trace processor, which
        // uses it to hand off one trace payload per request.
        let (trace_tx, trace_rx): (Sender<TracesData>, Receiver<TracesData>) =
            mpsc::channel(TRACE_PAYLOAD_CHANNEL_BUFFER_SIZE);

        // start our trace forwarder. receives trace payloads and handles
        // buffering + deciding when to export downstream.
        let trace_forwarder = self.trace_forwarder.clone();
        let forwarder_handle = tokio::spawn(async move {
            trace_forwarder.start_trace_forwarder(trace_rx).await;
        });

        // setup our hyper http server, where the endpoint_handler handles
        // incoming requests
        let trace_processor = self.trace_processor.clone();
        let endpoint_config = self.config.clone();

        let service = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
            // called for each http request
            let trace_processor = trace_processor.clone();
            let trace_tx = trace_tx.clone();
            let endpoint_config = endpoint_config.clone();

            TraceReceiver::endpoint_handler(
                endpoint_config,
                req.map(http_utils::incoming_body),
                trace_processor,
                trace_tx,
            )
        });

        if self.config.tls_cert_file.is_some() || self.config.tls_key_file.is_some() {
            debug!("TLS material configured; termination is handled by the fronting listener");
        }
        debug!(
            "Trace receiver started: listening on port {}",
            self.config.trace_ingest_port
        );
        debug!(
            "Time taken to start the trace receiver: {} ms",
            now.elapsed().as_millis()
        );

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.trace_ingest_port));
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        Self::serve_tcp(listener, service, forwarder_handle).await
    }

    async fn serve_tcp<S>(
        listener: tokio::net::TcpListener,
        service: S,
        mut forwarder_handle: tokio::task::JoinHandle<()>,
    ) -> Result<(), Box<dyn std::error::Error>>
    where
        S: hyper::service::Service<
                hyper::Request<hyper::body::Incoming>,
                Response = hyper::Response<Full<Bytes>>,
            > + Clone
            + Send
            + 'static,
        S::Future: Send,
        S::Error: std::error::Error + Send + Sync + 'static,
    {
        let server = hyper::server::conn::http1::Builder::new();
        let mut joinset = tokio::task::JoinSet::new();

        loop {
            let conn = tokio::select! {
                con_res = listener.accept() => match con_res {
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::ConnectionAborted
                                | io::ErrorKind::ConnectionReset
                                | io::ErrorKind::ConnectionRefused
                        ) =>
                    {
                        continue;
                    }
                    Err(e) => {
                        error!("Server error: {e}");
                        return Err(e.into());
                    }
                    Ok((conn, _)) => conn,
                },
                finished = async {
                    match joinset.join_next().await {
                        Some(finished) => finished,
                        None => std::future::pending().await,
                    }
                } => match finished {
                    Err(e) if e.is_panic() => {
                        // Don't kill server on panic - log and continue
                        error!("Connection handler panicked: {:?}", e);
                        continue;
                    },
                    Ok(()) | Err(_) => continue,
                },
                result = &mut forwarder_handle => {
                    error!("Trace forwarder task died: {:?}", result);
                    return Err("Trace forwarder task terminated unexpectedly".into());
                },
            };
            let conn = hyper_util::rt::TokioIo::new(conn);
            let server = server.clone();
            let service = service.clone();
            joinset.spawn(async move {
                if let Err(e) = server.serve_connection(conn, service).await {
                    error!("Connection error: {e}");
                }
            });
        }
    }

    async fn endpoint_handler(
        config: Arc<Config>,
        req: HttpRequest,
        trace_processor: Arc<dyn TraceProcessor + Send + Sync>,
        trace_tx: Sender<TracesData>,
    ) -> http::Result<HttpResponse> {
        match (req.method(), req.uri().path()) {
            (&Method::POST, TRACE_ENDPOINT_PATH) => {
                match trace_processor.process_traces(config, req, trace_tx).await {
                    Ok(res) => Ok(res),
                    Err(err) => log_and_create_http_response(
                        &format!("Error processing trace batches: {err}"),
                        StatusCode::INTERNAL_SERVER_ERROR,
                    ),
                }
            }
            (_, INFO_ENDPOINT_PATH) => match Self::info_handler(&config) {
                Ok(res) => Ok(res),
                Err(err) => log_and_create_http_response(
                    &format!("Info endpoint error: {err}"),
                    StatusCode::INTERNAL_SERVER_ERROR,
                ),
            },
            _ => {
                let mut not_found = Response::new(Full::new(Bytes::new()));
                *not_found.status_mut() = StatusCode::NOT_FOUND;
                Ok(not_found)
            }
        }
    }

    fn info_handler(config: &Config) -> http::Result<HttpResponse> {
        let response_json = json!(
            {
                "endpoints": [
                    TRACE_ENDPOINT_PATH,
                    INFO_ENDPOINT_PATH
                ],
                "config": {
                    "receiver_port": config.trace_ingest_port,
                    "tenant_token_passthrough": config.tenant_token_passthrough
                }
            }
        );
        Response::builder()
            .status(200)
            .body(Full::new(Bytes::from(response_json.to_string())))
    }
}
