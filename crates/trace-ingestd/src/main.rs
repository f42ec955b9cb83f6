// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::{env, sync::Arc};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use trace_ingest::{
    config,
    receiver::TraceReceiver,
    trace_forwarder::ExportTraceForwarder,
    trace_processor::SpanBatchProcessor,
};

#[tokio::main]
pub async fn main() {
    let log_level = env::var("TRACE_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match config::Config::new() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Error creating trace receiver config: {e}");
            return;
        }
    };

    if let (Some(cert), Some(key)) = (&config.tls_cert_file, &config.tls_key_file) {
        debug!("TLS material configured: cert {cert}, key {key}");
    }

    let receiver = TraceReceiver {
        config: config.clone(),
        trace_processor: Arc::new(SpanBatchProcessor {}),
        trace_forwarder: Arc::new(ExportTraceForwarder { config }),
    };

    if let Err(e) = receiver.start().await {
        error!("Error starting the trace receiver: {e}");
    }
}
