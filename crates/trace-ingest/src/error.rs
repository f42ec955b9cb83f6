// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use hyper::StatusCode;

/// Errors that can occur while ingesting a span batch request. Every failure
/// is local to one request and is surfaced through the HTTP response status.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("unsupported content encoding {0:?}")]
    UnsupportedEncoding(String),

    #[error("failed to decompress request body: {0}")]
    Decode(#[from] std::io::Error),

    #[error("malformed span batch payload: {0}")]
    MalformedPayload(#[from] prost::DecodeError),

    #[error("downstream consumer rejected the trace payload: {0}")]
    ConsumerRejected(String),
}

impl IngestError {
    /// Maps the failure to the HTTP status reported to the caller: faults
    /// attributable to the client are 4xx, a consumer rejection is 5xx.
    pub fn status_code(&self) -> StatusCode {
        match self {
            IngestError::UnsupportedEncoding(_)
            | IngestError::Decode(_)
            | IngestError::MalformedPayload(_) => StatusCode::BAD_REQUEST,
            IngestError::ConsumerRejected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
