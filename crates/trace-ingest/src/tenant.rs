// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use hyper::http::HeaderMap;

use trace_ingest_proto::otel_common::{any_value, KeyValue};
use trace_ingest_proto::otel_trace::TracesData;

/// Resource attribute the tenant token is written to when passthrough is
/// enabled.
pub const TENANT_TOKEN_ATTRIBUTE_KEY: &str = "tenant.token";

/// Extracts the tenant token for this request. Returns None when passthrough
/// is disabled, the header is absent, or its value is empty; in all of those
/// cases no resource may carry the token attribute.
pub fn tenant_token_from_headers(
    headers: &HeaderMap,
    header_name: &str,
    passthrough_enabled: bool,
) -> Option<String> {
    if !passthrough_enabled {
        return None;
    }
    let token = headers.get(header_name)?.to_str().ok()?;
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Stamps the token onto every resource in the payload. Injection is
/// all-or-nothing per request.
pub fn inject_tenant_token(traces: &mut TracesData, token: &str) {
    for resource_spans in &mut traces.resource_spans {
        let resource = resource_spans.resource.get_or_insert_with(Default::default);
        resource.attributes.push(KeyValue::new(
            TENANT_TOKEN_ATTRIBUTE_KEY,
            any_value::Value::StringValue(token.to_string()),
        ));
    }
}
