// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Translation from decoded span batches to the resource/scope/span trace
//! model. Translation is total: any structurally valid batch produces a
//! payload, and all typing decisions were already made at the wire-decode
//! boundary.

use trace_ingest_proto::jaeger;
use trace_ingest_proto::otel_common::{any_value, AnyValue, KeyValue};
use trace_ingest_proto::otel_resource::Resource;
use trace_ingest_proto::otel_trace::{
    span, status::StatusCode, ResourceSpans, ScopeSpans, Span, Status, TracesData,
};

/// Resource attribute carrying the emitting service's name.
pub const SERVICE_NAME_ATTRIBUTE_KEY: &str = "service.name";

/// Reserved span tag holding the status code as a string ("OK"/"ERROR",
/// compared case-insensitively).
const STATUS_CODE_TAG_KEY: &str = "otel.status_code";
/// Reserved span tag holding the human-readable status message.
const STATUS_DESCRIPTION_TAG_KEY: &str = "otel.status_description";
/// Boolean status hint; the reserved keys above always win over it.
const ERROR_TAG_KEY: &str = "error";

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Translates a whole request's batches into one trace payload. Resource
/// order mirrors batch order in the request.
pub fn post_spans_request_to_traces(request: jaeger::PostSpansRequest) -> TracesData {
    TracesData {
        resource_spans: request
            .batches
            .into_iter()
            .map(batch_to_resource_spans)
            .collect(),
    }
}

/// Translates one batch into a resource owning a single scope of spans, in
/// source span order.
pub fn batch_to_resource_spans(batch: jaeger::Batch) -> ResourceSpans {
    let resource = process_to_resource(batch.process);
    let spans = batch.spans.into_iter().map(span_to_otel).collect();
    ResourceSpans {
        resource: Some(resource),
        scope_spans: vec![ScopeSpans {
            scope: None,
            spans,
            schema_url: String::new(),
        }],
        schema_url: String::new(),
    }
}

/// Builds the resource for a batch. A missing process or empty service name
/// yields a resource without a service-name attribute rather than an error.
fn process_to_resource(process: Option<jaeger::Process>) -> Resource {
    let mut attributes = Vec::new();
    if let Some(process) = process {
        if !process.service_name.is_empty() {
            attributes.push(KeyValue::new(
                SERVICE_NAME_ATTRIBUTE_KEY,
                any_value::Value::StringValue(process.service_name),
            ));
        }
        attributes.extend(process.tags.into_iter().map(tag_to_attribute));
    }
    Resource {
        attributes,
        dropped_attributes_count: 0,
    }
}

fn span_to_otel(span: jaeger::Span) -> Span {
    let start_time_unix_nano = timestamp_nanos(span.start_time);
    // A negative wire duration is passed through as-is and yields an end
    // timestamp earlier than the start timestamp.
    let end_time_unix_nano = start_time_unix_nano.saturating_add_signed(duration_nanos(span.duration));
    let parent_span_id = parent_span_id(&span.references);
    let (attributes, status) = split_tags(span.tags);
    let events = span.logs.into_iter().map(log_to_event).collect();

    Span {
        trace_id: span.trace_id,
        span_id: span.span_id,
        parent_span_id,
        name: span.operation_name,
        start_time_unix_nano,
        end_time_unix_nano,
        attributes,
        events,
        status,
    }
}

/// The first CHILD_OF reference sets the parent; references of any other
/// kind are ignored, and a span with no CHILD_OF reference is a root span.
/// The reference's trace id is trusted to match the span's own.
fn parent_span_id(references: &[jaeger::SpanRef]) -> Vec<u8> {
    references
        .iter()
        .find(|r| r.ref_type() == jaeger::SpanRefType::ChildOf)
        .map(|r| r.span_id.clone())
        .unwrap_or_default()
}

/// Splits span tags into attributes and the derived status. The two reserved
/// status keys and the boolean `error` hint are consumed; every other tag
/// becomes an attribute with its declared type preserved.
fn split_tags(tags: Vec<jaeger::KeyValue>) -> (Vec<KeyValue>, Option<Status>) {
    let mut attributes = Vec::with_capacity(tags.len());
    let mut code = None;
    let mut code_tag_present = false;
    let mut message = String::new();
    let mut error_hint = false;
    let mut saw_status_tag = false;

    for tag in tags {
        match tag.key.as_str() {
            STATUS_CODE_TAG_KEY => {
                saw_status_tag = true;
                code_tag_present = true;
                code = parse_status_code(&tag.v_str);
            }
            STATUS_DESCRIPTION_TAG_KEY => {
                saw_status_tag = true;
                message = tag.v_str;
            }
            ERROR_TAG_KEY if tag.v_type() == jaeger::ValueType::Bool => {
                saw_status_tag = true;
                error_hint = tag.v_bool;
            }
            _ => attributes.push(tag_to_attribute(tag)),
        }
    }

    if !saw_status_tag {
        return (attributes, None);
    }
    let code = match code {
        Some(code) => code,
        // The error hint only applies when no reserved status-code tag was
        // present; an unrecognized code value stays unset.
        None if !code_tag_present && error_hint => StatusCode::Error,
        None => StatusCode::Unset,
    };
    (
        attributes,
        Some(Status {
            message,
            code: code as i32,
        }),
    )
}

fn parse_status_code(value: &str) -> Option<StatusCode> {
    if value.eq_ignore_ascii_case("ok") {
        Some(StatusCode::Ok)
    } else if value.eq_ignore_ascii_case("error") {
        Some(StatusCode::Error)
    } else {
        None
    }
}

/// Copies one wire tag into an attribute under its original key, preserving
/// the declared value kind exactly.
fn tag_to_attribute(tag: jaeger::KeyValue) -> KeyValue {
    let value = match tag.v_type() {
        jaeger::ValueType::String => any_value::Value::StringValue(tag.v_str),
        jaeger::ValueType::Bool => any_value::Value::BoolValue(tag.v_bool),
        jaeger::ValueType::Int64 => any_value::Value::IntValue(tag.v_int64),
        jaeger::ValueType::Float64 => any_value::Value::DoubleValue(tag.v_float64),
        jaeger::ValueType::Binary => any_value::Value::BytesValue(tag.v_binary),
    };
    KeyValue {
        key: tag.key,
        value: Some(AnyValue { value: Some(value) }),
    }
}

fn log_to_event(log: jaeger::Log) -> span::Event {
    span::Event {
        time_unix_nano: timestamp_nanos(log.timestamp),
        name: String::new(),
        attributes: log.fields.into_iter().map(tag_to_attribute).collect(),
    }
}

fn timestamp_nanos(timestamp: Option<::prost_types::Timestamp>) -> u64 {
    match timestamp {
        Some(ts) => (ts.seconds.max(0) as u64)
            .saturating_mul(NANOS_PER_SEC)
            .saturating_add(ts.nanos.max(0) as u64),
        None => 0,
    }
}

fn duration_nanos(duration: Option<::prost_types::Duration>) -> i64 {
    match duration {
        Some(d) => d
            .seconds
            .saturating_mul(NANOS_PER_SEC as i64)
            .saturating_add(d.nanos as i64),
        None => 0,
    }
}
