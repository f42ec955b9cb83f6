// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Hand-written prost types matching the Jaeger `api_v2` model protobuf
//! definitions, plus the `PostSpansRequest` envelope the batch endpoint
//! accepts on the wire.

/// ValueType describes the type of a tag's value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ValueType {
    String = 0,
    Bool = 1,
    Int64 = 2,
    Float64 = 3,
    Binary = 4,
}

/// KeyValue is a typed key/value tag. Exactly one of the value fields is
/// populated, selected by `v_type`.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyValue {
    #[prost(string, tag = "1")]
    pub key: ::prost::alloc::string::String,
    #[prost(enumeration = "ValueType", tag = "2")]
    pub v_type: i32,
    #[prost(string, tag = "3")]
    pub v_str: ::prost::alloc::string::String,
    #[prost(bool, tag = "4")]
    pub v_bool: bool,
    #[prost(int64, tag = "5")]
    pub v_int64: i64,
    #[prost(double, tag = "6")]
    pub v_float64: f64,
    #[prost(bytes = "vec", tag = "7")]
    pub v_binary: ::prost::alloc::vec::Vec<u8>,
}

/// Log is a timestamped event attached to a span, with its own tag set.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Log {
    #[prost(message, optional, tag = "1")]
    pub timestamp: ::core::option::Option<::prost_types::Timestamp>,
    #[prost(message, repeated, tag = "2")]
    pub fields: ::prost::alloc::vec::Vec<KeyValue>,
}

/// SpanRefType describes the relationship a span reference carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum SpanRefType {
    ChildOf = 0,
    FollowsFrom = 1,
}

/// SpanRef is a typed link from one span to another.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SpanRef {
    /// trace_id of the referenced span (16 bytes).
    #[prost(bytes = "vec", tag = "1")]
    pub trace_id: ::prost::alloc::vec::Vec<u8>,
    /// span_id of the referenced span (8 bytes).
    #[prost(bytes = "vec", tag = "2")]
    pub span_id: ::prost::alloc::vec::Vec<u8>,
    #[prost(enumeration = "SpanRefType", tag = "3")]
    pub ref_type: i32,
}

/// Process describes the emitting service: its name plus free-form tags.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Process {
    #[prost(string, tag = "1")]
    pub service_name: ::prost::alloc::string::String,
    #[prost(message, repeated, tag = "2")]
    pub tags: ::prost::alloc::vec::Vec<KeyValue>,
}

/// Span is a single operation within a trace.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Span {
    /// trace_id is the ID of the trace this span belongs to (16 bytes).
    #[prost(bytes = "vec", tag = "1")]
    pub trace_id: ::prost::alloc::vec::Vec<u8>,
    /// span_id is the unique ID of this span within its trace (8 bytes).
    #[prost(bytes = "vec", tag = "2")]
    pub span_id: ::prost::alloc::vec::Vec<u8>,
    #[prost(string, tag = "3")]
    pub operation_name: ::prost::alloc::string::String,
    /// references to other spans; parentage is expressed as a CHILD_OF
    /// reference rather than a dedicated field.
    #[prost(message, repeated, tag = "4")]
    pub references: ::prost::alloc::vec::Vec<SpanRef>,
    #[prost(uint32, tag = "5")]
    pub flags: u32,
    #[prost(message, optional, tag = "6")]
    pub start_time: ::core::option::Option<::prost_types::Timestamp>,
    /// duration elapsed between start and completion; the end time is not
    /// carried on the wire.
    #[prost(message, optional, tag = "7")]
    pub duration: ::core::option::Option<::prost_types::Duration>,
    #[prost(message, repeated, tag = "8")]
    pub tags: ::prost::alloc::vec::Vec<KeyValue>,
    #[prost(message, repeated, tag = "9")]
    pub logs: ::prost::alloc::vec::Vec<Log>,
}

/// Batch is one process description plus the spans it produced.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Batch {
    #[prost(message, repeated, tag = "1")]
    pub spans: ::prost::alloc::vec::Vec<Span>,
    #[prost(message, optional, tag = "2")]
    pub process: ::core::option::Option<Process>,
}

/// PostSpansRequest is the envelope POSTed to the batch endpoint; a request
/// carries one or more batches.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PostSpansRequest {
    #[prost(message, repeated, tag = "1")]
    pub batches: ::prost::alloc::vec::Vec<Batch>,
}

impl KeyValue {
    pub fn string(key: &str, value: &str) -> Self {
        KeyValue {
            key: key.to_string(),
            v_type: ValueType::String as i32,
            v_str: value.to_string(),
            ..Default::default()
        }
    }

    pub fn bool(key: &str, value: bool) -> Self {
        KeyValue {
            key: key.to_string(),
            v_type: ValueType::Bool as i32,
            v_bool: value,
            ..Default::default()
        }
    }

    pub fn int64(key: &str, value: i64) -> Self {
        KeyValue {
            key: key.to_string(),
            v_type: ValueType::Int64 as i32,
            v_int64: value,
            ..Default::default()
        }
    }

    pub fn float64(key: &str, value: f64) -> Self {
        KeyValue {
            key: key.to_string(),
            v_type: ValueType::Float64 as i32,
            v_float64: value,
            ..Default::default()
        }
    }

    pub fn binary(key: &str, value: Vec<u8>) -> Self {
        KeyValue {
            key: key.to_string(),
            v_type: ValueType::Binary as i32,
            v_binary: value,
            ..Default::default()
        }
    }
}
