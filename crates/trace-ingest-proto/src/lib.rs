// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Protobuf message types for the trace-ingest service.
//!
//! Both halves of the translation are hand-written prost structs rather than
//! build-script output:
//!
//! - [`jaeger`] mirrors the Jaeger `api_v2` model consumed on the wire
//!   (one `PostSpansRequest` envelope carrying process + span batches).
//! - [`otel_common`], [`otel_resource`] and [`otel_trace`] mirror the
//!   OpenTelemetry `common/v1`, `resource/v1` and `trace/v1` definitions the
//!   translated payload is expressed in.

pub mod jaeger;
pub mod otel_common;
pub mod otel_resource;
pub mod otel_trace;
