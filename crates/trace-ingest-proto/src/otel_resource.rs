// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Hand-written prost types matching the OpenTelemetry resource/v1 protobuf
//! definitions.

use crate::otel_common::KeyValue;

/// Resource is the attribute-bearing identity of the entity producing
/// telemetry; one is built per translated batch.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Resource {
    #[prost(message, repeated, tag = "1")]
    pub attributes: ::prost::alloc::vec::Vec<KeyValue>,
    #[prost(uint32, tag = "2")]
    pub dropped_attributes_count: u32,
}
