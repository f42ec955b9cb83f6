// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::io::Read;

use bytes::Bytes;

use crate::error::IngestError;

pub const GZIP_ENCODING: &str = "gzip";
pub const ZSTD_ENCODING: &str = "zstd";

/// The closed set of compression codecs a request body may arrive in. The
/// `Content-Encoding` token selects one; anything outside the set is
/// rejected before the body is touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentEncoding {
    Identity,
    Gzip,
    Zstd,
}

impl ContentEncoding {
    /// Maps a `Content-Encoding` token to a decompression strategy. An
    /// absent or empty token means the body is uncompressed.
    pub fn from_token(token: Option<&str>) -> Result<ContentEncoding, IngestError> {
        match token {
            None | Some("") => Ok(ContentEncoding::Identity),
            Some(GZIP_ENCODING) => Ok(ContentEncoding::Gzip),
            Some(ZSTD_ENCODING) => Ok(ContentEncoding::Zstd),
            Some(other) => Err(IngestError::UnsupportedEncoding(other.to_string())),
        }
    }

    /// Fully decompresses `body`. The entire compressed stream must be
    /// consumed; truncated or corrupt input fails. No size cap is applied
    /// here, the endpoint bounds the request before decompression.
    pub fn decompress(&self, body: Bytes) -> Result<Bytes, IngestError> {
        match self {
            ContentEncoding::Identity => Ok(body),
            ContentEncoding::Gzip => {
                let mut decoder = flate2::read::MultiGzDecoder::new(body.as_ref());
                let mut decompressed = Vec::new();
                decoder.read_to_end(&mut decompressed)?;
                Ok(decompressed.into())
            }
            ContentEncoding::Zstd => Ok(zstd::stream::decode_all(body.as_ref())?.into()),
        }
    }
}
