//! Term page requests and the transport boundary.
//!
//! [`TermPageFetcher`] turns browser state into a [`TermPageRequest`]; the
//! runtime hands that request to a [`TermSource`]. The HTTP implementation
//! issues exactly one GET per call; there is no retry at this layer.

#![allow(missing_docs)]

use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::browser::encoding::Encoding;
use crate::browser::model::{SegmentFieldRef, TermListing, clamp_page_size};
use crate::core::errors::{Result, TermscopeError};

/// Why a term page could not be obtained.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    /// No response at all (connect, timeout, TLS, ...).
    #[error("network failure: {details}")]
    Network { details: String },
    /// Non-2xx response.
    #[error("server rejected request ({status}): {message}")]
    Rejected {
        status: u16,
        code: i64,
        message: String,
    },
    /// 2xx response whose body is not a term listing.
    #[error("malformed term listing: {details}")]
    Malformed { details: String },
}

/// Codes reported for failures that carry no server code.
pub const NETWORK_FAILURE_CODE: i64 = -1;
pub const MALFORMED_RESPONSE_CODE: i64 = -2;

impl FetchFailure {
    /// Numeric code surfaced to the user (server code for rejections).
    #[must_use]
    pub const fn code(&self) -> i64 {
        match self {
            Self::Network { .. } => NETWORK_FAILURE_CODE,
            Self::Rejected { code, .. } => *code,
            Self::Malformed { .. } => MALFORMED_RESPONSE_CODE,
        }
    }

    /// Raw failure message, without classification prefix for rejections.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Client-side (4xx) rejection: the backend refused the request itself,
    /// e.g. because the field cannot be decoded under the asked encoding.
    #[must_use]
    pub const fn is_client_rejection(&self) -> bool {
        matches!(self, Self::Rejected { status, .. } if *status >= 400 && *status < 500)
    }
}

/// Structured error body sent with non-2xx responses.
#[derive(Debug, Deserialize)]
struct ServerErrorBody {
    code: i64,
    message: String,
}

// ──────────────────── request ────────────────────

/// One term page request, addressed by segment and field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermPageRequest {
    pub segment_id: u32,
    pub field_name: String,
    pub encoding: Encoding,
    /// Inclusive resume term; `None` starts at the beginning of the dictionary.
    pub from: Option<String>,
    /// Rows requested, including the lookahead row.
    pub count: usize,
}

impl TermPageRequest {
    /// Build the GET URL: `{base}/api/terms/{field}?segment=..&encoding=..[&from=..]&count=..`.
    pub fn url(&self, base: &Url) -> Result<Url> {
        let mut url = base.clone();
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| TermscopeError::InvalidRequest {
                    field: self.field_name.clone(),
                    details: format!("base URL {base} cannot carry a path"),
                })?;
            segments
                .pop_if_empty()
                .extend(["api", "terms", self.field_name.as_str()]);
        }
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("segment", &self.segment_id.to_string())
                .append_pair("encoding", self.encoding.tag());
            if let Some(from) = &self.from {
                query.append_pair("from", from);
            }
            query.append_pair("count", &self.count.to_string());
        }
        Ok(url)
    }
}

// ──────────────────── transport ────────────────────

/// The black-box `fetchTermPage` collaborator.
///
/// Implementations must make at most one backend call per invocation and
/// classify every outcome into `Ok` or a [`FetchFailure`].
pub trait TermSource: Send + Sync {
    fn fetch_page(
        &self,
        request: &TermPageRequest,
    ) -> std::result::Result<TermListing, FetchFailure>;
}

/// Blocking HTTP transport against the term dictionary backend.
pub struct HttpTermSource {
    client: Client,
    base: Url,
}

impl HttpTermSource {
    pub fn new(base: Url, connect_timeout: Duration, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;
        Ok(Self { client, base })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }
}

impl TermSource for HttpTermSource {
    fn fetch_page(
        &self,
        request: &TermPageRequest,
    ) -> std::result::Result<TermListing, FetchFailure> {
        let url = request.url(&self.base).map_err(|e| FetchFailure::Network {
            details: e.to_string(),
        })?;
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(|e| FetchFailure::Network {
                details: e.to_string(),
            })?;
        let status = response.status();
        let body = response.text().map_err(|e| FetchFailure::Network {
            details: e.to_string(),
        })?;
        classify_response(status.as_u16(), &body)
    }
}

/// Map a status + body pair onto the failure taxonomy.
pub fn classify_response(
    status: u16,
    body: &str,
) -> std::result::Result<TermListing, FetchFailure> {
    if (200..300).contains(&status) {
        return serde_json::from_str::<TermListing>(body).map_err(|e| FetchFailure::Malformed {
            details: e.to_string(),
        });
    }
    match serde_json::from_str::<ServerErrorBody>(body) {
        Ok(parsed) => Err(FetchFailure::Rejected {
            status,
            code: parsed.code,
            message: parsed.message,
        }),
        Err(_) => Err(FetchFailure::Rejected {
            status,
            code: i64::from(status),
            message: format!("HTTP {status}"),
        }),
    }
}

// ──────────────────── fetcher ────────────────────

/// Builds requests from browser state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermPageFetcher {
    page_size: usize,
}

impl TermPageFetcher {
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: clamp_page_size(page_size),
        }
    }

    /// Request for the page starting at `from` (inclusive).
    #[must_use]
    pub fn request(
        &self,
        target: &SegmentFieldRef,
        encoding: Encoding,
        from: Option<&str>,
    ) -> TermPageRequest {
        TermPageRequest {
            segment_id: target.segment_id,
            field_name: target.field_name.clone(),
            encoding,
            from: from.map(str::to_owned),
            count: self.page_size + 1,
        }
    }
}
