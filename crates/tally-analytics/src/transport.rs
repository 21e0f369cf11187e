// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Delivery of upload payloads to the collector.

use std::time::Duration;

use reqwest::Client;
use tally_analytics_core::UploadPayload;
use tracing::debug;

use crate::error::{AnalyticsError, Result};

/// Status and body returned by the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
	pub status: u16,
	pub body: String,
}

impl TransportResponse {
	pub fn new(status: u16, body: impl Into<String>) -> Self {
		Self {
			status,
			body: body.into(),
		}
	}
}

/// Sends one upload payload and reports the collector's answer.
///
/// An `Err` means no response was obtained at all. Any response, whatever
/// its status, is returned as `Ok`.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
	async fn send_batch(&self, url: &str, payload: &UploadPayload) -> Result<TransportResponse>;
}

/// Form-encoded POST over reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
	http_client: Client,
}

impl HttpTransport {
	pub fn new(timeout: Duration) -> Result<Self> {
		let http_client = tally_common_http::builder()
			.timeout(timeout)
			.build()
			.map_err(AnalyticsError::RequestFailed)?;
		Ok(Self { http_client })
	}

	pub fn with_client(http_client: Client) -> Self {
		Self { http_client }
	}
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
	async fn send_batch(&self, url: &str, payload: &UploadPayload) -> Result<TransportResponse> {
		debug!(url, upload_time = payload.upload_time, "posting upload batch");

		let response = self.http_client.post(url).form(payload).send().await?;
		let status = response.status().as_u16();
		let body = response.text().await?;

		Ok(TransportResponse { status, body })
	}
}
