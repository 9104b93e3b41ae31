//! libcurl-backed transport: one multipart POST per item, run on the blocking pool.

use anyhow::Result;
use curl::easy::{Easy, Form, List};
use std::time::Duration;

use crate::config::{CurlConfig, UploaderConfig};
use crate::queue::{FileSource, SourceBody};

use super::{
    CancelHandle, EventSender, TransferEvent, TransferFailure, TransferHandle, TransferOutcome,
    TransferRequest, Transport, TransportError,
};

/// Uploads each file as a single-field multipart form to a fixed endpoint.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    endpoint: String,
    field_name: String,
    curl: CurlConfig,
}

impl CurlTransport {
    pub fn new(endpoint: url::Url, field_name: impl Into<String>, curl: CurlConfig) -> Self {
        Self {
            endpoint: endpoint.into(),
            field_name: field_name.into(),
            curl,
        }
    }

    pub fn from_config(cfg: &UploaderConfig) -> Result<Self> {
        Ok(Self::new(
            cfg.endpoint()?,
            cfg.field_name.clone(),
            cfg.curl_or_default(),
        ))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Transport for CurlTransport {
    /// Spawns the upload on tokio's blocking pool; must be called inside a runtime.
    fn send(&self, request: TransferRequest) -> TransferHandle {
        let (events, cancel, handle) = TransferHandle::channel();
        let this = self.clone();
        tokio::task::spawn_blocking(move || {
            let outcome = if cancel.is_cancelled() {
                TransferOutcome::Cancelled
            } else {
                match this.upload_blocking(&request.source, &events, &cancel) {
                    Ok(outcome) => outcome,
                    Err(e) if cancel.is_cancelled() && e.is_aborted_by_callback() => {
                        TransferOutcome::Cancelled
                    }
                    Err(e) => {
                        tracing::debug!(item = %request.item, "upload transport error: {}", e);
                        TransferOutcome::Failed(TransferFailure::Network(e.to_string()))
                    }
                }
            };
            let _ = events.send(TransferEvent::Finished(outcome));
        });
        handle
    }
}

impl CurlTransport {
    fn upload_blocking(
        &self,
        source: &FileSource,
        events: &EventSender,
        cancel: &CancelHandle,
    ) -> Result<TransferOutcome, TransportError> {
        let mut easy = Easy::new();
        easy.url(&self.endpoint)?;
        easy.connect_timeout(Duration::from_secs(self.curl.connect_timeout_secs))?;
        // Abort transfers whose throughput stays under the limit; a stalled upload
        // would otherwise hold its concurrency slot until the hard timeout.
        easy.low_speed_limit(self.curl.low_speed_limit)?;
        easy.low_speed_time(Duration::from_secs(self.curl.low_speed_time_secs))?;
        easy.timeout(Duration::from_secs(self.curl.timeout_secs))?;
        if let Some(speed) = self.curl.max_send_speed {
            easy.max_send_speed(speed)?;
        }

        // No `Expect: 100-continue` round trip before large bodies.
        let mut list = List::new();
        list.append("Expect:")?;
        easy.http_headers(list)?;

        let mut form = Form::new();
        match source.body() {
            SourceBody::Path(path) => {
                form.part(&self.field_name)
                    .file(path)
                    .filename(source.name())
                    .add()?;
            }
            SourceBody::Bytes(bytes) => {
                form.part(&self.field_name)
                    .buffer(source.name(), bytes.to_vec())
                    .add()?;
            }
        }
        easy.httppost(form)?;
        easy.progress(true)?;

        let mut body = Vec::new();
        let mut last_loaded: Option<u64> = None;
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.progress_function(|_dltotal, _dlnow, ultotal, ulnow| {
                if cancel.is_cancelled() {
                    return false;
                }
                let loaded = ulnow as u64;
                if last_loaded != Some(loaded) {
                    last_loaded = Some(loaded);
                    let total = (ultotal > 0.0).then_some(ultotal as u64);
                    let _ = events.send(TransferEvent::Progress { loaded, total });
                }
                true
            })?;
            transfer.perform()?;
        }

        let status = easy.response_code()?;
        Ok(TransferOutcome::from_response(status, body))
    }
}
