//! Blocking HTTP session shared by the vendor clients.

use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AppError;

/// Authenticated session against one vendor API.
#[derive(Debug, Clone)]
pub struct ApiSession {
    client: Client,
    vendor: &'static str,
    base_url: String,
    token: String,
}

impl ApiSession {
    pub fn new(client: Client, vendor: &'static str, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            vendor,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn vendor(&self) -> &'static str {
        self.vendor
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET `path` (relative to the base URL) and decode the JSON body.
    pub fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, AppError> {
        self.get_json_absolute(&self.url(path), query)
    }

    /// GET an absolute URL with this session's bearer token.
    pub fn get_json_absolute<T: DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T, AppError> {
        debug!(vendor = self.vendor, %url, "GET");
        let req = self.client.get(url).bearer_auth(&self.token).query(query);
        decode_json(self.vendor, send(self.vendor, req)?)
    }
}

/// Send a request, mapping transport failures to [`AppError::Request`].
pub fn send(vendor: &str, req: RequestBuilder) -> Result<Response, AppError> {
    req.send()
        .map_err(|e| AppError::request(vendor, format!("request failed: {e}")))
}

/// Check the status and decode a JSON body.
pub fn decode_json<T: DeserializeOwned>(vendor: &str, resp: Response) -> Result<T, AppError> {
    let status = resp.status();
    debug!(vendor, %status, "response");
    check_status(vendor, status)?;
    resp.json()
        .map_err(|e| AppError::malformed(vendor, format!("failed to parse response: {e}")))
}

pub fn check_status(vendor: &str, status: StatusCode) -> Result<(), AppError> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(AppError::auth(vendor, format!("request rejected with status {status}.")));
    }
    Err(AppError::request(vendor, format!("request failed with status {status}.")))
}
