use std::fs::File;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::AnnotateError;

/// Download seam. The application layer only sees this trait; tests swap in
/// a mock that writes fixture bytes.
pub trait EncodeClient: Send + Sync {
    fn download(&self, url: &str, destination: &Path) -> Result<(), AnnotateError>;
}

#[derive(Clone)]
pub struct EncodeHttpClient {
    client: Client,
}

impl EncodeHttpClient {
    pub fn new() -> Result<Self, AnnotateError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("eclip-annotate/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| AnnotateError::Filesystem(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| AnnotateError::EncodeHttp(err.to_string()))?;
        Ok(Self { client })
    }

    fn write_response_to_file(
        mut response: reqwest::blocking::Response,
        destination: &Path,
    ) -> Result<(), AnnotateError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "ENCODE request failed".to_string());
            return Err(AnnotateError::EncodeStatus { status, message });
        }
        let mut file = File::create(destination)
            .map_err(|err| AnnotateError::Filesystem(err.to_string()))?;
        std::io::copy(&mut response, &mut file)
            .map_err(|err| AnnotateError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

impl EncodeClient for EncodeHttpClient {
    fn download(&self, url: &str, destination: &Path) -> Result<(), AnnotateError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| AnnotateError::EncodeHttp(err.to_string()))?;
        Self::write_response_to_file(response, destination)
    }
}
