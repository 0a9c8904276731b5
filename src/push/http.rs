//! HTTP push client for Loki

use super::wire::{encode_push_request, gzip};
use super::PushClient;
use crate::core::{HttpOptions, LogRecord, LoggerError, Result};
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::Url;

/// Push API path, resolved against the configured address
pub const PUSH_ENDPOINT_V1: &str = "/loki/api/v1/push";

/// Posts batches to `<address>/loki/api/v1/push`
///
/// The content type is sent without a `charset` parameter; Loki rejects it.
///
/// # Example
///
/// ```no_run
/// use rust_loki_logger::core::{HttpOptions, LabelSet, LogRecord};
/// use rust_loki_logger::push::{HttpPushClient, PushClient};
///
/// let mut client = HttpPushClient::new(&HttpOptions::default()).unwrap();
/// let records = vec![LogRecord::now(LabelSet::new(), "hello")];
/// client.push(&records).unwrap();
/// ```
pub struct HttpPushClient {
    client: Client,
    url: Url,
    credentials: Option<(String, String)>,
    gzip: bool,
}

impl HttpPushClient {
    pub fn new(options: &HttpOptions) -> Result<Self> {
        let url = push_url(&options.address)?;
        let client = Client::builder().timeout(options.timeout).build()?;

        Ok(Self {
            client,
            url,
            credentials: options
                .basic_credentials()
                .map(|(user, password)| (user.to_string(), password.to_string())),
            gzip: options.gzip,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

fn push_url(address: &str) -> Result<Url> {
    Url::parse(address)
        .and_then(|base| base.join(PUSH_ENDPOINT_V1))
        .map_err(|e| LoggerError::config("HttpOptions", format!("invalid address '{}': {}", address, e)))
}

impl PushClient for HttpPushClient {
    fn push(&mut self, records: &[LogRecord]) -> Result<()> {
        let mut body = encode_push_request(records)?;

        let mut request = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json");
        if self.gzip {
            body = gzip(&body)?;
            request = request.header(CONTENT_ENCODING, "gzip");
        }
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, Some(password));
        }

        let response = request.body(body).send()?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().unwrap_or_default();
            Err(LoggerError::push_rejected(status.as_u16(), body))
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}
