use crate::analyzers::{UrlPrediction, UrlPredictor};
use anyhow::Context;
use reqwest::blocking::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use url::Url;

#[derive(Serialize)]
struct PredictRequest<'a> {
    url: &'a str,
}

/// Phishing-URL model served over HTTP.
///
/// POSTs `{"url": "..."}` to the endpoint and accepts either an object with
/// `prediction`, `description` and `confidence`, or a bare prediction value.
pub struct HttpUrlPredictor {
    client: Client,
    endpoint: Url,
}

impl HttpUrlPredictor {
    pub fn new(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let endpoint = Url::parse(endpoint)
            .with_context(|| format!("Invalid URL model endpoint '{endpoint}'"))?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            anyhow::bail!(
                "Unsupported URL model endpoint scheme '{}'",
                endpoint.scheme()
            );
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("email-guard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl UrlPredictor for HttpUrlPredictor {
    fn predict(&self, url: &str) -> anyhow::Result<UrlPrediction> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&PredictRequest { url })
            .send()
            .with_context(|| format!("URL model request to {} failed", self.endpoint))?
            .error_for_status()?;

        let body: Value = response.json().context("URL model returned invalid JSON")?;
        parse_prediction(body)
    }
}

pub fn parse_prediction(body: Value) -> anyhow::Result<UrlPrediction> {
    match body {
        Value::Null => anyhow::bail!("URL model returned no prediction"),
        Value::Object(_) => {
            serde_json::from_value(body).context("Malformed URL model prediction")
        }
        other => Ok(UrlPrediction::new(other)),
    }
}
