use crate::clock::Clock;
use crate::config::BinanceConfig;
use crate::signing::RequestSigner;
use async_trait::async_trait;
use common::{Error, Result};
use reqwest::{Method, Url};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error};

/// Whether a request needs the account signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Security {
    None,
    Signed,
}

/// One REST call, relative to the transport's base URL
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub security: Security,
}

impl HttpRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            security: Security::None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn signed(mut self) -> Self {
        self.security = Security::Signed;
        self
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Status code and decoded JSON body of a finished call
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Carries requests to the exchange. Errors are connection-level only;
/// non-2xx answers come back as an `HttpResponse`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn request(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// Send a request and return the body of a 2xx answer.
pub(crate) async fn send_checked(
    transport: &dyn HttpTransport,
    request: &HttpRequest,
) -> Result<Value> {
    let response = transport.request(request).await?;

    if !response.is_success() {
        error!(
            "Error while making {} request to {}: {} (error code {})",
            request.method, request.path, response.body, response.status
        );
        return Err(Error::ExchangeError {
            method: request.method.to_string(),
            endpoint: request.path.clone(),
            status: response.status,
            message: api_message(&response.body),
        });
    }

    Ok(response.body)
}

// Binance errors look like {"code": -1121, "msg": "Invalid symbol."}
fn api_message(body: &Value) -> String {
    match (body.get("code"), body.get("msg").and_then(Value::as_str)) {
        (Some(code), Some(msg)) => format!("{} (code {})", msg, code),
        (None, Some(msg)) => msg.to_string(),
        _ => body.to_string(),
    }
}

/// reqwest-backed transport for the Binance REST API
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    signer: Option<RequestSigner>,
    clock: Arc<dyn Clock>,
}

impl ReqwestTransport {
    pub fn new(config: &BinanceConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::HttpError)?;

        Ok(Self {
            client,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            signer: config.api_secret.as_deref().map(RequestSigner::new),
            clock,
        })
    }

    fn build_url(&self, request: &HttpRequest) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, request.path))
            .map_err(|e| Error::ConfigError(format!("Invalid URL for {}: {}", request.path, e)))?;

        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(request.query.iter());
        }

        if request.security == Security::Signed {
            let signer = self.signer.as_ref().ok_or_else(|| {
                Error::ConfigError("Signed request needs BINANCE_API_SECRET".to_string())
            })?;

            let timestamp = self.clock.now().timestamp_millis();
            url.query_pairs_mut()
                .append_pair("timestamp", &timestamp.to_string());

            let signature = signer.sign(url.query().unwrap_or_default())?;
            url.query_pairs_mut().append_pair("signature", &signature);
        }

        Ok(url)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn request(&self, request: &HttpRequest) -> Result<HttpResponse> {
        if ![Method::GET, Method::POST, Method::DELETE].contains(&request.method) {
            return Err(Error::ConfigError(format!(
                "Invalid request method: {}",
                request.method
            )));
        }

        let url = self.build_url(request)?;
        debug!("{} {}", request.method, request.path);

        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(key) = &self.api_key {
            builder = builder.header("X-MBX-APIKEY", key);
        }

        let response = builder.send().await.map_err(|e| {
            error!(
                "Connection error while making {} request to {} endpoint: {}",
                request.method, request.path, e
            );
            Error::HttpError(e)
        })?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(Error::HttpError)?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        Ok(HttpResponse { status, body })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};

    fn transport(secret: Option<&str>) -> ReqwestTransport {
        let config = BinanceConfig {
            base_url: Some("http://localhost:1/".to_string()),
            api_secret: secret.map(str::to_string),
            ..BinanceConfig::default()
        };
        let clock = FixedClock(Utc.timestamp_millis_opt(1_499_827_319_559).unwrap());
        ReqwestTransport::new(&config, Arc::new(clock)).unwrap()
    }

    #[test]
    fn unsigned_url_keeps_query_order() {
        let request = HttpRequest::get("/api/v3/klines")
            .query("symbol", "BTCUSDT")
            .query("interval", "1h")
            .query("limit", 1000);

        let url = transport(None).build_url(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:1/api/v3/klines?symbol=BTCUSDT&interval=1h&limit=1000"
        );
    }

    #[test]
    fn signed_url_appends_timestamp_and_signature() {
        let request = HttpRequest::get("/api/v3/order")
            .query("symbol", "LTCBTC")
            .query("side", "BUY")
            .query("type", "LIMIT")
            .query("timeInForce", "GTC")
            .query("quantity", 1)
            .query("price", "0.1")
            .query("recvWindow", 5000)
            .signed();

        let url = transport(Some(
            "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j",
        ))
        .build_url(&request)
        .unwrap();

        assert!(url.as_str().ends_with(
            "&timestamp=1499827319559\
             &signature=c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        ));
    }

    #[test]
    fn signed_request_without_secret_fails() {
        let request = HttpRequest::get("/api/v3/account").signed();
        assert!(matches!(
            transport(None).build_url(&request),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn api_message_prefers_binance_payload() {
        let body = serde_json::json!({"code": -1121, "msg": "Invalid symbol."});
        assert_eq!(api_message(&body), "Invalid symbol. (code -1121)");
        assert_eq!(api_message(&Value::String("oops".into())), "\"oops\"");
    }
}
