//! OpenBB Platform REST tools
//!
//! Each catalog entry is bound to one `GET /api/v1/<route>` endpoint.
//! Parameters travel as query-string pairs; nothing is evaluated.

use super::{ProviderError, Tool, ToolRegistry};
use crate::error::AgentError;
use crate::models::{FailureClass, ParamMap, ParamSpec, ParamType, ToolSpec};
use crate::Result;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const MAX_ERROR_BODY_CHARS: usize = 300;

#[derive(Clone)]
pub struct OpenBbClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl OpenBbClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn endpoint(&self, route: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, route.trim_start_matches('/'))
    }

    async fn get_json(
        &self,
        route: &str,
        params: &ParamMap,
    ) -> std::result::Result<Value, ProviderError> {
        let url = self.endpoint(route);
        let query: Vec<(&str, String)> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.to_string()))
            .collect();

        debug!(url = %url, param_count = query.len(), "Calling OpenBB endpoint");

        let mut request = self.client.get(&url).query(&query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            warn!(route = route, error = %e, "OpenBB request failed");
            ProviderError::new(
                classify_transport(&e),
                format!("request to {} failed: {}", route, e),
            )
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
            return Err(ProviderError::new(
                classify_status(status),
                format!("OpenBB returned {} for {}: {}", status, route, body),
            ));
        }

        response.json::<Value>().await.map_err(|e| {
            ProviderError::new(
                FailureClass::BadResponse,
                format!("invalid JSON from {}: {}", route, e),
            )
        })
    }
}

/// Map an HTTP status to a failure class
pub fn classify_status(status: StatusCode) -> FailureClass {
    match status {
        StatusCode::TOO_MANY_REQUESTS => FailureClass::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FailureClass::Auth,
        StatusCode::NOT_FOUND => FailureClass::NotFound,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => FailureClass::Timeout,
        s if s.is_server_error() => FailureClass::Upstream,
        _ => FailureClass::Rejected,
    }
}

fn classify_transport(err: &reqwest::Error) -> FailureClass {
    if err.is_timeout() {
        FailureClass::Timeout
    } else if err.is_decode() {
        FailureClass::BadResponse
    } else {
        FailureClass::Network
    }
}

/// One OpenBB endpoint bound to its catalog entry
pub struct OpenBbOperation {
    spec: ToolSpec,
    route: &'static str,
    client: OpenBbClient,
}

impl OpenBbOperation {
    pub fn new(spec: ToolSpec, route: &'static str, client: OpenBbClient) -> Self {
        Self {
            spec,
            route,
            client,
        }
    }
}

#[async_trait::async_trait]
impl Tool for OpenBbOperation {
    fn spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn call(&self, params: &ParamMap) -> std::result::Result<Value, ProviderError> {
        self.client.get_json(self.route, params).await
    }
}

fn symbol() -> ParamSpec {
    ParamSpec::required(
        ParamType::String,
        "Ticker symbol in upper case, e.g. TSLA for Tesla",
    )
}

/// Catalog entries paired with their REST route
pub fn default_operations() -> Vec<(ToolSpec, &'static str)> {
    vec![
        (
            ToolSpec::new("news.company", "Latest news articles for a company")
                .param("symbol", symbol())
                .param(
                    "limit",
                    ParamSpec::optional(ParamType::Integer, "Number of articles").range(1.0, 100.0),
                )
                .param(
                    "provider",
                    ParamSpec::optional(ParamType::String, "News source").one_of(&[
                        "benzinga", "fmp", "intrinio", "polygon", "tiingo", "yfinance",
                    ]),
                ),
            "news/company",
        ),
        (
            ToolSpec::new("equity.price.historical", "Historical OHLCV prices for a stock")
                .param("symbol", symbol())
                .param(
                    "start_date",
                    ParamSpec::optional(ParamType::Date, "First day of the range"),
                )
                .param(
                    "end_date",
                    ParamSpec::optional(ParamType::Date, "Last day of the range"),
                )
                .param(
                    "interval",
                    ParamSpec::optional(ParamType::String, "Bar interval")
                        .one_of(&["1m", "5m", "15m", "30m", "1h", "1d", "1W", "1M"]),
                )
                .param(
                    "provider",
                    ParamSpec::optional(ParamType::String, "Price source")
                        .one_of(&["fmp", "intrinio", "polygon", "tiingo", "yfinance"]),
                ),
            "equity/price/historical",
        ),
        (
            ToolSpec::new("equity.price.quote", "Current quote for a stock")
                .param("symbol", symbol())
                .param(
                    "provider",
                    ParamSpec::optional(ParamType::String, "Quote source")
                        .one_of(&["fmp", "intrinio", "yfinance"]),
                ),
            "equity/price/quote",
        ),
        (
            ToolSpec::new(
                "equity.estimates.price_target",
                "Analyst price targets for a stock",
            )
            .param("symbol", symbol())
            .param(
                "limit",
                ParamSpec::optional(ParamType::Integer, "Number of estimates").range(1.0, 200.0),
            )
            .param(
                "provider",
                ParamSpec::optional(ParamType::String, "Estimates source")
                    .one_of(&["benzinga", "fmp"]),
            ),
            "equity/estimates/price_target",
        ),
        (
            ToolSpec::new(
                "equity.fundamental.metrics",
                "Key valuation and profitability metrics for a company",
            )
            .param("symbol", symbol())
            .param(
                "period",
                ParamSpec::optional(ParamType::String, "Reporting period")
                    .one_of(&["annual", "quarter", "ttm"]),
            )
            .param(
                "limit",
                ParamSpec::optional(ParamType::Integer, "Number of periods").range(1.0, 100.0),
            )
            .param(
                "provider",
                ParamSpec::optional(ParamType::String, "Fundamentals source")
                    .one_of(&["fmp", "intrinio", "yfinance"]),
            ),
            "equity/fundamental/metrics",
        ),
    ]
}

/// Create a registry with every default OpenBB operation bound to `client`.
pub fn create_openbb_registry(client: OpenBbClient) -> ToolRegistry {
    let mut registry = ToolRegistry::new();

    for (spec, route) in default_operations() {
        registry.register(Arc::new(OpenBbOperation::new(spec, route, client.clone())));
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ToolCatalog;
    use crate::tools::DataToolProvider;

    fn client() -> OpenBbClient {
        OpenBbClient::new("http://127.0.0.1:6900/", None, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(classify_status(StatusCode::TOO_MANY_REQUESTS), FailureClass::RateLimited);
        assert_eq!(classify_status(StatusCode::BAD_GATEWAY), FailureClass::Upstream);
        assert_eq!(classify_status(StatusCode::UNAUTHORIZED), FailureClass::Auth);
        assert_eq!(classify_status(StatusCode::NOT_FOUND), FailureClass::NotFound);
        assert_eq!(classify_status(StatusCode::GATEWAY_TIMEOUT), FailureClass::Timeout);
        assert_eq!(classify_status(StatusCode::UNPROCESSABLE_ENTITY), FailureClass::Rejected);
    }

    #[test]
    fn test_endpoint_joining() {
        assert_eq!(
            client().endpoint("news/company"),
            "http://127.0.0.1:6900/api/v1/news/company"
        );
    }

    #[test]
    fn test_default_registry_forms_valid_catalog() {
        let registry = create_openbb_registry(client());
        let catalog = ToolCatalog::from_provider(&registry).unwrap();

        assert_eq!(catalog.len(), 5);
        let news = catalog.lookup("news.company").unwrap();
        assert!(news.parameters["symbol"].required);
        assert!(registry.operations().unwrap().iter().all(|s| s.parameters.contains_key("symbol")));
    }

    #[test]
    fn test_routes_mirror_tool_names() {
        for (spec, route) in default_operations() {
            assert_eq!(spec.name.replace('.', "/"), route);
        }
    }
}
