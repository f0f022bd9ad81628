//! Azure IoT Hub registry over the service REST API.
//!
//! Endpoints used:
//!
//! - `GET  /twins/{id}`: read a device twin
//! - `POST /devices`: bulk import, one device created together with its twin
//! - `POST /devices/query`: paged twin query, continued with `x-ms-continuation`
//!
//! Every request carries a fresh SAS token. Failures are mapped to
//! [`GatewayError`] and never retried.

use crate::connection::ConnectionString;
use crate::sas::{SasTokenProvider, DEFAULT_TOKEN_TTL};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::Stream;
use loracheck_core::{
    strip_twin_metadata, BulkRegistryResult, DesiredProperties, GatewayError, GatewayResult,
    RegistryGateway, TwinDocument,
};
use reqwest::header::{HeaderMap, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Service API version sent with every request.
pub const API_VERSION: &str = "2021-04-12";

const MAX_ITEM_COUNT: &str = "x-ms-max-item-count";
const CONTINUATION: &str = "x-ms-continuation";
const DEVICE_QUERY: &str = "SELECT * FROM devices";

/// Transport settings.
#[derive(Debug, Clone)]
pub struct IotHubConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Lifetime of each SAS token.
    pub token_ttl: Duration,
}

impl Default for IotHubConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }
}

/// [`RegistryGateway`] backed by an IoT Hub.
#[derive(Debug, Clone)]
pub struct IotHubRegistry {
    client: Client,
    base_url: String,
    tokens: SasTokenProvider,
}

/// One entry of a bulk import request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImportDevice<'a> {
    id: &'a str,
    import_mode: &'static str,
    status: &'static str,
    properties: ImportProperties<'a>,
}

#[derive(Debug, Serialize)]
struct ImportProperties<'a> {
    desired: &'a DesiredProperties,
}

struct QueryPage {
    records: Vec<Value>,
    continuation: Option<String>,
}

impl IotHubRegistry {
    pub fn new(connection: &ConnectionString, config: IotHubConfig) -> GatewayResult<Self> {
        let tokens = SasTokenProvider::new(connection, config.token_ttl)
            .map_err(|e| GatewayError::Configuration(e.to_string()))?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: format!("https://{}", connection.host_name),
            tokens,
        })
    }

    /// Parse `connection_string` and connect with default settings.
    pub fn from_connection_string(connection_string: &str) -> GatewayResult<Self> {
        let connection: ConnectionString = connection_string
            .parse()
            .map_err(|e: crate::ConnectionStringError| GatewayError::Configuration(e.to_string()))?;
        Self::new(&connection, IotHubConfig::default())
    }

    /// Send requests to `base_url` instead of `https://<HostName>`.
    ///
    /// Tokens are still signed for the hub host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}?api-version={}", self.base_url, path, API_VERSION)
    }

    async fn send(&self, request: RequestBuilder) -> GatewayResult<Response> {
        let response = request
            .header(AUTHORIZATION, self.tokens.token())
            .send()
            .await
            .map_err(|e| GatewayError::Communication(format!("Registry request failed: {e}")))?;
        debug!(status = %response.status(), url = %response.url(), "Registry response");
        Ok(response)
    }

    async fn query_page(
        &self,
        page_size: usize,
        continuation: Option<String>,
    ) -> GatewayResult<QueryPage> {
        let mut request = self
            .client
            .post(self.url("/devices/query"))
            .header(MAX_ITEM_COUNT, page_size.max(1).to_string())
            .json(&json!({ "query": DEVICE_QUERY }));
        if let Some(token) = continuation {
            request = request.header(CONTINUATION, token);
        }

        let response = ensure_success(self.send(request).await?).await?;
        let continuation = continuation_token(response.headers());
        let records: Vec<Value> = read_json(response).await?;
        Ok(QueryPage {
            records,
            continuation,
        })
    }
}

#[async_trait]
impl RegistryGateway for IotHubRegistry {
    async fn fetch_twin(&self, device_id: &str) -> GatewayResult<Option<TwinDocument>> {
        let path = format!("/twins/{}", urlencoding::encode(device_id));
        let response = self.send(self.client.get(self.url(&path))).await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(device_id, "Device twin not found");
            return Ok(None);
        }

        let twin: Value = read_json(ensure_success(response).await?).await?;
        desired_properties(twin).map(Some)
    }

    async fn create_device_with_twin(
        &self,
        device_id: &str,
        desired: &DesiredProperties,
    ) -> GatewayResult<BulkRegistryResult> {
        let body = [ImportDevice {
            id: device_id,
            import_mode: "create",
            status: "enabled",
            properties: ImportProperties { desired },
        }];
        let response = self
            .send(self.client.post(self.url("/devices")).json(&body))
            .await?;

        // Per-device rejections come back as 400 with a bulk result body.
        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            let text = response.text().await.map_err(|e| {
                GatewayError::Communication(format!("Failed to read registry response: {e}"))
            })?;
            return serde_json::from_str::<BulkRegistryResult>(&text).map_err(|_| {
                GatewayError::Http {
                    status: status.as_u16(),
                    body: text,
                }
            });
        }

        let result: BulkRegistryResult = read_json(ensure_success(response).await?).await?;
        info!(device_id, successful = result.is_successful, "Bulk registry import finished");
        Ok(result)
    }

    fn list_devices(
        &self,
        page_size: usize,
        total_limit: Option<usize>,
    ) -> BoxStream<'_, GatewayResult<Value>> {
        Box::pin(self.device_records(page_size, total_limit))
    }
}

impl IotHubRegistry {
    fn device_records(
        &self,
        page_size: usize,
        total_limit: Option<usize>,
    ) -> impl Stream<Item = GatewayResult<Value>> + Send + '_ {
        try_stream! {
            let reached = |count: usize| total_limit.is_some_and(|limit| count >= limit);
            let mut yielded = 0usize;
            let mut continuation = None;
            let mut page_number = 0usize;

            'pages: while !reached(yielded) {
                let page = self.query_page(page_size, continuation.take()).await?;
                page_number += 1;
                debug!(page = page_number, records = page.records.len(), "Fetched device page");

                for record in page.records {
                    if reached(yielded) {
                        break 'pages;
                    }
                    yielded += 1;
                    yield record;
                }

                match page.continuation {
                    Some(token) => continuation = Some(token),
                    None => break,
                }
            }
        }
    }
}

/// Map a non-success response to a [`GatewayError`].
async fn ensure_success(response: Response) -> GatewayResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, body))
}

fn status_error(status: StatusCode, body: String) -> GatewayError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            GatewayError::Unauthorized(format!("{status}: {body}"))
        }
        StatusCode::TOO_MANY_REQUESTS => GatewayError::Throttled(body),
        _ => GatewayError::Http {
            status: status.as_u16(),
            body,
        },
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(response: Response) -> GatewayResult<T> {
    response
        .json::<T>()
        .await
        .map_err(|e| GatewayError::InvalidResponse(e.to_string()))
}

fn continuation_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTINUATION)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Extract `properties.desired` from a full twin, without metadata.
fn desired_properties(twin: Value) -> GatewayResult<TwinDocument> {
    match twin {
        Value::Object(mut twin) => match twin.remove("properties") {
            Some(Value::Object(mut properties)) => match properties.remove("desired") {
                Some(Value::Object(desired)) => Ok(strip_twin_metadata(desired)),
                None | Some(Value::Null) => Ok(TwinDocument::new()),
                Some(_) => Err(GatewayError::InvalidResponse(
                    "twin desired properties are not an object".to_string(),
                )),
            },
            None => Ok(TwinDocument::new()),
            Some(_) => Err(GatewayError::InvalidResponse(
                "twin properties are not an object".to_string(),
            )),
        },
        _ => Err(GatewayError::InvalidResponse(
            "twin is not a JSON object".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CS: &str =
        "HostName=myhub.azure-devices.net;SharedAccessKeyName=registryReadWrite;SharedAccessKey=c2VjcmV0LWtleQ==";

    #[test]
    fn test_urls() {
        let registry = IotHubRegistry::from_connection_string(CS).unwrap();
        assert_eq!(
            registry.url("/twins/abc"),
            "https://myhub.azure-devices.net/twins/abc?api-version=2021-04-12"
        );

        let registry = registry.with_base_url("http://127.0.0.1:8080/");
        assert_eq!(
            registry.url("/devices"),
            "http://127.0.0.1:8080/devices?api-version=2021-04-12"
        );
    }

    #[test]
    fn test_bad_connection_string_is_configuration_error() {
        let err = IotHubRegistry::from_connection_string("HostName=x").unwrap_err();
        assert_eq!(err.code(), "CONFIGURATION");
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, String::new()),
            GatewayError::Unauthorized(_)
        ));
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, String::new()),
            GatewayError::Unauthorized(_)
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "slow down".into()),
            GatewayError::Throttled(ref b) if b == "slow down"
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom".into()),
            GatewayError::Http { status: 500, .. }
        ));
    }

    #[test]
    fn test_desired_properties_extraction() {
        let twin = json!({
            "deviceId": "0011",
            "properties": {
                "desired": {
                    "AppEUI": "AA",
                    "$metadata": { "$lastUpdated": "2024-01-01T00:00:00Z" },
                    "$version": 4
                },
                "reported": { "FCntUp": 12 }
            }
        });
        let desired = desired_properties(twin).unwrap();
        assert_eq!(desired.len(), 1);
        assert_eq!(desired["AppEUI"], "AA");
    }

    #[test]
    fn test_desired_properties_missing_is_empty() {
        assert!(desired_properties(json!({ "deviceId": "x" })).unwrap().is_empty());
        assert!(desired_properties(json!([])).is_err());
    }

    #[test]
    fn test_import_body_shape() {
        let mut desired = DesiredProperties::new();
        desired.insert(loracheck_core::CredentialField::SensorDecoder, "");
        let body = [ImportDevice {
            id: "0011",
            import_mode: "create",
            status: "enabled",
            properties: ImportProperties { desired: &desired },
        }];
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!([{
                "id": "0011",
                "importMode": "create",
                "status": "enabled",
                "properties": { "desired": { "SensorDecoder": "" } }
            }])
        );
    }
}
