//! Polar REST API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;

use super::types::ListResource;
use super::{
    CheckoutSession, CreateCheckout, CreateProduct, Customer, PaymentError, PaymentProvider,
    PolarProduct, ProviderOrder,
};
use crate::config::PolarConfig;

/// Request timeout for every Polar call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Largest page Polar serves for list endpoints.
const MAX_PAGE_SIZE: &str = "100";

/// Polar API client.
#[derive(Clone)]
pub struct PolarClient {
    client: reqwest::Client,
    base_url: String,
}

impl PolarClient {
    /// Create a new Polar API client.
    ///
    /// # Errors
    ///
    /// Returns error if the access token is not a valid header value or the
    /// HTTP client fails to build.
    pub fn new(config: &PolarConfig) -> Result<Self, PaymentError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.access_token.expose_secret());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value)
                .map_err(|e| PaymentError::Parse(format!("Invalid access token format: {e}")))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, PaymentError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        parse_response(response).await
    }
}

/// Turn a response into `T`, mapping 404 to `NotFound` and other failures to `Api`.
async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PaymentError> {
    let status = response.status();

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(PaymentError::NotFound);
    }

    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(PaymentError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| PaymentError::Parse(e.to_string()))
}

#[async_trait]
impl PaymentProvider for PolarClient {
    #[instrument(skip(self, product), fields(name = %product.name))]
    async fn create_product(&self, product: &CreateProduct) -> Result<PolarProduct, PaymentError> {
        self.post_json("/v1/products/", product).await
    }

    #[instrument(skip(self, checkout), fields(products = checkout.products.len()))]
    async fn create_checkout(
        &self,
        checkout: &CreateCheckout,
    ) -> Result<CheckoutSession, PaymentError> {
        self.post_json("/v1/checkouts/", checkout).await
    }

    #[instrument(skip(self))]
    async fn customer_by_external_id(&self, external_id: &str) -> Result<Customer, PaymentError> {
        let mut url = reqwest::Url::parse(&self.url("/v1/customers/external/"))
            .map_err(|e| PaymentError::Parse(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| PaymentError::Parse("base URL cannot have a path".to_owned()))?
            .pop_if_empty()
            .push(external_id);

        let response = self.client.get(url).send().await?;
        parse_response(response).await
    }

    #[instrument(skip(self))]
    async fn list_orders(&self, customer_id: &str) -> Result<Vec<ProviderOrder>, PaymentError> {
        let response = self
            .client
            .get(self.url("/v1/orders/"))
            .query(&[
                ("customer_id", customer_id),
                ("limit", MAX_PAGE_SIZE),
                ("sorting", "-created_at"),
            ])
            .send()
            .await?;

        let list: ListResource<ProviderOrder> = parse_response(response).await?;
        Ok(list.items)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::config::PolarServer;

    fn config(api_url: &str) -> PolarConfig {
        PolarConfig {
            access_token: SecretString::from("polar_oat_9fK2mQ7xLp4Vw8Zr"),
            server: PolarServer::Sandbox,
            api_url: api_url.to_string(),
            sync_products: false,
        }
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = PolarClient::new(&config("https://sandbox-api.polar.sh/")).unwrap();
        assert_eq!(
            client.url("/v1/checkouts/"),
            "https://sandbox-api.polar.sh/v1/checkouts/"
        );
    }

    #[test]
    fn test_rejects_token_with_newline() {
        let mut cfg = config("https://api.polar.sh");
        cfg.access_token = SecretString::from("bad\ntoken");
        assert!(matches!(
            PolarClient::new(&cfg),
            Err(PaymentError::Parse(_))
        ));
    }
}
