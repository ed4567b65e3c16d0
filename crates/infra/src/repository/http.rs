//! REST adapter for an external order backend.
//!
//! | operation      | request                  |
//! |----------------|--------------------------|
//! | `create_order` | `POST   {base}/orders`      |
//! | `fetch_order`  | `GET    {base}/orders/{id}` |
//! | `update_order` | `PATCH  {base}/orders/{id}` |
//! | `delete_order` | `DELETE {base}/orders/{id}` |
//!
//! Failures are passed through as [`RepositoryError`]; nothing is retried.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use medcamp_core::OrderId;
use medcamp_replenishment::OrderRecord;

use super::{NewOrder, OrderRepository, OrderUpdate, RepositoryError};

#[derive(Debug, Clone)]
pub struct HttpOrderRepository {
    client: Client,
    base_url: String,
}

impl HttpOrderRepository {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RepositoryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RepositoryError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn order_url(&self, order_id: OrderId) -> String {
        format!("{}/orders/{}", self.base_url, order_id)
    }
}

fn transport(err: reqwest::Error) -> RepositoryError {
    tracing::error!(error = %err, "order backend unreachable");
    RepositoryError::Transport(err.to_string())
}

/// Map non-success statuses; `order_id` turns a 404 into `NotFound`.
async fn check(res: Response, order_id: Option<OrderId>) -> Result<Response, RepositoryError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    if let (StatusCode::NOT_FOUND, Some(id)) = (status, order_id) {
        return Err(RepositoryError::NotFound(id));
    }
    let body = res.text().await.unwrap_or_default();
    Err(RepositoryError::Rejected {
        status: status.as_u16(),
        body,
    })
}

async fn decode<T: DeserializeOwned>(res: Response) -> Result<T, RepositoryError> {
    let bytes = res.bytes().await.map_err(transport)?;
    serde_json::from_slice(&bytes).map_err(|e| RepositoryError::Decode(e.to_string()))
}

#[async_trait::async_trait]
impl OrderRepository for HttpOrderRepository {
    async fn create_order(&self, order: NewOrder) -> Result<OrderRecord, RepositoryError> {
        let res = self
            .client
            .post(format!("{}/orders", self.base_url))
            .json(&order)
            .send()
            .await
            .map_err(transport)?;
        decode(check(res, None).await?).await
    }

    async fn fetch_order(&self, order_id: OrderId) -> Result<OrderRecord, RepositoryError> {
        let res = self
            .client
            .get(self.order_url(order_id))
            .send()
            .await
            .map_err(transport)?;
        decode(check(res, Some(order_id)).await?).await
    }

    async fn update_order(&self, order_id: OrderId, update: OrderUpdate) -> Result<OrderRecord, RepositoryError> {
        let res = self
            .client
            .patch(self.order_url(order_id))
            .json(&update)
            .send()
            .await
            .map_err(transport)?;
        decode(check(res, Some(order_id)).await?).await
    }

    async fn delete_order(&self, order_id: OrderId) -> Result<(), RepositoryError> {
        let res = self
            .client
            .delete(self.order_url(order_id))
            .send()
            .await
            .map_err(transport)?;
        check(res, Some(order_id)).await?;
        Ok(())
    }
}
