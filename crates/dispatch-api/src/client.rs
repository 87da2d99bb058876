//! Orders API client.

use dispatch_core::config::ApiConfig;
use dispatch_core::constants::{
    ASSIGNMENTS_PATH_COMPONENT, CANCEL_PATH_COMPONENT, CONFIRM_PATH_COMPONENT,
    ORDERS_PATH_COMPONENT,
};
use dispatch_core::types::{DateKey, OrderId};
use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::{Method, RequestBuilder, Url};

use crate::error::{ApiError, ApiResult};
use crate::model::{AssignmentInput, Order, OrderAssignment, OrderUpdate, ReplaceAssignments};
use crate::wire;

pub type ApiFuture<'a, T> = BoxFuture<'a, ApiResult<T>>;

/// Remote source of truth for orders and their assignments.
///
/// Futures are boxed so the trait stays object safe; callers hold it as
/// `Arc<dyn OrdersApi>`.
pub trait OrdersApi: Send + Sync {
    /// Orders scheduled on `date`, or every order when `date` is `None`.
    fn list_orders<'a>(&'a self, date: Option<&'a DateKey>) -> ApiFuture<'a, Vec<Order>>;

    fn get_assignments<'a>(
        &'a self,
        order_id: &'a OrderId,
    ) -> ApiFuture<'a, Vec<OrderAssignment>>;

    /// Replaces the full assignment list of an order. Not a patch.
    fn replace_assignments<'a>(
        &'a self,
        order_id: &'a OrderId,
        assignments: &'a [AssignmentInput],
    ) -> ApiFuture<'a, Vec<OrderAssignment>>;

    fn update_order<'a>(
        &'a self,
        order_id: &'a OrderId,
        update: &'a OrderUpdate,
    ) -> ApiFuture<'a, Order>;

    fn confirm_order<'a>(&'a self, order_id: &'a OrderId) -> ApiFuture<'a, ()>;

    fn cancel_order<'a>(&'a self, order_id: &'a OrderId) -> ApiFuture<'a, ()>;
}

/// `OrdersApi` over HTTP with JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpOrdersApi {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpOrdersApi {
    /// ## Summary
    /// Builds a client from the `api` config section.
    ///
    /// ## Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> ApiResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .build()?;
        Self::with_client(client, &config.base_url, config.token.clone())
    }

    /// ## Summary
    /// Wraps an existing `reqwest::Client`.
    ///
    /// ## Errors
    /// Returns `InvalidUrl` if `base_url` cannot be parsed or cannot carry a path.
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        token: Option<String>,
    ) -> ApiResult<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    /// ## Summary
    /// `{base}/orders[?date=YYYY-MM-DD]`
    ///
    /// ## Errors
    /// Returns `InvalidUrl` if the base URL cannot take path segments.
    pub fn orders_url(&self, date: Option<&DateKey>) -> ApiResult<Url> {
        let mut url = self.endpoint(&[ORDERS_PATH_COMPONENT])?;
        if let Some(date) = date {
            url.query_pairs_mut()
                .append_pair("date", &date.to_string());
        }
        Ok(url)
    }

    /// ## Summary
    /// `{base}/orders/{id}[/{action}]`
    ///
    /// ## Errors
    /// Returns `InvalidUrl` if the base URL cannot take path segments.
    pub fn order_url(&self, order_id: &OrderId, action: Option<&str>) -> ApiResult<Url> {
        match action {
            Some(action) => self.endpoint(&[ORDERS_PATH_COMPONENT, order_id.as_str(), action]),
            None => self.endpoint(&[ORDERS_PATH_COMPONENT, order_id.as_str()]),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn execute<T>(
        &self,
        request: RequestBuilder,
        decode: fn(&[u8]) -> ApiResult<T>,
    ) -> ApiResult<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "Orders API request failed");
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        decode(&body)
    }

    #[tracing::instrument(skip_all, fields(date = ?date.map(ToString::to_string)))]
    async fn fetch_orders(&self, date: Option<&DateKey>) -> ApiResult<Vec<Order>> {
        let url = self.orders_url(date)?;
        let orders = self
            .execute(self.request(Method::GET, url), wire::decode_orders)
            .await?;
        tracing::debug!(count = orders.len(), "Orders listed");
        Ok(orders)
    }

    #[tracing::instrument(skip_all, fields(order_id = %order_id))]
    async fn fetch_assignments(&self, order_id: &OrderId) -> ApiResult<Vec<OrderAssignment>> {
        let url = self.order_url(order_id, Some(ASSIGNMENTS_PATH_COMPONENT))?;
        self.execute(self.request(Method::GET, url), wire::decode_assignments)
            .await
    }

    #[tracing::instrument(skip_all, fields(order_id = %order_id, count = assignments.len()))]
    async fn put_assignments(
        &self,
        order_id: &OrderId,
        assignments: &[AssignmentInput],
    ) -> ApiResult<Vec<OrderAssignment>> {
        let url = self.order_url(order_id, Some(ASSIGNMENTS_PATH_COMPONENT))?;
        let request = self
            .request(Method::PUT, url)
            .json(&ReplaceAssignments { assignments });
        let stored = self.execute(request, wire::decode_assignments).await?;
        tracing::debug!(stored = stored.len(), "Order assignments replaced");
        Ok(stored)
    }

    #[tracing::instrument(skip_all, fields(order_id = %order_id))]
    async fn patch_order(&self, order_id: &OrderId, update: &OrderUpdate) -> ApiResult<Order> {
        let url = self.order_url(order_id, None)?;
        let request = self.request(Method::PATCH, url).json(update);
        self.execute(request, wire::decode_order).await
    }

    #[tracing::instrument(skip(self, order_id), fields(order_id = %order_id))]
    async fn post_action(&self, order_id: &OrderId, action: &str) -> ApiResult<()> {
        let url = self.order_url(order_id, Some(action))?;
        self.execute(self.request(Method::POST, url), |_| Ok(()))
            .await
    }
}

impl OrdersApi for HttpOrdersApi {
    fn list_orders<'a>(&'a self, date: Option<&'a DateKey>) -> ApiFuture<'a, Vec<Order>> {
        self.fetch_orders(date).boxed()
    }

    fn get_assignments<'a>(
        &'a self,
        order_id: &'a OrderId,
    ) -> ApiFuture<'a, Vec<OrderAssignment>> {
        self.fetch_assignments(order_id).boxed()
    }

    fn replace_assignments<'a>(
        &'a self,
        order_id: &'a OrderId,
        assignments: &'a [AssignmentInput],
    ) -> ApiFuture<'a, Vec<OrderAssignment>> {
        self.put_assignments(order_id, assignments).boxed()
    }

    fn update_order<'a>(
        &'a self,
        order_id: &'a OrderId,
        update: &'a OrderUpdate,
    ) -> ApiFuture<'a, Order> {
        self.patch_order(order_id, update).boxed()
    }

    fn confirm_order<'a>(&'a self, order_id: &'a OrderId) -> ApiFuture<'a, ()> {
        self.post_action(order_id, CONFIRM_PATH_COMPONENT).boxed()
    }

    fn cancel_order<'a>(&'a self, order_id: &'a OrderId) -> ApiFuture<'a, ()> {
        self.post_action(order_id, CANCEL_PATH_COMPONENT).boxed()
    }
}
