use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::models::{
    CurrentUser, Order, OrderDetail, OrderFilter, OrderStatus, OrderView, Page, PageQuery,
    ServiceError, ServiceResult, SubmitOrderRequest, UpdateOrderStatusRequest, Validate,
};
use crate::observability::OperationTracer;
use crate::repositories::{CartRepository, OrderRepository};

/// Service for turning carts into orders and tracking their status
pub struct OrderService {
    order_repository: Arc<dyn OrderRepository>,
    cart_repository: Arc<dyn CartRepository>,
    tracer: OperationTracer,
}

impl OrderService {
    pub fn new(
        order_repository: Arc<dyn OrderRepository>,
        cart_repository: Arc<dyn CartRepository>,
        tracer: OperationTracer,
    ) -> Self {
        Self {
            order_repository,
            cart_repository,
            tracer,
        }
    }

    /// Snapshot the cart into an order with one detail line per cart line, then
    /// empty the cart. Prices are taken from the cart as-is.
    #[instrument(skip(self, request), fields(user_id = user.user_id))]
    pub async fn submit(
        &self,
        user: &CurrentUser,
        request: SubmitOrderRequest,
    ) -> ServiceResult<Order> {
        self.tracer
            .trace_order_submission(user.user_id, async {
                request.validate()?;

                let lines = self.cart_repository.list_items(user.user_id).await?;
                if lines.is_empty() {
                    return Err(ServiceError::validation(
                        "Shopping cart is empty, cannot place an order",
                    ));
                }

                let amount: Decimal = lines.iter().map(|line| line.line_total()).sum();
                let order = Order::new(user.user_id, &request, amount);
                let details: Vec<OrderDetail> = lines
                    .iter()
                    .map(|line| OrderDetail::from_cart_item(order.id, line))
                    .collect();

                let order = self.order_repository.create(order, details).await?;
                // The order is committed; a stale cart must not turn it into an error
                if let Err(e) = self.cart_repository.clear(user.user_id).await {
                    warn!(order_id = order.id, error = %e, "Failed to clear cart after order submission");
                }

                info!(order_id = order.id, amount = %order.amount, lines = lines.len(), "Order submitted");
                Ok(order)
            })
            .await
    }

    /// The customer's own orders, newest first, each with its detail lines
    #[instrument(skip(self, query), fields(user_id = user.user_id))]
    pub async fn user_page(
        &self,
        user: &CurrentUser,
        query: &PageQuery,
    ) -> ServiceResult<Page<OrderView>> {
        let filter = OrderFilter {
            user_id: Some(user.user_id),
            ..OrderFilter::default()
        };
        let orders = self.order_repository.list(filter).await?;
        let page = Page::slice(orders, query);

        let mut records = Vec::with_capacity(page.records.len());
        for order in &page.records {
            records.push(OrderView {
                order_details: self.order_repository.find_details(order.id).await?,
                order: order.clone(),
            });
        }

        Ok(Page {
            records,
            total: page.total,
            size: page.size,
            current: page.current,
        })
    }

    /// Admin listing across all customers
    #[instrument(skip(self, query))]
    pub async fn page(&self, query: &PageQuery, filter: OrderFilter) -> ServiceResult<Page<Order>> {
        if let (Some(begin), Some(end)) = (filter.begin_time, filter.end_time) {
            if begin > end {
                return Err(ServiceError::validation(
                    "beginTime must not be after endTime",
                ));
            }
        }
        let orders = self.order_repository.list(filter).await?;
        Ok(Page::slice(orders, query))
    }

    #[instrument(skip(self, request), fields(order_id = ?request.id, status = ?request.status))]
    pub async fn update_status(&self, request: UpdateOrderStatusRequest) -> ServiceResult<Order> {
        let (id, status) = match (request.id, request.status) {
            (Some(id), Some(status)) => (id, status),
            _ => return Err(ServiceError::validation("Order id and status are required")),
        };

        let mut order = self
            .order_repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Order", id))?;

        if status == OrderStatus::AwaitingDelivery && order.checkout_time.is_none() {
            order.checkout_time = Some(Utc::now());
        }
        order.status = status;

        let order = self.order_repository.update(order).await?;
        info!("Order status updated");
        Ok(order)
    }
}
