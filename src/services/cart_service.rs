use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::models::{
    CartItemKey, CartItemRequest, CurrentUser, ServiceError, ServiceResult, ShoppingCartItem,
    Validate,
};
use crate::observability::OperationTracer;
use crate::repositories::{dynamo::MAX_TRANSACTION_ITEMS, CartRepository};

/// Submitting writes the order header plus one detail per line in one transaction
pub const MAX_CART_LINES: usize = MAX_TRANSACTION_ITEMS - 1;

/// Service for managing a customer's shopping cart
pub struct CartService {
    cart_repository: Arc<dyn CartRepository>,
    tracer: OperationTracer,
}

impl CartService {
    pub fn new(cart_repository: Arc<dyn CartRepository>, tracer: OperationTracer) -> Self {
        Self {
            cart_repository,
            tracer,
        }
    }

    /// Add one unit of a dish or combo. The first add creates the line with number 1.
    #[instrument(skip(self, request), fields(user_id = user.user_id))]
    pub async fn add(
        &self,
        user: &CurrentUser,
        request: CartItemRequest,
    ) -> ServiceResult<ShoppingCartItem> {
        self.tracer
            .trace_cart_operation("add", user.user_id, async {
                request.validate()?;
                let key = line_key(&request)?;

                let line = match self.cart_repository.find_item(user.user_id, key).await? {
                    Some(mut line) => {
                        line.number += 1;
                        line
                    }
                    None => {
                        let lines = self.cart_repository.list_items(user.user_id).await?;
                        if lines.len() >= MAX_CART_LINES {
                            return Err(ServiceError::validation(format!(
                                "Shopping cart cannot hold more than {} different items",
                                MAX_CART_LINES
                            )));
                        }
                        ShoppingCartItem::new(user.user_id, key, &request)
                    }
                };

                let saved = self.cart_repository.save_item(line).await?;
                debug!(item = %key, number = saved.number, "Cart line saved");
                Ok(saved)
            })
            .await
    }

    /// Remove one unit. A line at number 1 is deleted and returned with number 0.
    #[instrument(skip(self, request), fields(user_id = user.user_id))]
    pub async fn sub(
        &self,
        user: &CurrentUser,
        request: CartItemRequest,
    ) -> ServiceResult<ShoppingCartItem> {
        self.tracer
            .trace_cart_operation("sub", user.user_id, async {
                let key = line_key(&request)?;

                let mut line = self
                    .cart_repository
                    .find_item(user.user_id, key)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("Cart item", key))?;

                if line.number > 1 {
                    line.number -= 1;
                    return Ok(self.cart_repository.save_item(line).await?);
                }

                self.cart_repository.delete_item(user.user_id, key).await?;
                line.number = 0;
                Ok(line)
            })
            .await
    }

    /// Lines in the order they were first added
    pub async fn list(&self, user: &CurrentUser) -> ServiceResult<Vec<ShoppingCartItem>> {
        self.tracer
            .trace_cart_operation("list", user.user_id, async {
                Ok(self.cart_repository.list_items(user.user_id).await?)
            })
            .await
    }

    #[instrument(skip(self), fields(user_id = user.user_id))]
    pub async fn clear(&self, user: &CurrentUser) -> ServiceResult<usize> {
        self.tracer
            .trace_cart_operation("clear", user.user_id, async {
                let removed = self.cart_repository.clear(user.user_id).await?;
                info!(removed = removed, "Cart cleared");
                Ok(removed)
            })
            .await
    }
}

fn line_key(request: &CartItemRequest) -> ServiceResult<CartItemKey> {
    request
        .key()
        .ok_or_else(|| ServiceError::validation("Either dishId or setmealId is required"))
}
