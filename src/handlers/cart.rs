use axum::extract::State;
use tracing::instrument;

use super::extract::Payload;
use super::response::{service_error_to_response, success, HandlerResult};
use crate::app::AppState;
use crate::models::{CartItemRequest, CurrentUser, ShoppingCartItem};

#[instrument(name = "add_cart_item", skip(state, request), fields(
    user_id = user.user_id,
    dish_id = ?request.dish_id,
    setmeal_id = ?request.setmeal_id,
))]
pub async fn add_cart_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Payload(request): Payload<CartItemRequest>,
) -> HandlerResult<ShoppingCartItem> {
    crate::info_with_trace!(
        "Adding to cart for user {}: dish={:?} setmeal={:?}",
        user.user_id,
        request.dish_id,
        request.setmeal_id
    );

    state
        .carts
        .add(&user, request)
        .await
        .map(success)
        .map_err(service_error_to_response)
}

#[instrument(name = "sub_cart_item", skip(state, request), fields(
    user_id = user.user_id,
    dish_id = ?request.dish_id,
    setmeal_id = ?request.setmeal_id,
))]
pub async fn sub_cart_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Payload(request): Payload<CartItemRequest>,
) -> HandlerResult<ShoppingCartItem> {
    state
        .carts
        .sub(&user, request)
        .await
        .map(success)
        .map_err(service_error_to_response)
}

#[instrument(name = "list_cart", skip(state), fields(user_id = user.user_id))]
pub async fn list_cart(
    State(state): State<AppState>,
    user: CurrentUser,
) -> HandlerResult<Vec<ShoppingCartItem>> {
    state
        .carts
        .list(&user)
        .await
        .map(success)
        .map_err(service_error_to_response)
}

#[instrument(name = "clean_cart", skip(state), fields(user_id = user.user_id))]
pub async fn clean_cart(State(state): State<AppState>, user: CurrentUser) -> HandlerResult<String> {
    match state.carts.clear(&user).await {
        Ok(removed) => {
            crate::info_with_trace!("Cleared {} cart lines for user {}", removed, user.user_id);
            Ok(success("Shopping cart cleared".to_string()))
        }
        Err(err) => {
            crate::error_with_trace!("Failed to clear cart for user {}: {}", user.user_id, err);
            Err(service_error_to_response(err))
        }
    }
}
