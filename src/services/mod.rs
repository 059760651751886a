// Services module - business logic layer

pub mod auth_service;
pub mod cart_service;
pub mod category_service;
pub mod consistency_guard;
pub mod dish_service;
pub mod order_service;
pub mod session;
pub mod setmeal_service;

#[cfg(test)]
mod test_support;

pub use auth_service::{generate_code, AuthService, LoggingSmsSender, SmsSender};
pub use cart_service::CartService;
pub use category_service::CategoryService;
pub use consistency_guard::ConsistencyGuard;
pub use dish_service::DishService;
pub use order_service::OrderService;
pub use session::SessionStore;
pub use setmeal_service::SetmealService;
