pub mod admin;
pub mod cart;
pub mod category;
pub mod dish;
pub mod extract;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod order;
pub mod response;
pub mod setmeal;
pub mod user;

pub use extract::{session_middleware, SessionId, SessionLayerState};
pub use health::*;
pub use metrics::*;
pub use middleware::*;
pub use response::{ApiResponse, HandlerResult};
