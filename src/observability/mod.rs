pub mod metrics;
pub mod middleware;
pub mod tracing;

pub use metrics::{Metrics, MetricsError};
pub use middleware::{observability_middleware, OperationTracer};
pub use tracing::{get_current_trace_id, init_observability, shutdown_observability, ObservabilityError};
