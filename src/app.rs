use axum::{
    extract::{DefaultBodyLimit, FromRef},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::cache::{CacheService, CatalogCache, MemoryCacheService, RedisCacheService};
use crate::config::{CacheBackend, Config, ServerConfig, StorageBackend};
use crate::handlers::{
    admin, cart, category, dish, health_check, metrics_handler, order,
    request_validation_middleware, security_headers_middleware, session_middleware, setmeal,
    user, SessionLayerState,
};
use crate::observability::{observability_middleware, Metrics, OperationTracer};
use crate::repositories::{
    CartRepository, CatalogRepository, DynamoDbCartRepository, DynamoDbCatalogRepository,
    DynamoDbOrderRepository, DynamoDbUserRepository, InMemoryCartRepository,
    InMemoryCatalogRepository, InMemoryOrderRepository, InMemoryUserRepository, OrderRepository,
    TableManager, UserRepository,
};
use crate::services::{
    AuthService, CartService, CategoryService, ConsistencyGuard, DishService, LoggingSmsSender,
    OrderService, SessionStore, SetmealService, SmsSender,
};

/// Everything the handlers need, shared across requests
#[derive(Clone)]
pub struct AppState {
    pub categories: Arc<CategoryService>,
    pub dishes: Arc<DishService>,
    pub setmeals: Arc<SetmealService>,
    pub carts: Arc<CartService>,
    pub orders: Arc<OrderService>,
    pub auth: Arc<AuthService>,
    pub sessions: Arc<SessionStore>,
    pub cache: CatalogCache,
    pub metrics: Arc<Metrics>,
    pub table_manager: Option<Arc<TableManager>>,
    pub storage_backend: StorageBackend,
    pub service_name: Arc<str>,
    pub session_cookie: Arc<str>,
}

impl FromRef<AppState> for Arc<Metrics> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

struct Storage {
    catalog: Arc<dyn CatalogRepository>,
    carts: Arc<dyn CartRepository>,
    orders: Arc<dyn OrderRepository>,
    users: Arc<dyn UserRepository>,
    table_manager: Option<Arc<TableManager>>,
}

impl AppState {
    /// Wire the configured backends, logging verification codes instead of sending them
    pub async fn from_config(config: &Config, metrics: Arc<Metrics>) -> Self {
        Self::with_sms_sender(config, metrics, Arc::new(LoggingSmsSender)).await
    }

    pub async fn with_sms_sender(
        config: &Config,
        metrics: Arc<Metrics>,
        sms: Arc<dyn SmsSender>,
    ) -> Self {
        let storage = build_storage(config).await;
        let provider = build_cache_provider(config).await;
        info!(
            storage = storage_name(config.database.storage_backend),
            cache = provider.provider_name(),
            "Backends initialized"
        );

        let tracer = OperationTracer::new(metrics.clone());
        let cache = CatalogCache::new(
            provider,
            config.cache.dish_ttl(),
            config.cache.setmeal_ttl(),
        )
        .with_metrics(metrics.clone());
        let guard = Arc::new(ConsistencyGuard::new(
            storage.catalog.clone(),
            cache.clone(),
            tracer.clone(),
        ));
        let sessions = Arc::new(SessionStore::new(
            config.auth.code_ttl(),
            config.auth.session_ttl(),
        ));

        Self {
            categories: Arc::new(CategoryService::new(
                storage.catalog.clone(),
                cache.clone(),
                guard.clone(),
            )),
            dishes: Arc::new(DishService::new(
                storage.catalog.clone(),
                cache.clone(),
                guard.clone(),
            )),
            setmeals: Arc::new(SetmealService::new(
                storage.catalog.clone(),
                cache.clone(),
                guard,
            )),
            carts: Arc::new(CartService::new(storage.carts.clone(), tracer.clone())),
            orders: Arc::new(OrderService::new(storage.orders, storage.carts, tracer)),
            auth: Arc::new(AuthService::new(storage.users, sessions.clone(), sms)),
            sessions,
            cache,
            metrics,
            table_manager: storage.table_manager,
            storage_backend: config.database.storage_backend,
            service_name: Arc::from(config.observability.service_name.as_str()),
            session_cookie: Arc::from(config.auth.session_cookie.as_str()),
        }
    }

    pub fn storage_backend_name(&self) -> &'static str {
        storage_name(self.storage_backend)
    }
}

fn storage_name(backend: StorageBackend) -> &'static str {
    match backend {
        StorageBackend::Dynamodb => "dynamodb",
        StorageBackend::Memory => "memory",
    }
}

async fn build_storage(config: &Config) -> Storage {
    match config.database.storage_backend {
        StorageBackend::Memory => Storage {
            catalog: Arc::new(InMemoryCatalogRepository::new()),
            carts: Arc::new(InMemoryCartRepository::new()),
            orders: Arc::new(InMemoryOrderRepository::new()),
            users: Arc::new(InMemoryUserRepository::new()),
            table_manager: None,
        },
        StorageBackend::Dynamodb => {
            let client = Arc::new(config.database.dynamodb_client().await);
            let names = config.database.table_names();
            let region = config.database.region.clone();
            info!("DynamoDB tables: {:?}", names);

            Storage {
                catalog: Arc::new(DynamoDbCatalogRepository::new(
                    client.clone(),
                    (&names).into(),
                    region.clone(),
                )),
                carts: Arc::new(DynamoDbCartRepository::new(
                    client.clone(),
                    names.shopping_carts.clone(),
                    region.clone(),
                )),
                orders: Arc::new(DynamoDbOrderRepository::new(
                    client.clone(),
                    names.orders.clone(),
                    names.order_details.clone(),
                    region.clone(),
                )),
                users: Arc::new(DynamoDbUserRepository::new(
                    client.clone(),
                    names.users.clone(),
                    region,
                )),
                table_manager: Some(Arc::new(TableManager::new(client, names))),
            }
        }
    }
}

/// An unreachable Redis degrades to the in-process cache rather than failing startup
async fn build_cache_provider(config: &Config) -> Arc<dyn CacheService> {
    match config.cache.cache_backend {
        CacheBackend::Memory => Arc::new(MemoryCacheService::new()),
        CacheBackend::Redis => match RedisCacheService::connect(&config.cache.redis_url).await {
            Ok(redis) => Arc::new(redis),
            Err(e) => {
                warn!(error = %e, "Redis unavailable, falling back to in-memory cache");
                Arc::new(MemoryCacheService::new())
            }
        },
    }
}

/// Build the application router
pub fn create_app(state: AppState, server: &ServerConfig) -> Router {
    let metrics_for_middleware = state.metrics.clone();
    let session_layer = SessionLayerState {
        sessions: state.sessions.clone(),
        cookie_name: state.session_cookie.clone(),
    };

    // Customer endpoints resolve the session cookie
    let customer = Router::new()
        .route("/shoppingCart/add", post(cart::add_cart_item))
        .route("/shoppingCart/sub", post(cart::sub_cart_item))
        .route("/shoppingCart/list", get(cart::list_cart))
        .route("/shoppingCart/clean", axum::routing::delete(cart::clean_cart))
        .route("/order/submit", post(order::submit_order))
        .route("/order/userPage", get(order::user_order_page))
        .route("/user/sendMsg", post(user::send_code))
        .route("/user/login", post(user::login))
        .route("/user/logout", post(user::logout))
        .route_layer(middleware::from_fn_with_state(
            session_layer,
            session_middleware,
        ));

    let catalog = Router::new()
        .route(
            "/category",
            post(category::create_category)
                .put(category::update_category)
                .delete(category::delete_category),
        )
        .route("/category/page", get(category::category_page))
        .route("/category/list", get(category::category_list))
        .route(
            "/dish",
            post(dish::save_dish)
                .put(dish::update_dish)
                .delete(dish::delete_dishes),
        )
        .route("/dish/page", get(dish::dish_page))
        .route("/dish/list", get(dish::dish_list))
        .route("/dish/status/:status", post(dish::set_dish_status))
        .route("/dish/:id", get(dish::get_dish))
        .route(
            "/setmeal",
            post(setmeal::save_setmeal).delete(setmeal::delete_setmeals),
        )
        .route("/setmeal/page", get(setmeal::setmeal_page))
        .route("/setmeal/list", get(setmeal::setmeal_list))
        .route("/setmeal/status/:status", post(setmeal::set_setmeal_status))
        .route("/order", axum::routing::put(order::update_order_status))
        .route("/order/page", get(order::order_page));

    let operations = Router::new()
        .route("/health/status", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/admin/setup-tables", post(admin::setup_tables))
        .route("/admin/seed", post(admin::seed_database));

    Router::new()
        .merge(customer)
        .merge(catalog)
        .merge(operations)
        .with_state(state)
        // Middleware layers, innermost first
        .layer(middleware::from_fn_with_state(
            server.max_request_size,
            request_validation_middleware,
        ))
        .layer(DefaultBodyLimit::max(server.max_request_size))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CorsLayer::very_permissive())
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
}
