// Repositories module - data access layer

pub mod cart_repository;
pub mod catalog_repository;
pub mod dynamo;
pub mod items;
pub mod memory;
pub mod order_repository;
pub mod table_manager;
pub mod user_repository;


pub use cart_repository::{CartRepository, DynamoDbCartRepository};
pub use catalog_repository::{
    CatalogRepository, CatalogTables, CatalogWrite, DynamoDbCatalogRepository,
};
pub use memory::{
    InMemoryCartRepository, InMemoryCatalogRepository, InMemoryOrderRepository,
    InMemoryUserRepository,
};
pub use order_repository::{DynamoDbOrderRepository, OrderRepository};
pub use table_manager::TableManager;
pub use user_repository::{DynamoDbUserRepository, UserRepository};
