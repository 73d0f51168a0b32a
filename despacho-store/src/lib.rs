pub mod app_config;
pub mod database;
pub mod events;
pub mod order_repo;

pub use database::DbClient;
pub use events::EventBroadcaster;
pub use order_repo::PgOrderRepository;
