pub mod orders_repo;
pub use orders_repo::OrdersRepository;
pub mod catalog_repo;
pub use catalog_repo::CatalogRepository;
pub mod substitutions_repo;
pub use substitutions_repo::SubstitutionsRepository;
pub mod subscriptions_repo;
pub use subscriptions_repo::SubscriptionsRepository;
pub mod audit_repo;
pub use audit_repo::AuditRepository;
