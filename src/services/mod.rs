pub mod notification_service;
pub use notification_service::NotificationService;
pub mod order_service;
pub use order_service::OrderService;
pub mod substitution_service;
pub use substitution_service::SubstitutionService;
pub mod subscription_service;
pub use subscription_service::SubscriptionService;
