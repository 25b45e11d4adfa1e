pub mod audit;
pub mod catalog;
pub mod orders;
pub mod subscriptions;
pub mod substitutions;
