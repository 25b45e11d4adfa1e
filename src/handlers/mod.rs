pub mod audit;
pub mod cron;
pub mod orders;
pub mod subscriptions;
pub mod substitutions;
