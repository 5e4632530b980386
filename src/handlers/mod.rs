//! HTTP handlers. Each one decodes input, checks the caller's
//! permission, delegates to a service, and wraps the result in the
//! shared success envelope.

pub mod action_items;
pub mod audit;
pub mod auth;
pub mod rbs;
pub mod risks;
pub mod snapshots;
pub mod system;
pub mod users;
