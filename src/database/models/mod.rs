pub mod action_item;
pub mod audit_log;
pub mod rbs_node;
pub mod risk;
pub mod snapshot;
pub mod user;

pub use action_item::ActionItem;
pub use audit_log::AuditLog;
pub use rbs_node::RbsNode;
pub use risk::Risk;
pub use snapshot::Snapshot;
pub use user::User;
