//! Process-wide completion-notification routing.

pub mod router;

pub use router::{ClusterNotification, NotificationRouter};
