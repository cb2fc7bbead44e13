//! Worker implementations.

mod notification;
mod sanitize;

pub use notification::{
    NotificationContext, notification_email_worker, notification_fanout_worker,
};
pub use sanitize::{SanitizeContext, sanitize_worker};
