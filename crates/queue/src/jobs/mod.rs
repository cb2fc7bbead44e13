//! Job definitions.

mod notification;
mod sanitize;

pub use notification::{NotificationEmailJob, NotificationFanoutJob};
pub use sanitize::SanitizeJob;
