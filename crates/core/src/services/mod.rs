//! Business logic services.

#![allow(missing_docs)]

pub mod author;
pub mod email;
pub mod import;
pub mod moderation;
pub mod notification;
pub mod post;
pub mod queue;
pub mod visibility;
pub mod vote;

pub use author::{AuthorView, gravatar_url};
pub use email::{EmailMessage, EmailProvider, EmailService, MailgunConfig, SmtpConfig};
pub use import::{ImportReport, ImportService, ImportedAuthor, ImportedPost, ImportedThread};
pub use moderation::{ModerationService, PurgeOutcome};
pub use notification::{
    NotificationEvent, NotificationKind, NotificationService, dedupe_ancestor_authors,
};
pub use post::{
    AttachmentUpload, EditPostInput, MediaUpload, NewPostInput, PostService, ReplyInput,
    Submission, auto_approve, is_editable,
};
pub use queue::{JobQueue, NoOpQueue, QueueService};
pub use visibility::{ThreadPage, ThreadResolution, Viewer, VisibilityService, post_visible};
pub use vote::{FlagUpdate, VoteMode, VoteOutcome, VoteService};
