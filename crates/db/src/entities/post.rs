//! Post entity.
//!
//! Moderation state is four independent boolean axes (`is_deleted`,
//! `is_approved`, `is_flagged`, `is_spam`) plus `is_highlighted`.
//! There is deliberately no single state enum: all 16 combinations of
//! the four axes are representable (a post can be spam and deleted at
//! the same time) and nothing in the write path prevents them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(indexed)]
    pub thread_id: String,

    /// Parent post ID; NULL = root post of the thread
    #[sea_orm(nullable, indexed)]
    pub parent_id: Option<String>,

    #[sea_orm(indexed)]
    pub author_id: String,

    /// Raw user-submitted markup
    #[sea_orm(column_type = "Text")]
    pub content: String,

    /// Sanitized rendering; NULL = sanitization pending
    #[sea_orm(column_type = "Text", nullable)]
    pub content_cleaned: Option<String>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,

    /// Set when the author edits the post
    #[sea_orm(nullable)]
    pub edited: Option<DateTimeWithTimeZone>,

    #[sea_orm(default_value = false)]
    pub is_deleted: bool,

    #[sea_orm(default_value = false)]
    pub is_approved: bool,

    /// Derived from votes: `vote_sum <= flag threshold`
    #[sea_orm(default_value = false)]
    pub is_flagged: bool,

    #[sea_orm(default_value = false)]
    pub is_spam: bool,

    /// Derived from votes: `vote_sum >= highlight threshold`
    #[sea_orm(default_value = false)]
    pub is_highlighted: bool,
}

impl Model {
    /// A post counts as fully active when it is approved and neither
    /// deleted nor spam. Only active posts are shown to ordinary
    /// viewers.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_approved && !self.is_deleted && !self.is_spam
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::thread::Entity",
        from = "Column::ThreadId",
        to = "super::thread::Column::Id",
        on_delete = "Cascade"
    )]
    Thread,

    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentId",
        to = "Column::Id",
        on_delete = "SetNull"
    )]
    Parent,

    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,

    #[sea_orm(has_many = "super::vote::Entity")]
    Vote,

    #[sea_orm(has_many = "super::media::Entity")]
    Media,

    #[sea_orm(has_many = "super::attachment::Entity")]
    Attachment,
}

impl Related<super::thread::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Thread.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vote.def()
    }
}

impl Related<super::media::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Media.def()
    }
}

impl Related<super::attachment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attachment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
