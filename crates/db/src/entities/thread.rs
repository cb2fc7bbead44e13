//! Thread entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Thread categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum Category {
    #[sea_orm(string_value = "discussion")]
    Discussion,
    #[sea_orm(string_value = "request")]
    Request,
    #[sea_orm(string_value = "issue")]
    Issue,
}

impl Category {
    /// The URL path segment for this category (`discussions`, ...).
    #[must_use]
    pub const fn as_path_segment(&self) -> &'static str {
        match self {
            Self::Discussion => "discussions",
            Self::Request => "requests",
            Self::Issue => "issues",
        }
    }

    /// Parse a category from its string value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "discussion" => Some(Self::Discussion),
            "request" => Some(Self::Request),
            "issue" => Some(Self::Issue),
            _ => None,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Discussion => "discussion",
            Self::Request => "request",
            Self::Issue => "issue",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "thread")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Category this thread is scoped to
    #[sea_orm(indexed)]
    pub category: Category,

    pub created_at: DateTimeWithTimeZone,

    /// Bumped on every write to the thread or one of its posts
    pub updated_at: DateTimeWithTimeZone,

    /// Closed threads accept no new replies
    #[sea_orm(default_value = false)]
    pub is_closed: bool,

    /// Derived: true iff the thread has zero non-deleted posts
    #[sea_orm(default_value = false)]
    pub is_deleted: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::post::Entity")]
    Post,
}

impl Related<super::post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        for category in [Category::Discussion, Category::Request, Category::Issue] {
            assert_eq!(Category::parse(&category.to_string()), Some(category));
        }
        assert_eq!(Category::parse("bogus"), None);
    }

    #[test]
    fn test_path_segments() {
        assert_eq!(Category::Discussion.as_path_segment(), "discussions");
        assert_eq!(Category::Issue.as_path_segment(), "issues");
    }
}
