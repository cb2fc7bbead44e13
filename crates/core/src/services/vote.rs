//! Vote aggregation and flag derivation.
//!
//! A vote toggle, the `vote_sum` recomputation and the derived
//! flagged/highlighted state commit in one transaction with the post
//! row locked, so two concurrent votes on the same post serialize
//! through the store and the flags always reflect a final state.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    FromQueryResult, ModelTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};

use agora_common::{AppError, AppResult, IdGenerator, config::ModerationConfig};
use agora_db::entities::{post, vote};
use agora_db::repositories::VoteRepository;

use crate::services::notification::{NotificationEvent, NotificationKind};
use crate::services::queue::QueueService;

/// Vote direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteMode {
    /// Up-vote (+1).
    Up,
    /// Down-vote (-1).
    Down,
}

impl VoteMode {
    /// The stored mode value.
    #[must_use]
    pub const fn value(self) -> i16 {
        match self {
            Self::Up => vote::VOTE_UP,
            Self::Down => vote::VOTE_DOWN,
        }
    }

    /// Parse a mode from its URL value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }
}

/// What a vote toggle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// A new vote was recorded.
    Recorded,
    /// The user's existing vote was removed.
    Removed,
}

/// Recomputed flag state after a vote mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagUpdate {
    /// The post's net score after the mutation.
    pub vote_sum: i64,
    /// New flagged state.
    pub is_flagged: bool,
    /// New highlighted state.
    pub is_highlighted: bool,
    /// Flagged went false -> true in this recomputation.
    pub newly_flagged: bool,
    /// Highlighted went false -> true in this recomputation.
    pub newly_highlighted: bool,
}

impl FlagUpdate {
    /// Derive flag state from a vote sum.
    ///
    /// The `newly_*` edges fire only on a false -> true transition, so
    /// votes accumulating past a threshold trigger a single
    /// notification rather than one per vote.
    #[must_use]
    pub const fn compute(
        vote_sum: i64,
        was_flagged: bool,
        was_highlighted: bool,
        config: &ModerationConfig,
    ) -> Self {
        let is_flagged = vote_sum <= config.flag_threshold;
        let is_highlighted = vote_sum >= config.highlight_threshold;
        Self {
            vote_sum,
            is_flagged,
            is_highlighted,
            newly_flagged: is_flagged && !was_flagged,
            newly_highlighted: is_highlighted && !was_highlighted,
        }
    }
}

/// Vote service.
#[derive(Clone)]
pub struct VoteService {
    db: Arc<DatabaseConnection>,
    vote_repo: VoteRepository,
    queue: QueueService,
    config: ModerationConfig,
    id_gen: IdGenerator,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        vote_repo: VoteRepository,
        queue: QueueService,
        config: ModerationConfig,
    ) -> Self {
        Self {
            db,
            vote_repo,
            queue,
            config,
            id_gen: IdGenerator::new(),
        }
    }

    /// Toggle a user's vote on a post.
    ///
    /// A first vote records the mode; a second vote from the same user
    /// removes the vote regardless of the requested mode. Either way
    /// the vote sum and derived flags are recomputed in the same
    /// transaction, and edge-triggered moderation notifications are
    /// enqueued after commit.
    pub async fn toggle(
        &self,
        post_id: &str,
        user_id: &str,
        mode: VoteMode,
    ) -> AppResult<(VoteOutcome, FlagUpdate)> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Lock the post row: concurrent toggles on the same post must
        // serialize so the flags reflect one final sum.
        let post = post::Entity::find_by_id(post_id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::PostNotFound(post_id.to_string()))?;

        let existing = vote::Entity::find()
            .filter(vote::Column::PostId.eq(post_id))
            .filter(vote::Column::UserId.eq(user_id))
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let outcome = match existing {
            Some(vote) => {
                vote.delete(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                VoteOutcome::Removed
            }
            None => {
                let model = vote::ActiveModel {
                    id: Set(self.id_gen.generate()),
                    post_id: Set(post_id.to_string()),
                    user_id: Set(user_id.to_string()),
                    mode: Set(mode.value()),
                    created_at: Set(chrono::Utc::now().into()),
                };
                model
                    .insert(&txn)
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                VoteOutcome::Recorded
            }
        };

        let vote_sum = Self::sum_in_txn(&txn, post_id).await?;
        let update = FlagUpdate::compute(vote_sum, post.is_flagged, post.is_highlighted, &self.config);

        if update.is_flagged != post.is_flagged || update.is_highlighted != post.is_highlighted {
            let active = post::ActiveModel {
                id: Set(post_id.to_string()),
                is_flagged: Set(update.is_flagged),
                is_highlighted: Set(update.is_highlighted),
                ..Default::default()
            };
            active
                .update(&txn)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        }

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(
            post_id = %post_id,
            user_id = %user_id,
            vote_sum = update.vote_sum,
            outcome = ?outcome,
            "Vote toggled"
        );

        if update.newly_flagged {
            self.queue
                .enqueue_notification(NotificationEvent::new(post_id, NotificationKind::Flagged))
                .await?;
        }
        if update.newly_highlighted {
            self.queue
                .enqueue_notification(NotificationEvent::new(
                    post_id,
                    NotificationKind::Highlighted,
                ))
                .await?;
        }

        Ok((outcome, update))
    }

    /// The vote a user has cast on a post, for UI state.
    pub async fn find_vote(&self, post_id: &str, user_id: &str) -> AppResult<Option<vote::Model>> {
        self.vote_repo.find_by_post_and_user(post_id, user_id).await
    }

    /// Votes a user has cast on the given posts, for rendered lists.
    pub async fn find_votes_for_posts(
        &self,
        user_id: &str,
        post_ids: &[String],
    ) -> AppResult<Vec<vote::Model>> {
        self.vote_repo
            .find_by_user_for_posts(user_id, post_ids)
            .await
    }

    async fn sum_in_txn(txn: &DatabaseTransaction, post_id: &str) -> AppResult<i64> {
        #[derive(FromQueryResult)]
        struct SumResult {
            total: Option<i64>,
        }

        let result = vote::Entity::find()
            .filter(vote::Column::PostId.eq(post_id))
            .select_only()
            .column_as(vote::Column::Mode.sum(), "total")
            .into_model::<SumResult>()
            .one(txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.and_then(|r| r.total).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ModerationConfig {
        ModerationConfig::default()
    }

    #[test]
    fn test_flag_threshold_equalities() {
        for sum in -6..=6 {
            let update = FlagUpdate::compute(sum, false, false, &config());
            assert_eq!(update.is_flagged, sum <= -3, "sum {sum}");
            assert_eq!(update.is_highlighted, sum >= 3, "sum {sum}");
        }
    }

    #[test]
    fn test_flagged_fires_once_per_transition() {
        let cfg = config();

        // -2 -> -3: crosses the threshold, fires.
        let first = FlagUpdate::compute(-3, false, false, &cfg);
        assert!(first.newly_flagged);

        // -3 -> -4: still flagged, must not fire again.
        let second = FlagUpdate::compute(-4, first.is_flagged, first.is_highlighted, &cfg);
        assert!(second.is_flagged);
        assert!(!second.newly_flagged);
    }

    #[test]
    fn test_unflag_and_reflag_fires_again() {
        let cfg = config();

        let flagged = FlagUpdate::compute(-3, false, false, &cfg);
        assert!(flagged.newly_flagged);

        let cleared = FlagUpdate::compute(-2, flagged.is_flagged, false, &cfg);
        assert!(!cleared.is_flagged);
        assert!(!cleared.newly_flagged);

        let reflagged = FlagUpdate::compute(-3, cleared.is_flagged, false, &cfg);
        assert!(reflagged.newly_flagged);
    }

    #[test]
    fn test_highlight_edge() {
        let cfg = config();
        let update = FlagUpdate::compute(3, false, false, &cfg);
        assert!(update.newly_highlighted);
        assert!(!update.newly_flagged);
    }

    #[test]
    fn test_zero_sum_clears_both() {
        let cfg = config();
        let update = FlagUpdate::compute(0, true, true, &cfg);
        assert!(!update.is_flagged);
        assert!(!update.is_highlighted);
    }

    #[test]
    fn test_mode_values() {
        assert_eq!(VoteMode::Up.value(), 1);
        assert_eq!(VoteMode::Down.value(), -1);
        assert_eq!(VoteMode::parse("up"), Some(VoteMode::Up));
        assert_eq!(VoteMode::parse("down"), Some(VoteMode::Down));
        assert_eq!(VoteMode::parse("sideways"), None);
    }
}
