use crate::models::{
    Goal, GoalDraft, GoalList, GoalStats, ProgressOutcome, RawGoalInput, StatusTransitionError,
};
use crate::repository::GoalRepository;
use chrono::NaiveDate;
use common::{Money, ValidationErrors};
use database::{Database, RepositoryError};
use tracing::instrument;

#[derive(Debug, thiserror::Error)]
pub enum GoalError {
    #[error("Invalid input: {0}")]
    Validation(ValidationErrors),
    #[error("{0}")]
    InvalidTransition(#[from] StatusTransitionError),
    #[error("Database error: {0}")]
    Infrastructure(String),
    #[error("Goal not found")]
    NotFound,
}

impl From<RepositoryError> for GoalError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => GoalError::NotFound,
            RepositoryError::Infrastructure(e) => GoalError::Infrastructure(e.to_string()),
            _ => GoalError::Infrastructure(err.to_string()),
        }
    }
}

pub struct GoalService;

impl GoalService {
    #[instrument(skip(db, raw))]
    pub async fn create_goal(
        db: &Database,
        user_id: i64,
        raw: RawGoalInput,
        today: NaiveDate,
    ) -> Result<Goal, GoalError> {
        let draft = GoalDraft::new(raw, today).map_err(GoalError::Validation)?;

        let mut uow = db.begin().await?;
        let mut repo = GoalRepository::new(uow.connection());

        let id = repo.create(user_id, &draft, chrono::Utc::now()).await?;
        let goal = repo.find_by_id(user_id, id).await?.ok_or(GoalError::NotFound)?;

        uow.commit().await?;

        tracing::info!(goal_id = id, target = %goal.target_amount, "Created goal");
        Ok(goal)
    }

    #[instrument(skip(db))]
    pub async fn get_goal(db: &Database, user_id: i64, id: i64) -> Result<Goal, GoalError> {
        let mut uow = db.begin().await?;
        let mut repo = GoalRepository::new(uow.connection());

        repo.find_by_id(user_id, id).await?.ok_or(GoalError::NotFound)
    }

    /// Deadline ascending, newest first within a deadline.
    #[instrument(skip(db))]
    pub async fn list_goals(db: &Database, user_id: i64) -> Result<Vec<Goal>, GoalError> {
        let mut uow = db.begin().await?;
        let mut repo = GoalRepository::new(uow.connection());

        Ok(repo.list(user_id).await?)
    }

    #[instrument(skip(db))]
    pub async fn goal_list(db: &Database, user_id: i64, today: NaiveDate) -> Result<GoalList, GoalError> {
        let goals = Self::list_goals(db, user_id).await?;
        Ok(GoalList::partition(goals, today))
    }

    #[instrument(skip(db))]
    pub async fn stats(db: &Database, user_id: i64, today: NaiveDate) -> Result<GoalStats, GoalError> {
        let goals = Self::list_goals(db, user_id).await?;
        Ok(GoalStats::from_goals(&goals, today))
    }

    #[instrument(skip(db, raw))]
    pub async fn update_goal(
        db: &Database,
        user_id: i64,
        id: i64,
        raw: RawGoalInput,
        today: NaiveDate,
    ) -> Result<Goal, GoalError> {
        let draft = GoalDraft::new(raw, today).map_err(GoalError::Validation)?;

        Self::modify(db, user_id, id, |goal| {
            goal.apply(draft);
            Ok(())
        })
        .await
    }

    #[instrument(skip(db))]
    pub async fn delete_goal(db: &Database, user_id: i64, id: i64) -> Result<(), GoalError> {
        let mut uow = db.begin().await?;
        let mut repo = GoalRepository::new(uow.connection());

        repo.delete(user_id, id).await?;

        uow.commit().await?;
        Ok(())
    }

    /// Adds a validated positive amount on top of the saved progress.
    #[instrument(skip(db))]
    pub async fn add_progress(
        db: &Database,
        user_id: i64,
        id: i64,
        amount: Money,
        today: NaiveDate,
    ) -> Result<ProgressOutcome, GoalError> {
        Self::change_progress(db, user_id, id, today, |goal| goal.add_progress(amount)).await
    }

    /// Replaces the saved progress.
    #[instrument(skip(db))]
    pub async fn set_progress(
        db: &Database,
        user_id: i64,
        id: i64,
        amount: Money,
        today: NaiveDate,
    ) -> Result<ProgressOutcome, GoalError> {
        Self::change_progress(db, user_id, id, today, |goal| goal.update_progress(amount)).await
    }

    #[instrument(skip(db))]
    pub async fn mark_complete(
        db: &Database,
        user_id: i64,
        id: i64,
        today: NaiveDate,
    ) -> Result<ProgressOutcome, GoalError> {
        Self::change_progress(db, user_id, id, today, Goal::mark_complete).await
    }

    #[instrument(skip(db))]
    pub async fn pause_goal(db: &Database, user_id: i64, id: i64) -> Result<Goal, GoalError> {
        Self::modify(db, user_id, id, |goal| Ok(goal.pause()?)).await
    }

    #[instrument(skip(db))]
    pub async fn resume_goal(db: &Database, user_id: i64, id: i64) -> Result<Goal, GoalError> {
        Self::modify(db, user_id, id, |goal| Ok(goal.resume()?)).await
    }

    async fn change_progress(
        db: &Database,
        user_id: i64,
        id: i64,
        today: NaiveDate,
        change: impl FnOnce(&mut Goal),
    ) -> Result<ProgressOutcome, GoalError> {
        let mut before = 0.0;
        let goal = Self::modify(db, user_id, id, |goal| {
            before = goal.progress_percentage();
            change(goal);
            Ok(())
        })
        .await?;

        let outcome = ProgressOutcome::new(before, goal, today);
        if outcome.just_completed {
            tracing::info!(goal_id = id, "Goal completed");
        }
        Ok(outcome)
    }

    /// Loads, mutates and saves one goal inside a single unit of work. Nothing
    /// is written when `change` fails.
    async fn modify(
        db: &Database,
        user_id: i64,
        id: i64,
        change: impl FnOnce(&mut Goal) -> Result<(), GoalError>,
    ) -> Result<Goal, GoalError> {
        let mut uow = db.begin().await?;
        let mut repo = GoalRepository::new(uow.connection());

        let mut goal = repo.find_by_id(user_id, id).await?.ok_or(GoalError::NotFound)?;
        change(&mut goal)?;
        repo.save(&goal).await?;

        uow.commit().await?;
        Ok(goal)
    }
}
