use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use uuid::Uuid;

use super::{RepoResult, Repository, RepositoryError};
use crate::models::{
    Comment, Invite, InviteUpdate, Metrics, NewInvite, NewNotification, NewUser, Notification,
    SearchQuery, User, VoteType,
};

const USER_COLUMNS: &str = "id, username, email, role, is_blocked, created_at";
const INVITE_COLUMNS: &str = "id, user_id, title, company, location, description, image_url, \
                              upvotes, downvotes, created_at, updated_at";

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Queries are built at
/// runtime with bound parameters so the crate compiles without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps unique-index violations onto `RepositoryError::Duplicate`.
fn map_unique(err: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some("users_email_key") => "email",
                _ => "username",
            };
            return RepositoryError::Duplicate(field);
        }
    }
    RepositoryError::Database(err)
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let sql = format!(
            "INSERT INTO users (id, username, email, role) VALUES ($1, $2, $3, $4) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(user.username)
            .bind(user.email)
            .bind(user.role)
            .fetch_one(&self.pool)
            .await
            .map_err(map_unique)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(username) = LOWER($1)");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self) -> RepoResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
        Ok(sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?)
    }

    async fn set_user_blocked(&self, id: Uuid, blocked: bool) -> RepoResult<Option<User>> {
        let sql =
            format!("UPDATE users SET is_blocked = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(blocked)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_invite(
        &self,
        user_id: Uuid,
        invite: NewInvite,
        image_url: Option<String>,
    ) -> RepoResult<Invite> {
        let sql = format!(
            "INSERT INTO invites (id, user_id, title, company, location, description, image_url) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {INVITE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Invite>(&sql)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(invite.title)
            .bind(invite.company)
            .bind(invite.location)
            .bind(invite.description)
            .bind(image_url)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_invites(&self, limit: i64, offset: i64) -> RepoResult<Vec<Invite>> {
        let sql = format!(
            "SELECT {INVITE_COLUMNS} FROM invites ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );
        Ok(sqlx::query_as::<_, Invite>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?)
    }

    /// search_invites
    ///
    /// Builds the filter with `QueryBuilder` so user input is only ever bound.
    async fn search_invites(&self, query: &SearchQuery) -> RepoResult<Vec<Invite>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {INVITE_COLUMNS} FROM invites WHERE TRUE"));

        if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = format!("%{q}%");
            builder.push(" AND (title ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR company ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR description ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }

        if let Some(location) = query
            .location
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
        {
            builder.push(" AND location ILIKE ");
            builder.push_bind(format!("%{location}%"));
        }

        builder.push(" ORDER BY created_at DESC");

        Ok(builder
            .build_query_as::<Invite>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_invite(&self, id: Uuid) -> RepoResult<Option<Invite>> {
        let sql = format!("SELECT {INVITE_COLUMNS} FROM invites WHERE id = $1");
        Ok(sqlx::query_as::<_, Invite>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_invites_by_user(&self, user_id: Uuid) -> RepoResult<Vec<Invite>> {
        let sql = format!(
            "SELECT {INVITE_COLUMNS} FROM invites WHERE user_id = $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Invite>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// update_invite
    ///
    /// `COALESCE` keeps the stored value for every field left as `None`.
    async fn update_invite(&self, id: Uuid, update: InviteUpdate) -> RepoResult<Option<Invite>> {
        let sql = format!(
            "UPDATE invites \
             SET title = COALESCE($2, title), \
                 company = COALESCE($3, company), \
                 location = COALESCE($4, location), \
                 description = COALESCE($5, description), \
                 updated_at = NOW() \
             WHERE id = $1 RETURNING {INVITE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Invite>(&sql)
            .bind(id)
            .bind(update.title)
            .bind(update.company)
            .bind(update.location)
            .bind(update.description)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_invite(&self, id: Uuid) -> RepoResult<bool> {
        // Comments cascade through the foreign key.
        let result = sqlx::query("DELETE FROM invites WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn vote_invite(&self, id: Uuid, vote: VoteType) -> RepoResult<Option<Invite>> {
        let column = match vote {
            VoteType::Upvote => "upvotes",
            VoteType::Downvote => "downvotes",
        };
        let sql = format!(
            "UPDATE invites SET {column} = {column} + 1 WHERE id = $1 RETURNING {INVITE_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Invite>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_comments(&self, invite_id: Uuid) -> RepoResult<Vec<Comment>> {
        Ok(sqlx::query_as::<_, Comment>(
            r#"
            SELECT c.id, c.invite_id, c.user_id, u.username, c.comment, c.created_at
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.invite_id = $1
            ORDER BY c.created_at ASC
            "#,
        )
        .bind(invite_id)
        .fetch_all(&self.pool)
        .await?)
    }

    /// create_comment
    ///
    /// Inserts and joins the author's username in one round trip.
    async fn create_comment(
        &self,
        invite_id: Uuid,
        user_id: Uuid,
        comment: String,
    ) -> RepoResult<Comment> {
        Ok(sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (id, invite_id, user_id, comment)
                VALUES ($1, $2, $3, $4)
                RETURNING id, invite_id, user_id, comment, created_at
            )
            SELECT i.id, i.invite_id, i.user_id, u.username, i.comment, i.created_at
            FROM inserted i JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(invite_id)
        .bind(user_id)
        .bind(comment)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list_notifications(&self, user_id: Uuid) -> RepoResult<Vec<Notification>> {
        Ok(sqlx::query_as::<_, Notification>(
            "SELECT id, user_id, invite_id, message, is_read, created_at \
             FROM notifications WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn create_notification(
        &self,
        notification: NewNotification,
    ) -> RepoResult<Notification> {
        Ok(sqlx::query_as::<_, Notification>(
            "INSERT INTO notifications (id, user_id, invite_id, message) VALUES ($1, $2, $3, $4) \
             RETURNING id, user_id, invite_id, message, is_read, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(notification.user_id)
        .bind(notification.invite_id)
        .bind(notification.message)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn get_metrics(&self) -> RepoResult<Metrics> {
        let (users, invites, comments) = sqlx::query_as::<_, (i64, i64, i64)>(
            "SELECT (SELECT COUNT(*) FROM users), (SELECT COUNT(*) FROM invites), \
             (SELECT COUNT(*) FROM comments)",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(Metrics {
            users,
            invites,
            comments,
        })
    }
}
