use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use sqlx::sqlite::SqliteRow;

use tembea_core::domain::team::{normalize_team_url, TeamDetails};

use super::{column, RepositoryError};
use crate::DbPool;

const TEAM_COLUMNS: &str =
    "team_id, team_name, bot_token, bot_id, user_id, team_url, webhook_config_url, ops_channel_id";

#[async_trait]
pub trait TeamDetailsRepository: Send + Sync {
    /// Inserts or replaces the installation for `team_id`.
    async fn save(&self, details: &TeamDetails) -> Result<(), RepositoryError>;
    async fn find_by_team_id(&self, team_id: &str) -> Result<Option<TeamDetails>, RepositoryError>;
    async fn find_by_team_url(&self, url: &str) -> Result<Option<TeamDetails>, RepositoryError>;
}

pub struct SqlTeamDetailsRepository {
    pool: DbPool,
}

impl SqlTeamDetailsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_team(row: &SqliteRow) -> Result<TeamDetails, RepositoryError> {
    let bot_token: String = column(row, "bot_token")?;
    Ok(TeamDetails {
        team_id: column(row, "team_id")?,
        team_name: column(row, "team_name")?,
        bot_token: SecretString::from(bot_token),
        bot_id: column(row, "bot_id")?,
        user_id: column(row, "user_id")?,
        team_url: column(row, "team_url")?,
        webhook_config_url: column(row, "webhook_config_url")?,
        ops_channel_id: column(row, "ops_channel_id")?,
    })
}

#[async_trait]
impl TeamDetailsRepository for SqlTeamDetailsRepository {
    async fn save(&self, details: &TeamDetails) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO team_details
                 (team_id, team_name, bot_token, bot_id, user_id, team_url,
                  webhook_config_url, ops_channel_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(team_id) DO UPDATE SET
                 team_name = excluded.team_name,
                 bot_token = excluded.bot_token,
                 bot_id = excluded.bot_id,
                 user_id = excluded.user_id,
                 team_url = excluded.team_url,
                 webhook_config_url = excluded.webhook_config_url,
                 ops_channel_id = excluded.ops_channel_id",
        )
        .bind(&details.team_id)
        .bind(&details.team_name)
        .bind(details.bot_token.expose_secret())
        .bind(&details.bot_id)
        .bind(&details.user_id)
        .bind(normalize_team_url(&details.team_url))
        .bind(&details.webhook_config_url)
        .bind(&details.ops_channel_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_team_id(&self, team_id: &str) -> Result<Option<TeamDetails>, RepositoryError> {
        let sql = format!("SELECT {TEAM_COLUMNS} FROM team_details WHERE team_id = ?");
        let row = sqlx::query(&sql).bind(team_id).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_team).transpose()
    }

    async fn find_by_team_url(&self, url: &str) -> Result<Option<TeamDetails>, RepositoryError> {
        let sql = format!("SELECT {TEAM_COLUMNS} FROM team_details WHERE team_url = ?");
        let row = sqlx::query(&sql)
            .bind(normalize_team_url(url))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_team).transpose()
    }
}
