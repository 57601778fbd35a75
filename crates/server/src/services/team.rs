use std::sync::Arc;

use secrecy::SecretString;
use tracing::warn;

use tembea_core::domain::team::TeamDetails;
use tembea_core::errors::ServiceError;
use tembea_slack::{Notifier, SlackWebApi};

use super::Repositories;

/// Slack workspace installations and the bot tokens that go with them.
#[derive(Clone)]
pub struct TeamDetailsService {
    repos: Repositories,
    api: Arc<dyn SlackWebApi>,
    default_token: SecretString,
}

impl TeamDetailsService {
    pub fn new(
        repos: Repositories,
        api: Arc<dyn SlackWebApi>,
        default_token: SecretString,
    ) -> Self {
        Self { repos, api, default_token }
    }

    pub fn api(&self) -> &Arc<dyn SlackWebApi> {
        &self.api
    }

    pub async fn save_team_details(&self, details: &TeamDetails) -> Result<(), ServiceError> {
        self.repos.teams.save(details).await?;
        Ok(())
    }

    pub async fn get_team_details(&self, team_id: &str) -> Result<TeamDetails, ServiceError> {
        self.repos
            .teams
            .find_by_team_id(team_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Team details not found"))
    }

    pub async fn get_team_details_bot_oauth_token(
        &self,
        team_id: &str,
    ) -> Result<SecretString, ServiceError> {
        Ok(self.get_team_details(team_id).await?.bot_token)
    }

    pub async fn get_team_details_by_team_url(
        &self,
        url: &str,
    ) -> Result<TeamDetails, ServiceError> {
        self.repos
            .teams
            .find_by_team_url(url)
            .await?
            .ok_or_else(|| ServiceError::not_found("Team details not found"))
    }

    /// The team's bot token, or the configured one for teams that never installed.
    pub async fn token_for(&self, team_id: Option<&str>) -> SecretString {
        let Some(team_id) = team_id.filter(|team_id| !team_id.is_empty()) else {
            return self.default_token.clone();
        };
        match self.get_team_details_bot_oauth_token(team_id).await {
            Ok(token) => token,
            Err(lookup_error) if lookup_error.is_not_found() => self.default_token.clone(),
            Err(lookup_error) => {
                warn!(
                    event_name = "slack.team.token_lookup_failed",
                    team_id,
                    error = %lookup_error,
                    "falling back to the configured bot token"
                );
                self.default_token.clone()
            }
        }
    }

    pub async fn notifier_for(&self, team_id: Option<&str>) -> Notifier {
        Notifier::new(Arc::clone(&self.api), self.token_for(team_id).await)
    }

    pub fn default_notifier(&self) -> Notifier {
        Notifier::new(Arc::clone(&self.api), self.default_token.clone())
    }

    /// Operations channel of the team, when one was configured.
    pub async fn ops_channel(&self, team_id: Option<&str>) -> Option<String> {
        let team_id = team_id?;
        self.repos
            .teams
            .find_by_team_id(team_id)
            .await
            .ok()
            .flatten()
            .and_then(|team| team.ops_channel_id)
    }
}
