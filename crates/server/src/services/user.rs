use tembea_core::domain::ids::{HomebaseId, UserId};
use tembea_core::domain::user::{NewUser, SlackProfile};
use tembea_core::errors::ServiceError;
use tembea_core::User;
use tembea_slack::SlackApiError;

use super::{Repositories, TeamDetailsService};

pub const USER_NOT_FOUND: &str = "User not found";

/// Fields an API client may change on a user record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub new_name: Option<String>,
    pub new_email: Option<String>,
    pub new_phone_no: Option<String>,
}

#[derive(Clone)]
pub struct UserService {
    repos: Repositories,
    teams: TeamDetailsService,
}

impl UserService {
    pub fn new(repos: Repositories, teams: TeamDetailsService) -> Self {
        Self { repos, teams }
    }

    pub async fn get_user(&self, email: &str) -> Result<User, ServiceError> {
        self.repos
            .users
            .find_by_email(email.trim())
            .await?
            .ok_or_else(|| ServiceError::not_found(USER_NOT_FOUND))
    }

    pub async fn get_user_by_id(&self, id: UserId) -> Result<User, ServiceError> {
        self.repos.user(id).await
    }

    pub async fn get_user_by_slack_id(&self, slack_id: &str) -> Result<User, ServiceError> {
        self.repos
            .users
            .find_by_slack_id(slack_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(USER_NOT_FOUND))
    }

    pub async fn create_new_user(&self, profile: SlackProfile) -> Result<User, ServiceError> {
        Ok(self.repos.users.create(NewUser::from(profile)).await?)
    }

    /// Looks a user up in the Slack workspace at `slack_url` by email.
    pub async fn get_user_info(
        &self,
        slack_url: &str,
        email: &str,
    ) -> Result<SlackProfile, ServiceError> {
        let team = self.teams.get_team_details_by_team_url(slack_url).await?;
        self.teams
            .api()
            .lookup_by_email(&team.bot_token, email.trim())
            .await
            .map_err(|lookup_error| match lookup_error {
                SlackApiError::Api { code, .. } if code == "users_not_found" => {
                    ServiceError::not_found("User not found on Slack")
                }
                other => other.into(),
            })
    }

    /// Creates the user from their Slack profile unless the email is already known.
    /// Returns the user and whether it was created.
    pub async fn new_user_record(
        &self,
        slack_url: &str,
        email: &str,
    ) -> Result<(User, bool), ServiceError> {
        if let Some(user) = self.repos.users.find_by_email(email.trim()).await? {
            return Ok((user, false));
        }
        let profile = self.get_user_info(slack_url, email).await?;
        Ok((self.create_new_user(profile).await?, true))
    }

    /// Merges the changes into the stored user. A new email must exist in the Slack
    /// workspace, which also refreshes the Slack id.
    pub async fn update_record(
        &self,
        slack_url: &str,
        email: &str,
        changes: UserChanges,
    ) -> Result<User, ServiceError> {
        let lookup_email = changes.new_email.as_deref().unwrap_or(email);
        let profile = self.get_user_info(slack_url, lookup_email).await?;
        let mut user = self.get_user(email).await?;

        user.slack_id = profile.id;
        if let Some(name) = changes.new_name.filter(|name| !name.trim().is_empty()) {
            user.name = name.trim().to_string();
        }
        let new_email = changes
            .new_email
            .filter(|new_email| !new_email.trim().is_empty());
        if let Some(new_email) = new_email {
            user.email = new_email.trim().to_string();
        }
        if let Some(phone) = changes.new_phone_no.filter(|phone| !phone.trim().is_empty()) {
            user.phone_no = Some(phone.trim().to_string());
        }

        self.repos.users.update(&user).await?;
        Ok(user)
    }

    pub async fn update_default_homebase(
        &self,
        slack_id: &str,
        homebase_id: HomebaseId,
    ) -> Result<User, ServiceError> {
        self.repos
            .locations
            .find_homebase(homebase_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Homebase not found"))?;
        let mut user = self.get_user_by_slack_id(slack_id).await?;
        user.default_homebase_id = Some(homebase_id);
        self.repos.users.update(&user).await?;
        Ok(user)
    }

    /// Finds the user, creating them from their Slack profile on first contact.
    pub async fn find_or_create_by_slack_id(
        &self,
        slack_id: &str,
        team_id: Option<&str>,
    ) -> Result<User, ServiceError> {
        if let Some(user) = self.repos.users.find_by_slack_id(slack_id).await? {
            return Ok(user);
        }
        let token = self.teams.token_for(team_id).await;
        let profile = self.teams.api().user_info(&token, slack_id).await?;
        if let Some(mut user) = self.repos.users.find_by_email(&profile.email).await? {
            user.slack_id = profile.id;
            self.repos.users.update(&user).await?;
            return Ok(user);
        }
        self.create_new_user(profile).await
    }
}
