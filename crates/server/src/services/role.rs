use tembea_core::domain::ids::{HomebaseId, RoleId, UserId};
use tembea_core::domain::role::{Role, RoleAssignment, UserRole};
use tembea_core::errors::ServiceError;

use super::Repositories;

const ROLE_ALREADY_ASSIGNED: &str = "This Role is already assigned to this user";

#[derive(Clone)]
pub struct RoleService {
    repos: Repositories,
}

impl RoleService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn create_new_role(&self, name: &str) -> Result<Role, ServiceError> {
        let (role, created) = self.create_or_find_role(name).await?;
        if !created {
            return Err(ServiceError::conflict("Role already exists"));
        }
        Ok(role)
    }

    pub async fn get_roles(&self) -> Result<Vec<Role>, ServiceError> {
        let roles = self.repos.roles.list().await?;
        if roles.is_empty() {
            return Err(ServiceError::not_found("No Existing Roles"));
        }
        Ok(roles)
    }

    pub async fn get_user_roles(&self, email: &str) -> Result<Vec<RoleAssignment>, ServiceError> {
        let user = self
            .repos
            .users
            .find_by_email(email.trim())
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;
        let roles = self.find_user_roles(user.id).await?;
        if roles.is_empty() {
            return Err(ServiceError::not_found("User has no role"));
        }
        Ok(roles)
    }

    pub async fn get_role(&self, name: &str) -> Result<Role, ServiceError> {
        self.repos
            .roles
            .find_by_name(name.trim())
            .await?
            .ok_or_else(|| ServiceError::not_found("Role not found"))
    }

    pub async fn create_user_role(
        &self,
        email: &str,
        role_name: &str,
        homebase_id: Option<HomebaseId>,
    ) -> Result<UserRole, ServiceError> {
        let user = self
            .repos
            .users
            .find_by_email(email.trim())
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found"))?;
        let role = self.get_role(role_name).await?;

        let (assigned, created) = self
            .find_or_create_user_role(user.id, role.id, homebase_id)
            .await?;
        if !created {
            return Err(ServiceError::conflict(ROLE_ALREADY_ASSIGNED));
        }
        Ok(assigned)
    }

    /// The role and whether it was created.
    pub async fn create_or_find_role(&self, name: &str) -> Result<(Role, bool), ServiceError> {
        let name = name.trim();
        if let Some(role) = self.repos.roles.find_by_name(name).await? {
            return Ok((role, false));
        }
        Ok((self.repos.roles.create(name).await?, true))
    }

    pub async fn find_user_roles(
        &self,
        user_id: UserId,
    ) -> Result<Vec<RoleAssignment>, ServiceError> {
        Ok(self.repos.roles.roles_for_user(user_id).await?)
    }

    pub async fn find_or_create_user_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        homebase_id: Option<HomebaseId>,
    ) -> Result<(UserRole, bool), ServiceError> {
        let roles = &self.repos.roles;
        if let Some(existing) = roles.find_user_role(user_id, role_id, homebase_id).await? {
            return Ok((existing, false));
        }
        let assignment = UserRole { user_id, role_id, homebase_id };
        match roles.create_user_role(assignment).await {
            Ok(created) => Ok((created, true)),
            Err(error) if error.is_unique_violation() => {
                let existing = roles.find_user_role(user_id, role_id, homebase_id).await?;
                existing
                    .map(|existing| (existing, false))
                    .ok_or_else(|| ServiceError::conflict(ROLE_ALREADY_ASSIGNED))
            }
            Err(error) => Err(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RoleService;
    use crate::services::test_support::{setup, user};

    #[tokio::test]
    async fn roles_are_unique_by_name() {
        let (_pool, repos) = setup().await;
        let service = RoleService::new(repos);

        assert!(service.get_roles().await.expect_err("empty").is_not_found());
        service.create_new_role("Admin").await.expect("create");

        let error = service.create_new_role("Admin").await.expect_err("duplicate");
        assert_eq!(error.to_string(), "Role already exists");
        assert_eq!(service.get_roles().await.expect("roles").len(), 1);
    }

    #[tokio::test]
    async fn assigning_the_same_role_twice_conflicts() {
        let (_pool, repos) = setup().await;
        user(&repos, "UADMIN", "admin@andela.com").await;
        let service = RoleService::new(repos);
        service.create_new_role("Admin").await.expect("role");

        let error = service.get_user_roles("admin@andela.com").await.expect_err("no roles");
        assert_eq!(error.to_string(), "User has no role");

        service.create_user_role("admin@andela.com", "Admin", None).await.expect("assign");
        let error = service
            .create_user_role("admin@andela.com", "Admin", None)
            .await
            .expect_err("again");
        assert_eq!(error.to_string(), "This Role is already assigned to this user");

        let roles = service.get_user_roles("admin@andela.com").await.expect("roles");
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].role.name, "Admin");
    }

    #[tokio::test]
    async fn user_roles_are_found_before_being_created() {
        let (_pool, repos) = setup().await;
        let admin = user(&repos, "UADMIN", "admin@andela.com").await;
        let service = RoleService::new(repos);
        let role = service.create_new_role("Admin").await.expect("role");

        let (first, created) = service
            .find_or_create_user_role(admin.id, role.id, None)
            .await
            .expect("create");
        assert!(created);
        let (second, created) = service
            .find_or_create_user_role(admin.id, role.id, None)
            .await
            .expect("find");
        assert!(!created);
        assert_eq!(first, second);
        assert_eq!(service.find_user_roles(admin.id).await.expect("roles").len(), 1);
    }

    #[tokio::test]
    async fn unknown_role_is_not_found() {
        let (_pool, repos) = setup().await;
        user(&repos, "UADMIN", "admin@andela.com").await;
        let service = RoleService::new(repos);

        let error = service
            .create_user_role("admin@andela.com", "Wizard", None)
            .await
            .expect_err("missing");

        assert_eq!(error.to_string(), "Role not found");
    }
}
