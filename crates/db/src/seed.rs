use serde::Serialize;
use tracing::info;

use tembea_core::config::SuperAdmin;
use tembea_core::domain::role::{UserRole, SUPER_ADMIN_ROLE};
use tembea_core::domain::user::NewUser;
use tembea_core::names::user_name_from_email;

use crate::connection::DbPool;
use crate::repositories::{
    RepositoryError, RoleRepository, SqlRoleRepository, SqlUserRepository, UserRepository,
};

/// What `ensure_super_admins` changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AdminSeedReport {
    pub users_created: usize,
    pub roles_assigned: usize,
    pub role_created: bool,
}

/// Makes sure every configured super admin exists and holds the `Super Admin` role.
///
/// Users are matched by email first, then by Slack id. Re-running is a no-op.
pub async fn ensure_super_admins(
    pool: &DbPool,
    admins: &[SuperAdmin],
) -> Result<AdminSeedReport, RepositoryError> {
    let users = SqlUserRepository::new(pool.clone());
    let roles = SqlRoleRepository::new(pool.clone());
    let mut report = AdminSeedReport::default();

    if admins.is_empty() {
        return Ok(report);
    }

    let role = match roles.find_by_name(SUPER_ADMIN_ROLE).await? {
        Some(role) => role,
        None => {
            report.role_created = true;
            roles.create(SUPER_ADMIN_ROLE).await?
        }
    };

    for admin in admins {
        let existing = match users.find_by_email(&admin.email).await? {
            Some(user) => Some(user),
            None => users.find_by_slack_id(&admin.slack_id).await?,
        };
        let user = match existing {
            Some(user) => user,
            None => {
                report.users_created += 1;
                users
                    .create(NewUser {
                        name: user_name_from_email(&admin.email),
                        slack_id: admin.slack_id.clone(),
                        email: admin.email.clone(),
                        phone_no: None,
                    })
                    .await?
            }
        };

        if roles.find_user_role(user.id, role.id, None).await?.is_none() {
            let assignment = UserRole { user_id: user.id, role_id: role.id, homebase_id: None };
            roles.create_user_role(assignment).await?;
            report.roles_assigned += 1;
        }
    }

    info!(
        event_name = "db.seed.super_admins",
        users_created = report.users_created,
        roles_assigned = report.roles_assigned,
        role_created = report.role_created,
        "super admins ensured"
    );

    Ok(report)
}
