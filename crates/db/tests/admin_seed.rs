use tembea_core::config::SuperAdmin;
use tembea_db::repositories::{RoleRepository, SqlRoleRepository, SqlUserRepository, UserRepository};
use tembea_db::{connect_with_settings, ensure_super_admins, migrations, DbPool};

type SeedTestResult<T = ()> = Result<T, String>;

macro_rules! require {
    ($cond:expr) => {
        if !$cond {
            return Err(format!("assertion failed: `{}`", stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)*) => {
        if !$cond {
            return Err(format!($($arg)*));
        }
    };
}

macro_rules! require_eq {
    ($left:expr, $right:expr) => {
        if $left != $right {
            return Err(format!(
                "assertion failed: `left == right` (`{:?}` != `{:?}`)",
                $left,
                $right
            ));
        }
    };
}

async fn setup() -> SeedTestResult<DbPool> {
    let pool = connect_with_settings("sqlite::memory:", 1, 30)
        .await
        .map_err(|err| format!("connect failed: {err}"))?;
    migrations::run_pending(&pool).await.map_err(|err| format!("migrations failed: {err}"))?;
    Ok(pool)
}

fn admins() -> Vec<SuperAdmin> {
    vec![
        SuperAdmin { email: "tembea.devs@andela.com".to_string(), slack_id: "UADMIN".to_string() },
        SuperAdmin {
            email: "apprentice@andela.com".to_string(),
            slack_id: "UAPPRENTICE".to_string(),
        },
    ]
}

#[tokio::test]
async fn super_admins_are_created_with_derived_names() -> SeedTestResult {
    let pool = setup().await?;

    let report =
        ensure_super_admins(&pool, &admins()).await.map_err(|err| format!("seed failed: {err}"))?;

    require_eq!(report.users_created, 2);
    require_eq!(report.roles_assigned, 2);
    require!(report.role_created, "the Super Admin role should be created on first run");

    let users = SqlUserRepository::new(pool.clone());
    let admin = users
        .find_by_slack_id("UADMIN")
        .await
        .map_err(|err| err.to_string())?
        .ok_or_else(|| "admin user should exist".to_string())?;
    require_eq!(admin.name.as_str(), "Tembea Devs");

    let roles = SqlRoleRepository::new(pool)
        .roles_for_user(admin.id)
        .await
        .map_err(|err| err.to_string())?;
    require!(
        roles.iter().any(|assignment| assignment.role.name == "Super Admin"),
        "admin should hold the Super Admin role, got {roles:?}"
    );
    Ok(())
}

#[tokio::test]
async fn seeding_twice_changes_nothing() -> SeedTestResult {
    let pool = setup().await?;

    ensure_super_admins(&pool, &admins()).await.map_err(|err| format!("first run: {err}"))?;
    let second =
        ensure_super_admins(&pool, &admins()).await.map_err(|err| format!("second run: {err}"))?;

    require_eq!(second.users_created, 0);
    require_eq!(second.roles_assigned, 0);
    require!(!second.role_created, "role should be reused on the second run");
    Ok(())
}

#[tokio::test]
async fn existing_user_is_matched_by_email() -> SeedTestResult {
    let pool = setup().await?;
    let users = SqlUserRepository::new(pool.clone());
    users
        .create(tembea_core::domain::user::NewUser {
            name: "Already Here".to_string(),
            slack_id: "UOTHER".to_string(),
            email: "tembea.devs@andela.com".to_string(),
            phone_no: None,
        })
        .await
        .map_err(|err| err.to_string())?;

    let report = ensure_super_admins(&pool, &admins()[..1])
        .await
        .map_err(|err| format!("seed failed: {err}"))?;

    require_eq!(report.users_created, 0);
    require_eq!(report.roles_assigned, 1);
    Ok(())
}

#[tokio::test]
async fn no_configured_admins_is_a_no_op() -> SeedTestResult {
    let pool = setup().await?;
    let report = ensure_super_admins(&pool, &[]).await.map_err(|err| err.to_string())?;
    require_eq!(report, tembea_db::AdminSeedReport::default());
    Ok(())
}
