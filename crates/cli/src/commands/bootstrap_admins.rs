use tembea_db::ensure_super_admins;

use crate::commands::{load_config, with_migrated_pool, CommandResult, EXIT_CONFIG, EXIT_SEED};

/// Seeds the configured super admins, the same step the server runs at startup.
pub fn run() -> CommandResult {
    let config = match load_config("bootstrap-admins") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let admins = config.admin.super_admins();
    if admins.is_empty() {
        return CommandResult::failure(
            "bootstrap-admins",
            "config_validation",
            "no super admin configured: set SUPER_ADMIN_EMAIL and SUPER_ADMIN_SLACK_ID",
            EXIT_CONFIG,
        );
    }

    let seeded = with_migrated_pool("bootstrap-admins", &config, |pool| async move {
        ensure_super_admins(&pool, &admins)
            .await
            .map_err(|error| ("seed_execution", error.to_string(), EXIT_SEED))
    });

    match seeded {
        Ok(report) => CommandResult::success(
            "bootstrap-admins",
            format!(
                "super admins ready: {} user(s) created, {} role assignment(s) added{}",
                report.users_created,
                report.roles_assigned,
                if report.role_created { ", Super Admin role created" } else { "" }
            ),
        ),
        Err(failure) => failure,
    }
}
