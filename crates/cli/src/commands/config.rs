use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use tembea_core::config::AppConfig;
use toml::Value;

use crate::commands::{load_config, CommandResult};

/// One displayed setting and the variables that can set it, preferred first.
struct Setting {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> CommandResult {
    let config = match load_config("config") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    CommandResult { exit_code: 0, output: render(&config) }
}

pub fn render(config: &AppConfig) -> String {
    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for setting in settings(config) {
        let source = field_source(
            setting.key,
            setting.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(format!("- {} = {} (source: {source})", setting.key, setting.value));
    }
    lines.join("\n")
}

fn settings(config: &AppConfig) -> Vec<Setting> {
    let optional = |value: &Option<String>| value.clone().unwrap_or_else(|| "<unset>".to_string());
    let signing_secret = if config.slack.signing_secret.expose_secret().is_empty() {
        "<empty>"
    } else {
        "<redacted>"
    };

    vec![
        Setting {
            key: "database.url",
            value: config.database.url.clone(),
            env_keys: &["TEMBEA_DATABASE_URL", "DATABASE_URL"],
        },
        Setting {
            key: "database.max_connections",
            value: config.database.max_connections.to_string(),
            env_keys: &["TEMBEA_DATABASE_MAX_CONNECTIONS"],
        },
        Setting {
            key: "database.timeout_secs",
            value: config.database.timeout_secs.to_string(),
            env_keys: &["TEMBEA_DATABASE_TIMEOUT_SECS"],
        },
        Setting {
            key: "slack.bot_token",
            value: redact_token(config.slack.bot_token.expose_secret()),
            env_keys: &["TEMBEA_SLACK_BOT_TOKEN"],
        },
        Setting {
            key: "slack.signing_secret",
            value: signing_secret.to_string(),
            env_keys: &["TEMBEA_SLACK_SIGNING_SECRET"],
        },
        Setting {
            key: "slack.api_base_url",
            value: config.slack.api_base_url.clone(),
            env_keys: &["TEMBEA_SLACK_API_BASE_URL"],
        },
        Setting {
            key: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["TEMBEA_SERVER_BIND_ADDRESS"],
        },
        Setting {
            key: "server.port",
            value: config.server.port.to_string(),
            env_keys: &["TEMBEA_SERVER_PORT", "PORT"],
        },
        Setting {
            key: "cache.ttl_secs",
            value: config.cache.ttl_secs.to_string(),
            env_keys: &["TEMBEA_CACHE_TTL_SECS"],
        },
        Setting {
            key: "jobs.reminder_lead_minutes",
            value: config.jobs.reminder_lead_minutes.to_string(),
            env_keys: &["TEMBEA_JOBS_REMINDER_LEAD_MINUTES"],
        },
        Setting {
            key: "jobs.completion_prompt_hours",
            value: config.jobs.completion_prompt_hours.to_string(),
            env_keys: &["TEMBEA_JOBS_COMPLETION_PROMPT_HOURS"],
        },
        Setting {
            key: "admin.super_admin_email",
            value: optional(&config.admin.super_admin_email),
            env_keys: &["TEMBEA_ADMIN_SUPER_ADMIN_EMAIL", "SUPER_ADMIN_EMAIL"],
        },
        Setting {
            key: "admin.super_admin_slack_id",
            value: optional(&config.admin.super_admin_slack_id),
            env_keys: &["TEMBEA_ADMIN_SUPER_ADMIN_SLACK_ID", "SUPER_ADMIN_SLACK_ID"],
        },
        Setting {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["TEMBEA_LOGGING_LEVEL", "TEMBEA_LOG_LEVEL"],
        },
        Setting {
            key: "logging.format",
            value: format!("{:?}", config.logging.format).to_ascii_lowercase(),
            env_keys: &["TEMBEA_LOGGING_FORMAT", "TEMBEA_LOG_FORMAT"],
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("tembea.toml"), PathBuf::from("config/tembea.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_token};

    #[test]
    fn tokens_keep_only_their_prefix() {
        assert_eq!(redact_token("xoxb-123-456"), "xoxb-***");
        assert_eq!(redact_token("  "), "<empty>");
        assert_eq!(redact_token("opaque"), "<redacted>");
    }

    #[test]
    fn dotted_keys_are_looked_up_in_the_file() {
        let doc: toml::Value = "[database]\nurl = \"sqlite://tembea.db\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "database.url"));
        assert!(!contains_path(&doc, "database.max_connections"));
        assert!(!contains_path(&doc, "slack.bot_token"));
    }
}
