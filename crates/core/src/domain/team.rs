use secrecy::SecretString;

/// Slack workspace installation: one bot token per team.
#[derive(Clone, Debug)]
pub struct TeamDetails {
    pub team_id: String,
    pub team_name: String,
    pub bot_token: SecretString,
    pub bot_id: String,
    pub user_id: String,
    pub team_url: String,
    pub webhook_config_url: Option<String>,
    pub ops_channel_id: Option<String>,
}

/// `https://andela-tembea.slack.com/` and `andela-tembea.slack.com` name the same team.
pub fn normalize_team_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme.strip_prefix("www.").unwrap_or(without_scheme).to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::normalize_team_url;

    #[test]
    fn team_urls_compare_without_scheme_or_trailing_slash() {
        assert_eq!(normalize_team_url("https://Tembea.slack.com/"), "tembea.slack.com");
        assert_eq!(normalize_team_url("tembea.slack.com"), "tembea.slack.com");
    }
}
