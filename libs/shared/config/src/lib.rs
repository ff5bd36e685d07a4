use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_access_token: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            // Optional: requests fall back to the anon key when no user session is present
            supabase_access_token: env::var("SUPABASE_ACCESS_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }

    /// Token sent as the bearer credential on every request.
    pub fn bearer_token(&self) -> &str {
        self.supabase_access_token
            .as_deref()
            .unwrap_or(&self.supabase_anon_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>) -> AppConfig {
        AppConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "anon".to_string(),
            supabase_access_token: token.map(str::to_string),
        }
    }

    #[test]
    fn test_bearer_token_prefers_access_token() {
        assert_eq!(config(Some("user-jwt")).bearer_token(), "user-jwt");
        assert_eq!(config(None).bearer_token(), "anon");
    }

    #[test]
    fn test_is_configured_requires_url_and_key() {
        assert!(config(None).is_configured());

        let mut missing = config(None);
        missing.supabase_url.clear();
        assert!(!missing.is_configured());
    }
}
