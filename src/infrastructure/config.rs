use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub seed_demo: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://little_lemon.db?mode=rwc".to_string(),
            port: 8000,
            cors_allowed_origins: Vec::new(),
            jwt_secret: "secret".to_string(),
            token_ttl_hours: 24,
            seed_demo: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if cfg!(debug_assertions) => defaults.jwt_secret,
            _ => return Err("JWT_SECRET environment variable must be set in production".into()),
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .ok()
                .map(|s| {
                    s.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            jwt_secret,
            token_ttl_hours: env::var("TOKEN_TTL_HOURS")
                .ok()
                .and_then(|h| h.parse().ok())
                .filter(|h: &i64| *h > 0)
                .unwrap_or(defaults.token_ttl_hours),
            seed_demo: env::var("SEED_DEMO").is_ok(),
        })
    }
}
