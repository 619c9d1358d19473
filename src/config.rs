use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub from_email: String,
    /// Base URL embedded in action links, e.g. "http://localhost:3000".
    pub domain: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub session: SessionConfig,
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let session = SessionConfig {
            secret: std::env::var("TOKEN_SECRET")?,
            issuer: std::env::var("TOKEN_ISSUER").unwrap_or_else(|_| "authflow".into()),
            audience: std::env::var("TOKEN_AUDIENCE").unwrap_or_else(|_| "authflow-users".into()),
            ttl_minutes: std::env::var("SESSION_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
        };
        let mail = MailConfig {
            from_email: std::env::var("FROM_EMAIL").unwrap_or_else(|_| "no-reply@localhost".into()),
            domain: std::env::var("DOMAIN").unwrap_or_else(|_| "http://localhost:3000".into()),
        };
        Ok(Self {
            database_url,
            session,
            mail,
        })
    }
}
