use serde::Deserialize;

/// Signing material for the two token classes. Secrets are deliberately
/// independent: leaking one cannot forge tokens of the other class.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub sender: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub site_name: String,
    pub site_url: String,
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    /// Built once at startup and handed out via `Arc` — components never read
    /// the environment themselves.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            access_secret: std::env::var("JWT_ACCESS_SECRET")?,
            refresh_secret: std::env::var("JWT_REFRESH_SECRET")?,
            access_ttl_secs: env_i64("JWT_ACCESS_TTL_SECS", 15 * 60),
            refresh_ttl_secs: env_i64("JWT_REFRESH_TTL_SECS", 24 * 60 * 60),
        };
        let smtp = SmtpConfig {
            host: std::env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".into()),
            port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(587),
            user: std::env::var("SMTP_USER").unwrap_or_default(),
            pass: std::env::var("SMTP_PASS").unwrap_or_default(),
            sender: std::env::var("SMTP_SENDER").unwrap_or_else(|_| "no-reply@localhost".into()),
        };
        Ok(Self {
            database_url,
            jwt,
            smtp,
            site_name: std::env::var("SITE_NAME").unwrap_or_else(|_| "userhub".into()),
            site_url: std::env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:8080".into()),
        })
    }
}
