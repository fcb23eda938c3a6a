use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// STARTTLS on a plain port (587) instead of implicit TLS (465).
    pub starttls: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Base used to build public object URLs; defaults to `{endpoint}/{bucket}`.
    pub public_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt: JwtConfig,
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
    pub mail_from: String,
    pub support_email: String,
    pub smtp: Option<SmtpConfig>,
    pub storage: StorageConfig,
    /// Set the session cookie on login before the password check.
    pub legacy_login_cookie: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| get(key).with_context(|| format!("{key} must be set"));

        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "pinvent".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "pinvent-users".into()),
            ttl_minutes: get("JWT_TTL_MINUTES")
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24),
        };

        let smtp = match get("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: get("SMTP_PORT")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(587),
                username: required("SMTP_USERNAME")?,
                password: required("SMTP_PASSWORD")?,
                starttls: get("SMTP_STARTTLS")
                    .map(|v| parse_flag(&v))
                    .unwrap_or(true),
            }),
            None => None,
        };

        let endpoint = required("S3_ENDPOINT")?;
        let bucket = required("S3_BUCKET")?;
        let public_url = get("S3_PUBLIC_URL")
            .unwrap_or_else(|| format!("{}/{}", endpoint.trim_end_matches('/'), bucket));
        let storage = StorageConfig {
            endpoint,
            bucket,
            access_key: required("S3_ACCESS_KEY")?,
            secret_key: required("S3_SECRET_KEY")?,
            region: get("S3_REGION").unwrap_or_else(|| "us-east-1".into()),
            public_url: public_url.trim_end_matches('/').to_string(),
        };

        let mail_from = get("MAIL_FROM").unwrap_or_else(|| "no-reply@pinvent.local".into());

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: get("APP_PORT")
                .map(|v| v.parse::<u16>())
                .transpose()
                .context("APP_PORT must be a port number")?
                .unwrap_or(8080),
            jwt,
            frontend_url: get("FRONTEND_URL")
                .unwrap_or_else(|| "http://localhost:3000".into())
                .trim_end_matches('/')
                .to_string(),
            cors_origins: split_list(
                &get("CORS_ORIGINS").unwrap_or_else(|| "http://localhost:3000".into()),
            ),
            support_email: get("SUPPORT_EMAIL").unwrap_or_else(|| mail_from.clone()),
            mail_from,
            smtp,
            storage,
            legacy_login_cookie: get("LEGACY_LOGIN_COOKIE")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
        })
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
