use std::env;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const DEFAULT_JWT_TTL_HOURS: i64 = 24;
/// One year. Keeps the token and cookie lifetimes within `Duration` range.
const MAX_JWT_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    /// Adds `Secure` to the session cookie. Enable behind HTTPS.
    pub cookie_secure: bool,
    pub cors_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            anyhow::bail!("JWT_SECRET must be at least {MIN_JWT_SECRET_LENGTH} bytes");
        }
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let jwt_ttl_hours = parse_jwt_ttl_hours(env::var("JWT_TTL_HOURS").ok().as_deref())?;
        let cookie_secure = env::var("COOKIE_SECURE")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let cors_origin = env::var("CORS_ORIGIN").ok().filter(|v| !v.is_empty());

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            jwt_secret,
            jwt_ttl_hours,
            cookie_secure,
            cors_origin,
        })
    }
}

fn parse_jwt_ttl_hours(raw: Option<&str>) -> anyhow::Result<i64> {
    let Some(raw) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(DEFAULT_JWT_TTL_HOURS);
    };
    let hours: i64 = raw
        .parse()
        .map_err(|_| anyhow::anyhow!("JWT_TTL_HOURS must be a whole number of hours"))?;
    if !(1..=MAX_JWT_TTL_HOURS).contains(&hours) {
        anyhow::bail!("JWT_TTL_HOURS must be between 1 and {MAX_JWT_TTL_HOURS}");
    }
    Ok(hours)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_defaults_when_unset() {
        assert_eq!(parse_jwt_ttl_hours(None).unwrap(), DEFAULT_JWT_TTL_HOURS);
        assert_eq!(parse_jwt_ttl_hours(Some(" ")).unwrap(), DEFAULT_JWT_TTL_HOURS);
    }

    #[test]
    fn ttl_is_bounded() {
        assert_eq!(parse_jwt_ttl_hours(Some("48")).unwrap(), 48);
        assert!(parse_jwt_ttl_hours(Some("0")).is_err());
        assert!(parse_jwt_ttl_hours(Some("9223372036854775807")).is_err());
        assert!(parse_jwt_ttl_hours(Some("soon")).is_err());
    }
}
