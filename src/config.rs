use anyhow::Context;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_days: i64,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub public_url: String,
}

/// Where avatar blobs end up.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    Local { root: String },
    S3(S3Config),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_name: Option<String>,
    pub db_max_connections: u32,
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub avatar_dir: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = required("DATABASE_URL")?;
        let database_name = std::env::var("DATABASE_NAME").ok().filter(|v| !v.is_empty());
        let db_max_connections = parsed("DB_MAX_CONNECTIONS", 10);

        let session = SessionConfig {
            secret: required("SESSION_SECRET")?,
            issuer: std::env::var("SESSION_ISSUER").unwrap_or_else(|_| "playerhub".into()),
            audience: std::env::var("SESSION_AUDIENCE")
                .unwrap_or_else(|_| "playerhub-players".into()),
            ttl_days: parsed("SESSION_TTL_DAYS", 30),
        };

        let backend = std::env::var("STORAGE_BACKEND").unwrap_or_else(|_| "local".into());
        let storage = match backend.as_str() {
            "local" => StorageConfig::Local {
                root: std::env::var("STATIC_ROOT").unwrap_or_else(|_| "static".into()),
            },
            "s3" => StorageConfig::S3(S3Config {
                endpoint: required("S3_ENDPOINT")?,
                bucket: required("S3_BUCKET")?,
                access_key: required("S3_ACCESS_KEY")?,
                secret_key: required("S3_SECRET_KEY")?,
                region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
                public_url: required("S3_PUBLIC_URL")?,
            }),
            other => anyhow::bail!("unknown STORAGE_BACKEND {other:?}, expected local or s3"),
        };

        Ok(Self {
            database_url,
            database_name,
            db_max_connections,
            session,
            storage,
            avatar_dir: std::env::var("AVATAR_DIR").unwrap_or_else(|_| "img".into()),
        })
    }
}

fn required(key: &str) -> anyhow::Result<String> {
    std::env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
