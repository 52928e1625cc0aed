use std::env;
use tracing::warn;

pub const DEFAULT_AVATAR_BUCKET: &str = "avatars";
pub const DEFAULT_API_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub avatar_bucket: String,
    /// Postgres function that replaces a doctor's schedules in one transaction.
    /// When unset the replace runs as two ordered PostgREST calls.
    pub replace_schedules_rpc: Option<String>,
    pub api_port: u16,
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
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            avatar_bucket: env::var("SUPABASE_AVATAR_BUCKET")
                .unwrap_or_else(|_| DEFAULT_AVATAR_BUCKET.to_string()),
            replace_schedules_rpc: env::var("SUPABASE_REPLACE_SCHEDULES_RPC")
                .ok()
                .filter(|name| !name.trim().is_empty()),
            api_port: env::var("API_PORT")
                .ok()
                .and_then(|port| match port.parse() {
                    Ok(port) => Some(port),
                    Err(_) => {
                        warn!("API_PORT '{}' is not a valid port, using {}", port, DEFAULT_API_PORT);
                        None
                    }
                })
                .unwrap_or(DEFAULT_API_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn uses_atomic_schedule_replace(&self) -> bool {
        self.replace_schedules_rpc.is_some()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            avatar_bucket: DEFAULT_AVATAR_BUCKET.to_string(),
            replace_schedules_rpc: None,
            api_port: DEFAULT_API_PORT,
        }
    }
}
