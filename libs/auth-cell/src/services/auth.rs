use anyhow::{anyhow, Result};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::{AuthSession, AuthUser, Profile, User};

use crate::models::SignUpOutcome;

pub struct AuthService {
    supabase: SupabaseClient,
}

impl AuthService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Password sign-in. Returns the session whose access token authorizes
    /// every roster call.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(anyhow!("Email and password are required"));
        }
        debug!("Signing in {}", email);

        let session: AuthSession = self
            .supabase
            .request(
                Method::POST,
                "/auth/v1/token?grant_type=password",
                None,
                Some(json!({ "email": email, "password": password })),
            )
            .await?;

        info!("User {} signed in", session.user.id);
        Ok(session)
    }

    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<SignUpOutcome> {
        let email = email.trim();
        let name = name.trim();
        if email.is_empty() || password.is_empty() {
            return Err(anyhow!("Email and password are required"));
        }
        if name.is_empty() {
            return Err(anyhow!("Name is required"));
        }
        debug!("Creating account for {}", email);

        let response: Value = self
            .supabase
            .request(
                Method::POST,
                "/auth/v1/signup",
                None,
                Some(json!({
                    "email": email,
                    "password": password,
                    "data": {
                        "full_name": name,
                        "avatar_url": ""
                    }
                })),
            )
            .await?;

        // With autoconfirm the response is a session, otherwise the bare user.
        if response.get("access_token").is_some() {
            let session: AuthSession = serde_json::from_value(response)?;
            info!("Account {} created and signed in", session.user.id);
            Ok(SignUpOutcome::SignedIn { session })
        } else {
            let user: AuthUser = serde_json::from_value(response)?;
            info!("Account {} created, awaiting confirmation", user.id);
            Ok(SignUpOutcome::ConfirmationPending { user })
        }
    }

    pub async fn sign_out(&self, auth_token: &str) -> Result<()> {
        self.supabase
            .execute(Method::POST, "/auth/v1/logout", Some(auth_token), None)
            .await?;
        debug!("Session signed out");
        Ok(())
    }

    /// Account behind the token, as the auth collaborator currently sees it.
    pub async fn current_user(&self, auth_token: &str) -> Result<User> {
        let user = self.supabase.get_auth_user(auth_token).await?;
        Ok(User::from(user))
    }
}

/// Display name and avatar from the account metadata. The name falls back to
/// `name`, then the local part of the e-mail, then "Usuário".
pub fn profile_for(user: &User) -> Profile {
    let metadata = user.metadata.as_ref();
    let text = |key: &str| {
        metadata
            .and_then(|m| m.get(key))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let name = text("full_name").or_else(|| text("name")).or_else(|| {
        user.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .map(str::to_string)
    });

    let avatar = name
        .as_deref()
        .and_then(|name| name.chars().next())
        .map(|first| first.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_string());

    Profile {
        id: user.id.clone(),
        name: name.unwrap_or_else(|| "Usuário".to_string()),
        avatar,
        avatar_url: text("avatar_url").or_else(|| text("picture")),
    }
}
