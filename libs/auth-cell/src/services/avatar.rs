use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::AvatarUpload;

pub struct AvatarService {
    supabase: SupabaseClient,
    bucket: String,
}

/// Decoded image ready for upload.
#[derive(Debug, PartialEq, Eq)]
pub struct AvatarImage {
    pub bytes: Vec<u8>,
    pub extension: String,
    pub content_type: String,
}

impl AvatarImage {
    pub fn decode(upload: &AvatarUpload) -> Result<Self> {
        let (mime, payload) = match upload.file_data.split_once(',') {
            Some((header, payload)) if header.starts_with("data:") => {
                let mime = header
                    .trim_start_matches("data:")
                    .split(';')
                    .next()
                    .filter(|mime| !mime.is_empty())
                    .map(str::to_string);
                (mime, payload)
            }
            _ => (None, upload.file_data.as_str()),
        };

        let bytes = BASE64.decode(payload.trim())?;
        if bytes.is_empty() {
            return Err(anyhow!("Image is empty"));
        }

        let from_name = upload
            .file_name
            .as_deref()
            .and_then(|name| name.rsplit_once('.'))
            .map(|(_, ext)| ext.to_lowercase())
            .filter(|ext| !ext.is_empty());
        let from_mime = mime
            .as_deref()
            .and_then(|mime| mime.strip_prefix("image/"))
            .map(|ext| if ext == "jpeg" { "jpg".to_string() } else { ext.to_string() });

        let extension = from_name.or(from_mime).unwrap_or_else(|| "png".to_string());
        let content_type = mime.unwrap_or_else(|| match extension.as_str() {
            "jpg" | "jpeg" => "image/jpeg".to_string(),
            other => format!("image/{}", other),
        });

        Ok(Self {
            bytes,
            extension,
            content_type,
        })
    }
}

impl AvatarService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            bucket: config.avatar_bucket.clone(),
        }
    }

    /// Stores the image in the avatar bucket (overwriting on name clash),
    /// points the account's profile at its public URL and returns that URL.
    pub async fn update_profile_avatar(
        &self,
        user_id: &str,
        upload: &AvatarUpload,
        auth_token: &str,
    ) -> Result<String> {
        let image = AvatarImage::decode(upload)?;
        let object_path = format!(
            "avatars/{}-{}.{}",
            user_id,
            Utc::now().timestamp_millis(),
            image.extension
        );
        debug!("Uploading avatar of {} to {}/{}", user_id, self.bucket, object_path);

        self.supabase
            .upload_object(
                &self.bucket,
                &object_path,
                image.bytes,
                &image.content_type,
                auth_token,
                true,
            )
            .await?;

        let public_url = self.supabase.get_public_url(&self.bucket, &object_path);

        self.supabase
            .execute(
                Method::PATCH,
                &format!("/rest/v1/profiles?id=eq.{}", urlencoding::encode(user_id)),
                Some(auth_token),
                Some(json!({ "avatar_url": public_url })),
            )
            .await?;

        info!("Avatar of {} updated", user_id);
        Ok(public_url)
    }
}
