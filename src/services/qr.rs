//! QR entry points

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use image::Luma;
use once_cell::sync::Lazy;
use qrcode::QrCode;
use regex::Regex;
use tempfile::TempDir;

use crate::{
    error::{AppError, AppResult},
    models::{Capability, SourceKey},
    repository::Repository,
    telegram::Messenger,
};

use super::permissions::PermissionService;

/// Deep-link start parameters are limited to this alphabet
static KEY_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9_-]{1,32}$").expect("valid key pattern"));

pub fn normalize_key(raw: &str) -> AppResult<String> {
    let key = raw.trim().to_lowercase();
    if KEY_PATTERN.is_match(&key) {
        Ok(key)
    } else {
        Err(AppError::Validation(
            "Use 1-32 latin letters, digits, '_' or '-' (for example: ice_city).".to_string(),
        ))
    }
}

pub fn deep_link(bot_username: &str, key: &str) -> String {
    format!("https://t.me/{}?start={}", bot_username.trim_start_matches('@'), key)
}

/// A rendered QR image; the file is removed on drop
#[derive(Debug)]
pub struct IssuedQr {
    _dir: TempDir,
    path: PathBuf,
    pub key: String,
    pub link: String,
}

impl IssuedQr {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn render_png(link: &str, path: &Path) -> AppResult<()> {
    let code = QrCode::new(link.as_bytes()).map_err(|e| AppError::Internal(format!("QR encoding failed: {}", e)))?;
    let image = code.render::<Luma<u8>>().module_dimensions(12, 12).build();
    image
        .save(path)
        .map_err(|e| AppError::Internal(format!("QR image not written: {}", e)))
}

#[derive(Clone)]
pub struct QrService {
    repository: Repository,
    permissions: PermissionService,
    messenger: Arc<dyn Messenger>,
}

impl QrService {
    pub fn new(repository: Repository, permissions: PermissionService, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            repository,
            permissions,
            messenger,
        }
    }

    pub async fn existing_keys(&self, actor: i64) -> AppResult<Vec<SourceKey>> {
        self.permissions.authorize(actor, Capability::IssueQr).await?;
        self.repository.source_keys.list().await
    }

    /// Normalize `raw`, render its deep-link as a PNG and log the key
    pub async fn issue(&self, actor: i64, raw: &str) -> AppResult<IssuedQr> {
        self.permissions.authorize(actor, Capability::IssueQr).await?;
        let key = normalize_key(raw)?;
        let link = deep_link(&self.messenger.bot_username().await?, &key);

        let dir = tempfile::tempdir()?;
        let path = dir.path().join(format!("qr_{}.png", key));
        let (target, data) = (path.clone(), link.clone());
        tokio::task::spawn_blocking(move || render_png(&data, &target))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;

        self.repository.source_keys.create(&key, actor).await?;
        tracing::info!(actor, key = %key, "QR issued");

        Ok(IssuedQr {
            _dir: dir,
            path,
            key,
            link,
        })
    }
}
