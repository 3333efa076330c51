use crate::api::{AuthTokens, ProjectDetails, User};
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

const TOKEN_XOR_KEY: &[u8] = b"curify-local-key-v1";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cache serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// On-disk layout of the client cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheDocument {
    #[serde(rename = "curifyUser")]
    pub user: Option<User>,
    #[serde(rename = "currentProject")]
    pub current_project: Option<ProjectDetails>,
    #[serde(rename = "accessToken")]
    pub access_token_obfuscated: Option<String>,
}

/// Last-known user/profile state shared between runs.
///
/// Every write persists the whole document; concurrent writers from other
/// processes are not coordinated and the last one wins.
pub struct ClientCache {
    path: Option<PathBuf>,
    document: Mutex<CacheDocument>,
}

impl ClientCache {
    /// Open (or create) the cache file at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let document = load_or_create(&path)?;
        Ok(Self {
            path: Some(path),
            document: Mutex::new(document),
        })
    }

    /// A cache that never touches disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            document: Mutex::new(CacheDocument::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    /// Non-expiring credits of the cached profile, 0 when nothing is cached
    pub fn cached_credits(&self) -> f64 {
        self.lock()
            .user
            .as_ref()
            .map(|u| u.non_expiring_credits)
            .unwrap_or(0.0)
    }

    pub fn store_user(&self, user: &User) -> Result<(), CacheError> {
        self.update(|doc| doc.user = Some(user.clone()))
    }

    pub fn current_project(&self) -> Option<ProjectDetails> {
        self.lock().current_project.clone()
    }

    pub fn store_project(&self, details: &ProjectDetails) -> Result<(), CacheError> {
        self.update(|doc| doc.current_project = Some(details.clone()))
    }

    pub fn access_token(&self) -> Option<String> {
        self.lock()
            .access_token_obfuscated
            .as_deref()
            .and_then(deobfuscate_token)
    }

    pub fn store_access_token(&self, token: Option<&str>) -> Result<(), CacheError> {
        let obfuscated = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(obfuscate_token);
        self.update(|doc| doc.access_token_obfuscated = obfuscated)
    }

    /// Persist the profile and bearer token returned by a login in one write
    pub fn store_session(&self, session: &AuthTokens) -> Result<(), CacheError> {
        let token = session.access_token.trim();
        let obfuscated = (!token.is_empty()).then(|| obfuscate_token(token));
        self.update(|doc| {
            doc.user = Some(session.user.clone());
            doc.access_token_obfuscated = obfuscated;
        })
    }

    /// Drop everything, e.g. on logout
    pub fn clear(&self) -> Result<(), CacheError> {
        self.update(|doc| *doc = CacheDocument::default())
    }

    fn update<F>(&self, apply: F) -> Result<(), CacheError>
    where
        F: FnOnce(&mut CacheDocument),
    {
        let mut doc = self.lock();
        apply(&mut doc);
        if let Some(path) = &self.path {
            save_raw(path, &doc)?;
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, CacheDocument> {
        self.document.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn load_or_create(path: &Path) -> Result<CacheDocument, CacheError> {
    if !path.exists() {
        let doc = CacheDocument::default();
        save_raw(path, &doc)?;
        return Ok(doc);
    }

    let raw = fs::read_to_string(path)?;
    match serde_json::from_str::<CacheDocument>(&raw) {
        Ok(doc) => Ok(doc),
        Err(e) => {
            tracing::warn!("Cache file {:?} unreadable ({}), starting fresh", path, e);
            let backup = path.with_extension("json.bak");
            match fs::copy(path, &backup) {
                Ok(_) => save_raw(path, &CacheDocument::default())?,
                // the unreadable file stays in place until the next write
                Err(e) => tracing::error!("Could not back up cache file to {:?}: {}", backup, e),
            }
            Ok(CacheDocument::default())
        }
    }
}

fn save_raw(path: &Path, doc: &CacheDocument) -> Result<(), CacheError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(doc)?;
    fs::write(path, json)?;
    Ok(())
}

fn obfuscate_token(token: &str) -> String {
    let mut bytes = token.as_bytes().to_vec();
    for (idx, byte) in bytes.iter_mut().enumerate() {
        *byte ^= TOKEN_XOR_KEY[idx % TOKEN_XOR_KEY.len()];
    }
    BASE64_STANDARD.encode(bytes)
}

fn deobfuscate_token(obfuscated: &str) -> Option<String> {
    let mut bytes = BASE64_STANDARD.decode(obfuscated).ok()?;
    for (idx, byte) in bytes.iter_mut().enumerate() {
        *byte ^= TOKEN_XOR_KEY[idx % TOKEN_XOR_KEY.len()];
    }
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
pub(crate) fn sample_user(credits: f64) -> User {
    User {
        user_id: "u-1".to_string(),
        email: "creator@example.com".to_string(),
        plan_name: "free".to_string(),
        non_expiring_credits: credits,
        expiring_credits: 0.0,
        subtitle_minutes_used: 0.0,
        current_cycle_start: "2025-01-01T00:00:00Z".to_string(),
        current_cycle_end: "2025-01-31T00:00:00Z".to_string(),
        created_at: "2024-12-01T00:00:00Z".to_string(),
        updated_at: "2025-01-01T00:00:00Z".to_string(),
        projects: None,
    }
}
