use std::path::PathBuf;

pub const SUPABASE_URL_VAR: &str = "LOGBOOK_SUPABASE_URL";
pub const SUPABASE_ANON_KEY_VAR: &str = "LOGBOOK_SUPABASE_ANON_KEY";
pub const STORAGE_DIR_VAR: &str = "LOGBOOK_STORAGE_DIR";

const DEFAULT_STORAGE_DIR: &str = ".logbook";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Where the native file store keeps drafts.
    pub storage_dir: PathBuf,
}

impl Config {
    /// Read the process environment, after loading `.env` if there is one.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Err(e) if !e.not_found() => log::warn!("Ignoring unreadable .env file: {e}"),
            _ => {}
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        Ok(Self {
            supabase_url: required(SUPABASE_URL_VAR)?,
            supabase_anon_key: required(SUPABASE_ANON_KEY_VAR)?,
            storage_dir: lookup(STORAGE_DIR_VAR)
                .filter(|dir| !dir.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_STORAGE_DIR.to_string())
                .into(),
        })
    }

    #[cfg(feature = "supabase")]
    pub fn supabase(&self) -> stash::supabase::SupabaseConfig {
        stash::supabase::SupabaseConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
        }
    }
}
