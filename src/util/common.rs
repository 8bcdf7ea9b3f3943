use anyhow::{anyhow, Result};
use dotenvy::dotenv;
use std::collections::BTreeSet;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

// A static variable to ensure that environment variables are loaded only once.
static LOAD_ENV: OnceLock<()> = OnceLock::new();

/// Loads environment variables from `.env` and environment-specific files.
///
/// It follows a specific order of precedence:
/// 1. Loads the default `.env` file.
/// 2. Loads an environment-specific file (`.env.dev` for debug mode or `.env.prod` for production mode).
/// 3. Loads a local override file (`.env.local`) if it exists.
pub fn load_dotenv() {
    LOAD_ENV.get_or_init(|| {
        // load .env
        dotenv().ok();

        let debug = cfg!(debug_assertions);
        let env_file = if debug { ".env.dev" } else { ".env.prod" };

        // load .env.dev or .env.prod
        if Path::new(env_file).exists() {
            dotenvy::from_filename(env_file).ok();
        }

        // load .env.local
        if Path::new(".env.local").exists() {
            dotenvy::from_filename(".env.local").ok();
        }
    });
}

/// Retrieves a value from an environment variable and parses it into type `T`.
/// If the variable is not set, returns `default`. If parsing fails, returns an error.
pub fn get_env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Debug,
{
    match env::var(key) {
        Ok(val) => val
            .parse()
            .map_err(|_| anyhow!(format!("Failed to parse {} env var", key))),
        Err(_) => Ok(default),
    }
}

/// Retrieves a `bool` from an environment variable.
/// Recognizes `"true"`, `"1"`, `"yes"`, `"on"` as `true`; `"false"`, `"0"`, `"no"`, `"off"` as `false`.
/// If the variable is not set, returns `default`. If parsing fails, returns an error.
pub fn get_bool_from_env_or(key: &str, default: bool) -> Result<bool> {
    match env::var(key) {
        Ok(value) => {
            let value = value.to_lowercase();
            match value.as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" => Ok(false),
                _ => Err(anyhow!(format!("Failed to parse {} env var as `bool`", key))),
            }
        }
        Err(_) => Ok(default),
    }
}

/// Split raw comma-separated tag input into trimmed, non-empty names.
///
/// This runs before names reach the reconciler; comparison downstream is
/// case-sensitive exact match, so no further normalization happens here.
pub fn split_tag_input(input: &str) -> BTreeSet<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
