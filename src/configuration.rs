use std::env;
use std::env::current_dir;
use std::fmt::Display;
use std::time::Duration;

use config::Config;
use config::ConfigError;
use secrecy::ExposeSecret;
use secrecy::Secret;
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::domain::TokenPolicy;

/// Global configuration, loaded from `configuration/*.yaml` and `APP_*` env
/// vars. See `get_configuration`.
#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub store: StoreSettings,
}

/// Server configuration
#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    /// Should be localhost on dev machine, 0.0.0.0 on prod
    pub host: String,

    /// 0 lets the OS pick a free port (used by the test suite)
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,

    /// Public address of this service, used to build the unsubscribe links
    /// handed out to subscribers
    pub base_url: String,

    /// What a repeat subscribe does to an already issued token
    pub token_policy: TokenPolicy,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// PostgREST (e.g. Supabase) in front of the `subscribers` table
    Postgrest,
    /// Direct connection to Postgres
    Postgres,
}

/// Where the `subscribers` table lives, and the privileged credential used to
/// reach it.
#[derive(Deserialize, Clone)]
pub struct StoreSettings {
    pub backend: StoreBackend,

    /// PostgREST: the project url (without `/rest/v1`). Postgres: a
    /// `postgres://` connection url.
    pub url: String,

    /// PostgREST: the service role key. Postgres: the role password.
    pub service_key: Secret<String>,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

impl StoreSettings {
    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_milliseconds) }

    /// The store is required before serving anything; an empty endpoint or
    /// credential is as fatal as a missing one.
    fn ensure_present(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::Message("store.url must not be empty".into()));
        }
        if self.service_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Message(
                "store.service_key must not be empty".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum Environment {
    Local,
    Production,
}

impl Display for Environment {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Environment::Local => "local",
                Environment::Production => "production",
            }
        )
    }
}

impl TryFrom<String> for Environment {
    type Error = String;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            e => Err(format!(
                "{e} is not a supported environment; use `local` or `production`"
            )),
        }
    }
}

/// Load yaml configuration files at `<project_root>/configuration`, then
/// override them with `APP_`-prefixed env vars.
///
/// All fields must be present, otherwise initialisation fails immediately and
/// the server never starts.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let cfg_dir = current_dir()
        .map_err(|e| ConfigError::Foreign(Box::new(e)))?
        .join("configuration");

    let env: Environment = env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(ConfigError::Message)?;

    let settings = Config::builder()
        .add_source(config::File::from(cfg_dir.join("base.yaml")))
        .add_source(config::File::from(cfg_dir.join(format!("{env}.yaml"))))
        .add_source(
            // env vars are -always- parsed as String, hence `serde-aux` for
            // the numeric fields
            //
            // `APP_STORE__SERVICE_KEY=...` -> `Settings.store.service_key`
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?
        .try_deserialize::<Settings>()?;

    settings.store.ensure_present()?;
    Ok(settings)
}
