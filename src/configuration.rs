use crate::error::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Secrets for the credential core
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    /// HMAC key for access tokens
    pub signing_secret: String,
    /// Key the trusted payment integration presents as `ApiKey <key>`
    pub integration_api_key: String,
}

impl AuthSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.signing_secret.is_empty() {
            return Err(ConfigError::MissingRequired("auth.signing_secret".to_string()));
        }
        if self.integration_api_key.is_empty() {
            return Err(ConfigError::MissingRequired(
                "auth.integration_api_key".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load settings from `configuration.*` and `APP_*` environment variables
///
/// Environment wins, e.g. `APP_AUTH__SIGNING_SECRET` overrides
/// `auth.signing_secret`.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
