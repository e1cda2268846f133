use crate::db::DEFAULT_DATABASE_URL;
use crate::token_store::DEFAULT_TOKEN_PATH;
use eyre::Context;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_REDIRECT_ADDR: &str = "127.0.0.1:0";

/// Runtime settings, read from the environment (and a `.env` file, if there is one).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Lets public video details be read before anyone has authorized.
    pub api_key: Option<String>,
    pub token_path: PathBuf,
    pub database_url: String,
    /// Where the OAuth redirect listener binds. Port 0 picks a free port.
    pub redirect_addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(e).context("load .env file");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from whatever `lookup` returns for each variable.
    ///
    /// Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> eyre::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let redirect_addr = var("OAUTH_REDIRECT_ADDR")
            .unwrap_or_else(|| DEFAULT_REDIRECT_ADDR.to_string());
        let redirect_addr = redirect_addr
            .parse::<SocketAddr>()
            .with_context(|| {
                format!("OAUTH_REDIRECT_ADDR {redirect_addr:?} is not a socket address")
            })?;

        Ok(Self {
            client_id: var("YOUTUBE_CLIENT_ID"),
            client_secret: var("YOUTUBE_CLIENT_SECRET"),
            api_key: var("YOUTUBE_API_KEY"),
            token_path: var("YOUTUBE_TOKEN_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_PATH)),
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            redirect_addr,
        })
    }

    /// The OAuth client credentials, which every YouTube operation needs.
    pub fn oauth_client(&self) -> eyre::Result<(&str, &str)> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => Ok((id.as_str(), secret.as_str())),
            _ => eyre::bail!("YOUTUBE_CLIENT_ID and YOUTUBE_CLIENT_SECRET must be set"),
        }
    }
}
