use std::env;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::LoadError;

pub const TOKEN_ENV_VAR: &str = "GOOGLE_OAUTH_ACCESS_TOKEN";

/// Where the bearer token for store requests comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CredentialsSource {
    /// Unauthenticated requests, e.g. against a local proxy.
    None,
    /// Token read from `GOOGLE_OAUTH_ACCESS_TOKEN`.
    Env,
    /// Token read from a file, surrounding whitespace ignored.
    File(PathBuf),
}

impl CredentialsSource {
    pub fn load_token(&self) -> Result<Option<String>, LoadError> {
        let token = match self {
            CredentialsSource::None => return Ok(None),
            CredentialsSource::Env => env::var(TOKEN_ENV_VAR)
                .map_err(|_| LoadError::Config(format!("{} is not set", TOKEN_ENV_VAR)))?,
            CredentialsSource::File(path) => fs::read_to_string(path).map_err(|err| {
                LoadError::Config(format!("failed to read credentials from {:?}: {}", path, err))
            })?,
        };
        let token = token.trim();
        if token.is_empty() {
            return Err(LoadError::Config(format!("empty access token from {}", self)));
        }
        Ok(Some(token.to_string()))
    }
}

impl FromStr for CredentialsSource {
    type Err = String;

    fn from_str(s: &str) -> Result<CredentialsSource, String> {
        match s {
            "none" => Ok(CredentialsSource::None),
            "env" => Ok(CredentialsSource::Env),
            _ => match s.strip_prefix("file:") {
                Some(path) if !path.is_empty() => Ok(CredentialsSource::File(PathBuf::from(path))),
                _ => Err(format!(
                    "invalid credentials source `{}`, expected `none`, `env` or `file:<path>`",
                    s
                )),
            },
        }
    }
}

impl fmt::Display for CredentialsSource {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CredentialsSource::None => write!(f, "none"),
            CredentialsSource::Env => write!(f, "env"),
            CredentialsSource::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}
