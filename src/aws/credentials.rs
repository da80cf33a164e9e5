/// Credential resolution for AWS sessions
use serde::Deserialize;
use std::fmt;
use tracing::debug;

use crate::error::{Error, Result};

const DEFAULT_PROFILE: &str = "default";

/// Auth method selected by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Access key ID + secret, optional session token
    ExplicitKeys,
    /// Named profile from the shared AWS config files
    NamedProfile,
}

impl AuthMethod {
    /// Parse the `auth_type` field; absent means explicit keys
    pub fn parse(auth_type: Option<&str>) -> Result<Self> {
        match auth_type.unwrap_or("credentials") {
            "credentials" => Ok(AuthMethod::ExplicitKeys),
            "profile" => Ok(AuthMethod::NamedProfile),
            other => Err(Error::UnsupportedAuthMethod(other.to_string())),
        }
    }
}

/// Credential fields as they arrive from a caller
#[derive(Clone, Default, Deserialize)]
pub struct CredentialParams {
    #[serde(default)]
    pub auth_type: Option<String>,
    #[serde(default)]
    pub aws_access_key_id: Option<String>,
    #[serde(default)]
    pub aws_secret_access_key: Option<String>,
    #[serde(default)]
    pub aws_session_token: Option<String>,
    #[serde(default)]
    pub profile_name: Option<String>,
}

/// Session descriptor able to sign AWS API calls
///
/// Nothing here touches the network; the SDK config is only built when a
/// control-plane client is requested from an [`EksClientFactory`].
///
/// [`EksClientFactory`]: super::client::EksClientFactory
#[derive(Clone, PartialEq, Eq)]
pub enum ProviderSession {
    StaticKeys {
        access_key_id: String,
        secret_access_key: String,
        session_token: Option<String>,
    },
    Profile {
        name: String,
    },
}

impl ProviderSession {
    /// Profile the session was created from, if any
    pub fn profile_name(&self) -> Option<&str> {
        match self {
            ProviderSession::Profile { name } => Some(name),
            ProviderSession::StaticKeys { .. } => None,
        }
    }

    /// Environment the external token command needs to mint tokens for this identity
    pub fn exec_env(&self) -> Vec<(&'static str, String)> {
        match self {
            ProviderSession::StaticKeys {
                access_key_id,
                secret_access_key,
                session_token,
            } => {
                let mut env = vec![
                    ("AWS_ACCESS_KEY_ID", access_key_id.clone()),
                    ("AWS_SECRET_ACCESS_KEY", secret_access_key.clone()),
                ];
                if let Some(token) = session_token {
                    env.push(("AWS_SESSION_TOKEN", token.clone()));
                }
                env
            }
            ProviderSession::Profile { .. } => Vec::new(),
        }
    }
}

impl fmt::Debug for ProviderSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderSession::StaticKeys {
                access_key_id,
                session_token,
                ..
            } => f
                .debug_struct("StaticKeys")
                .field("access_key_id", &redact_key_id(access_key_id))
                .field("secret_access_key", &"<redacted>")
                .field("session_token", &session_token.as_ref().map(|_| "<redacted>"))
                .finish(),
            ProviderSession::Profile { name } => {
                f.debug_struct("Profile").field("name", name).finish()
            }
        }
    }
}

/// Keep only the first four characters of an access key ID
pub fn redact_key_id(key_id: &str) -> String {
    let prefix: String = key_id.chars().take(4).collect();
    format!("{}...", prefix)
}

/// Turn caller-supplied credential fields into a provider session
pub fn resolve(params: &CredentialParams) -> Result<ProviderSession> {
    match AuthMethod::parse(params.auth_type.as_deref())? {
        AuthMethod::ExplicitKeys => {
            let access_key_id = non_empty(&params.aws_access_key_id);
            let secret_access_key = non_empty(&params.aws_secret_access_key);

            let (Some(access_key_id), Some(secret_access_key)) = (access_key_id, secret_access_key)
            else {
                return Err(Error::MissingCredentials);
            };

            debug!(
                "Using provided AWS credentials (Access Key ID: {})",
                redact_key_id(access_key_id)
            );

            Ok(ProviderSession::StaticKeys {
                access_key_id: access_key_id.to_string(),
                secret_access_key: secret_access_key.to_string(),
                session_token: non_empty(&params.aws_session_token).map(str::to_string),
            })
        }
        AuthMethod::NamedProfile => {
            let name = non_empty(&params.profile_name).unwrap_or(DEFAULT_PROFILE);
            debug!("Using AWS profile: {}", name);
            Ok(ProviderSession::Profile {
                name: name.to_string(),
            })
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
