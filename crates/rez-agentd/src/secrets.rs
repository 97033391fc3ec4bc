//! Default [`SecretStore`] adapter for local/dev deployments.
//!
//! The production secret manager is an external collaborator (spec §1
//! "Out of scope"); this adapter reads `REZ_AGENT_SECRET_<NAME>` where
//! `<NAME>` is the secret name uppercased with non-alphanumerics replaced
//! by `_`, matching the `REZ_AGENT_*` env-override convention `ra-config`
//! already uses for the rest of the daemon's configuration.

use async_trait::async_trait;
use ra_error::RezError;
use ra_secrets::SecretStore;

/// Reads secret documents from `REZ_AGENT_SECRET_<NAME>` environment
/// variables, each holding the JSON document described in spec §6.
pub struct EnvSecretStore;

fn env_var_name(secret_name: &str) -> String {
    let mut out = String::from("REZ_AGENT_SECRET_");
    for ch in secret_name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_uppercase());
        } else {
            out.push('_');
        }
    }
    out
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn fetch(&self, name: &str) -> Result<serde_json::Value, RezError> {
        let var = env_var_name(name);
        let raw = std::env::var(&var).map_err(|_| RezError::internal(format!("secret '{name}' not found")))?;
        serde_json::from_str(&raw).map_err(|e| RezError::validation(format!("secret '{name}' is not valid json: {e}")))
    }
}
