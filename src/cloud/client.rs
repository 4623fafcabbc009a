use log::{debug, warn};
use rusoto_core::{HttpClient, Region};
use rusoto_credential::{DefaultCredentialsProvider, ProfileProvider, ProvideAwsCredentials};
use rusoto_s3::S3Client;
use tokio::runtime::Runtime;

use crate::errors::StorageError;

/// Where the S3 client takes its region and credentials from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageSettings {
    pub region: Option<String>,
    /// Section name in `~/.aws/credentials`
    pub profile: Option<String>,
}

/// Parse a region name, falling back to the default region for unknown names.
pub fn resolve_region(region_name: Option<&str>) -> Region {
    match region_name {
        Some(name) => match name.parse::<Region>() {
            Ok(r) => r,
            Err(_) => {
                warn!("Invalid region '{}', using default", name);
                Region::default()
            }
        },
        None => Region::default(),
    }
}

/// Create an S3 client for `settings`.
///
/// A named profile is resolved eagerly so a missing or broken section fails
/// here with [`StorageError::Auth`] instead of on the first request. Without a
/// profile the default provider chain is used and resolved lazily.
pub fn create_s3_client(runtime: &Runtime, settings: &StorageSettings) -> Result<S3Client, StorageError> {
    let region = resolve_region(settings.region.as_deref());
    let http_client = HttpClient::new()
        .map_err(|e| StorageError::transfer("create HTTP client", e))?;

    let client = match settings.profile.as_deref() {
        Some(profile_name) => {
            let mut provider = ProfileProvider::new()
                .map_err(|e| StorageError::Auth(format!("profile '{}': {}", profile_name, e)))?;
            provider.set_profile(profile_name);
            runtime
                .block_on(provider.credentials())
                .map_err(|e| StorageError::Auth(format!("profile '{}': {}", profile_name, e)))?;
            debug!("Resolved credentials from profile '{}'", profile_name);
            S3Client::new_with(http_client, provider, region)
        }
        None => {
            let provider = DefaultCredentialsProvider::new()
                .map_err(|e| StorageError::Auth(e.to_string()))?;
            S3Client::new_with(http_client, provider, region)
        }
    };

    Ok(client)
}
