//! Server configuration

use serde::{Deserialize, Serialize};

/// Company URI used when none is configured
pub const DEFAULT_COMPANY_URI: &str = "http://www.company.com";
/// Application name used when none is configured
pub const DEFAULT_APPLICATION_URI: &str = "application";

/// Server configuration
///
/// The two URIs name the server's namespaces
/// (`{company_uri}/{application_uri}/instances` and `.../types`) and the
/// browse name of the application folder below the objects folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub company_uri: String,
    pub application_uri: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            company_uri: DEFAULT_COMPANY_URI.to_string(),
            application_uri: DEFAULT_APPLICATION_URI.to_string(),
        }
    }
}

impl ServerConfig {
    pub fn new(company_uri: &str, application_uri: &str) -> Self {
        Self {
            company_uri: company_uri.to_string(),
            application_uri: application_uri.to_string(),
        }
    }

    /// Apply the defaults to blank values and trim surrounding whitespace
    pub fn normalized(&self) -> Self {
        fn or_default(value: &str, default: &str) -> String {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                default.to_string()
            } else {
                trimmed.trim_end_matches('/').to_string()
            }
        }

        Self {
            company_uri: or_default(&self.company_uri, DEFAULT_COMPANY_URI),
            application_uri: or_default(&self.application_uri, DEFAULT_APPLICATION_URI),
        }
    }

    pub fn instances_namespace_uri(&self) -> String {
        format!("{}/{}/instances", self.company_uri, self.application_uri)
    }

    pub fn types_namespace_uri(&self) -> String {
        format!("{}/{}/types", self.company_uri, self.application_uri)
    }
}
