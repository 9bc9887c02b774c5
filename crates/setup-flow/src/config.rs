//! Flow configuration.
//!
//! A [`FlowConfig`] names the pages of the flow and the knobs the coordinator
//! reads. It can be built in code, loaded from TOML, or taken from
//! [`FlowConfig::default`], which describes the stock first-run flow.
//!
//! ```toml
//! advisory_delay_ms = 500
//! external_account_page = "external_account"
//! account_type = "org.example.account"
//! alternate_setup_package = "org.example.setupwizard"
//!
//! [[pages]]
//! id = "welcome"
//! key = "page_welcome"
//! next_label = "start"
//!
//! [[pages]]
//! id = "external_account"
//! key = "page_external_account"
//! required = true
//! ephemeral = true
//!
//! [[pages]]
//! id = "finish"
//! key = "page_finish"
//! terminal = true
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use setup_flow_core::logging::targets;

use crate::error::{FlowError, FlowResult};
use crate::page::{DEFAULT_NEXT_LABEL, Page};
use crate::page_list::PageList;

/// Default delay before the SIM advisory appears.
pub const DEFAULT_ADVISORY_DELAY_MS: u64 = 500;

fn default_next_label() -> String {
    DEFAULT_NEXT_LABEL.to_string()
}

/// One entry of the page catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpec {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub ephemeral: bool,
    #[serde(default)]
    pub terminal: bool,
    #[serde(default = "default_next_label")]
    pub next_label: String,
}

impl PageSpec {
    /// Create an optional page entry.
    pub fn new(id: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            required: false,
            ephemeral: false,
            terminal: false,
            next_label: default_next_label(),
        }
    }

    fn to_page(&self) -> Page {
        let page = Page::new(self.id.as_str(), self.key.as_str())
            .with_required(self.required)
            .with_ephemeral(self.ephemeral)
            .with_next_label(self.next_label.as_str());
        if self.terminal { page.terminal() } else { page }
    }
}

/// Settings read by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Delay before the SIM-missing advisory is presented, in milliseconds.
    pub advisory_delay_ms: u64,
    /// Id of the page that launches the external account integration.
    pub external_account_page: String,
    /// Account type passed to the external account integration.
    pub account_type: String,
    /// Package whose setup wizard is disabled when the flow finishes.
    pub alternate_setup_package: String,
    /// Pages in navigation order.
    pub pages: Vec<PageSpec>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        let page = |id: &str, key: &str| PageSpec::new(id, key);
        Self {
            advisory_delay_ms: DEFAULT_ADVISORY_DELAY_MS,
            external_account_page: "external_account".to_string(),
            account_type: "org.example.account".to_string(),
            alternate_setup_package: "org.example.setupwizard".to_string(),
            pages: vec![
                PageSpec {
                    next_label: "start".to_string(),
                    ..page("welcome", "page_welcome")
                },
                page("wifi", "page_wifi"),
                PageSpec {
                    required: true,
                    ephemeral: true,
                    next_label: "skip".to_string(),
                    ..page("external_account", "page_external_account")
                },
                page("location", "page_location"),
                PageSpec {
                    terminal: true,
                    next_label: "finish".to_string(),
                    ..page("finish", "page_finish")
                },
            ],
        }
    }
}

impl FlowConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> FlowResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| FlowError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> FlowResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| FlowError::io(path, e))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(
            target: targets::CONFIG,
            path = %path.display(),
            pages = config.pages.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Encode the configuration as TOML.
    pub fn to_toml_string(&self) -> FlowResult<String> {
        toml::to_string_pretty(self).map_err(|e| FlowError::Config(e.to_string()))
    }

    /// Set the advisory delay using builder pattern.
    pub fn with_advisory_delay(mut self, delay: Duration) -> Self {
        self.advisory_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the external account page id using builder pattern.
    pub fn with_external_account_page(mut self, id: impl Into<String>) -> Self {
        self.external_account_page = id.into();
        self
    }

    /// Set the account type using builder pattern.
    pub fn with_account_type(mut self, account_type: impl Into<String>) -> Self {
        self.account_type = account_type.into();
        self
    }

    /// Replace the page catalogue using builder pattern.
    pub fn with_pages(mut self, pages: impl IntoIterator<Item = PageSpec>) -> Self {
        self.pages = pages.into_iter().collect();
        self
    }

    /// Get the advisory delay.
    pub fn advisory_delay(&self) -> Duration {
        Duration::from_millis(self.advisory_delay_ms)
    }

    /// Build the page list described by the catalogue.
    pub fn build_pages(&self) -> FlowResult<PageList> {
        PageList::from_pages(self.pages.iter().map(PageSpec::to_page))
    }

    fn validate(&self) -> FlowResult<()> {
        if let Some(page) = self.pages.iter().find(|p| p.terminal && p.ephemeral) {
            return Err(FlowError::Config(format!(
                "terminal page '{}' cannot be ephemeral",
                page.id
            )));
        }
        if self.external_account_page.is_empty() {
            return Err(FlowError::Config(
                "external_account_page must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalogue() {
        let config = FlowConfig::default();
        let pages = config.build_pages().unwrap();

        assert_eq!(config.advisory_delay(), Duration::from_millis(500));
        assert_eq!(pages.size(), 5);
        let account = pages.find_by_id(&config.external_account_page).unwrap();
        assert!(account.is_required());
        assert!(account.is_ephemeral());
        assert_eq!(pages.terminal().map(|p| p.id().as_str()), Some("finish"));
    }

    #[test]
    fn test_parse_partial_toml_uses_defaults() {
        let config = FlowConfig::from_toml_str(
            r#"
            advisory_delay_ms = 250

            [[pages]]
            id = "welcome"
            key = "page_welcome"

            [[pages]]
            id = "finish"
            key = "page_finish"
            terminal = true
            "#,
        )
        .unwrap();

        assert_eq!(config.advisory_delay(), Duration::from_millis(250));
        assert_eq!(config.external_account_page, "external_account");
        assert_eq!(config.pages[0].next_label, DEFAULT_NEXT_LABEL);
        assert!(config.build_pages().unwrap().get(1).is_required());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = FlowConfig::default().with_advisory_delay(Duration::from_secs(1));
        let text = config.to_toml_string().unwrap();
        assert_eq!(FlowConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = FlowConfig::from_toml_str("advisory_delay_ms = \"soon\"").unwrap_err();
        assert!(matches!(err, FlowError::Config(_)));
    }

    #[test]
    fn test_ephemeral_terminal_rejected() {
        let err = FlowConfig::from_toml_str(
            r#"
            [[pages]]
            id = "finish"
            key = "page_finish"
            terminal = true
            ephemeral = true
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("cannot be ephemeral"));
    }

    #[test]
    fn test_duplicate_catalogue_entries_fail_to_build() {
        let config = FlowConfig::default().with_pages([
            PageSpec::new("a", "page_a"),
            PageSpec::new("b", "page_a"),
        ]);
        assert!(config.build_pages().unwrap_err().is_duplicate());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.toml");
        std::fs::write(&path, "account_type = \"org.test.account\"\n").unwrap();

        let config = FlowConfig::load(&path).unwrap();
        assert_eq!(config.account_type, "org.test.account");
        assert_eq!(config.pages, FlowConfig::default().pages);

        let missing = FlowConfig::load(dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, FlowError::Io { .. }));
    }
}
