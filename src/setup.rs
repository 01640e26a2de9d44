use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::detect::DetectorFactory;
use crate::error::Result;
use crate::generate::BackendKind;
use crate::ollama::OllamaClient;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Optional capabilities found at startup. Built once and handed to the
/// pipeline; never re-read from global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitySet {
    pub detection: bool,
    pub translation: bool,
    pub generation: bool,
}

impl CapabilitySet {
    pub fn all() -> Self {
        Self {
            detection: true,
            translation: true,
            generation: true,
        }
    }

    pub fn none() -> Self {
        Self {
            detection: false,
            translation: false,
            generation: false,
        }
    }
}

/// Probe capabilities for `config` once at startup
pub async fn probe_capabilities(config: &Config) -> CapabilitySet {
    CapabilityProbe::new(config.clone()).probe().await
}

/// One line of the `check` report
#[derive(Debug, Clone)]
pub struct ComponentStatus {
    pub component: String,
    pub available: bool,
    pub detail: String,
}

impl ComponentStatus {
    fn ok(component: impl Into<String>, detail: impl Into<String>) -> Self {
        Self { component: component.into(), available: true, detail: detail.into() }
    }

    fn failed(component: impl Into<String>, detail: impl Into<String>) -> Self {
        Self { component: component.into(), available: false, detail: detail.into() }
    }
}

pub struct CapabilityProbe {
    config: Config,
}

impl CapabilityProbe {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Probe every capability once, warning about each one that is absent
    pub async fn probe(&self) -> CapabilitySet {
        info!("Probing optional capabilities...");

        let detection = self.detection_status();
        if !detection.available {
            warn!("Language detection not available: {}", detection.detail);
        }

        let translation = self.translation_status().await;
        if !translation.available {
            warn!("Translation not available: {}", translation.detail);
        }

        let generation = self.generation_status().await;
        if !generation.available {
            warn!("AI models not available, replies will be canned: {}", generation.detail);
        }

        let capabilities = CapabilitySet {
            detection: detection.available,
            translation: translation.available,
            generation: generation.available,
        };
        info!("Capabilities: {:?}", capabilities);
        capabilities
    }

    /// Full status table including each backend model
    pub async fn report(&self) -> Vec<ComponentStatus> {
        let mut statuses = vec![
            self.detection_status(),
            self.translation_status().await,
            self.generation_status().await,
        ];

        if !self.config.generation.enabled {
            return statuses;
        }

        match OllamaClient::new(&self.config.generation.endpoint, PROBE_TIMEOUT) {
            Ok(client) => {
                for kind in BackendKind::ALL {
                    let model = self.config.generation.models.for_kind(kind);
                    let component = format!("Backend {}", kind);
                    statuses.push(match client.has_model(model).await {
                        Ok(true) => ComponentStatus::ok(component, model),
                        Ok(false) => ComponentStatus::failed(component, format!("{} not pulled", model)),
                        Err(e) => ComponentStatus::failed(component, e.to_string()),
                    });
                }
            }
            Err(e) => warn!("Failed to create HTTP client: {}", e),
        }

        statuses
    }

    fn detection_status(&self) -> ComponentStatus {
        if !self.config.detection.enabled {
            ComponentStatus::failed("Language detection", "disabled in configuration")
        } else if !DetectorFactory::compiled_in() {
            ComponentStatus::failed("Language detection", "built without the `detection` feature")
        } else {
            ComponentStatus::ok("Language detection", "whatlang")
        }
    }

    async fn translation_status(&self) -> ComponentStatus {
        let config = &self.config.translate;
        if !config.enabled {
            return ComponentStatus::failed("Translation", "disabled in configuration");
        }

        match self.check_model(&config.endpoint, &config.model).await {
            Ok(()) => ComponentStatus::ok("Translation", format!("{} at {}", config.model, config.endpoint)),
            Err(e) => ComponentStatus::failed("Translation", e.to_string()),
        }
    }

    async fn generation_status(&self) -> ComponentStatus {
        let config = &self.config.generation;
        if !config.enabled {
            return ComponentStatus::failed("Generation", "disabled in configuration");
        }

        match self.check_endpoint(&config.endpoint).await {
            Ok(count) => ComponentStatus::ok("Generation", format!("ollama at {} ({} models)", config.endpoint, count)),
            Err(e) => ComponentStatus::failed("Generation", e.to_string()),
        }
    }

    async fn check_model(&self, endpoint: &str, model: &str) -> Result<()> {
        OllamaClient::new(endpoint, PROBE_TIMEOUT)?.ensure_model(model).await
    }

    async fn check_endpoint(&self, endpoint: &str) -> Result<usize> {
        let models = OllamaClient::new(endpoint, PROBE_TIMEOUT)?.list_models().await?;
        Ok(models.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn disabled_config() -> Config {
        let mut config = Config::default();
        config.detection.enabled = false;
        config.translate.enabled = false;
        config.generation.enabled = false;
        config
    }

    #[tokio::test]
    async fn test_disabled_capabilities_are_not_probed() {
        let probe = CapabilityProbe::new(disabled_config());
        assert_eq!(probe.probe().await, CapabilitySet::none());
    }

    #[tokio::test]
    async fn test_report_lists_core_components() {
        let probe = CapabilityProbe::new(disabled_config());
        let report = probe.report().await;

        assert_eq!(report.len(), 3);
        assert!(report.iter().all(|s| !s.available));
        assert_eq!(report[0].component, "Language detection");
        assert_eq!(report[2].detail, "disabled in configuration");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_disables_translation() {
        let mut config = disabled_config();
        config.translate.enabled = true;
        // Port 9 (discard) is not an ollama server
        config.translate.endpoint = "http://127.0.0.1:9".to_string();

        let capabilities = CapabilityProbe::new(config).probe().await;
        assert!(!capabilities.translation);
    }
}
