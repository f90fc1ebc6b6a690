//! Deploy-intelligence investigator (historian).
//!
//! Runs after the logs and metrics investigators. Its prompt embeds the
//! record's rendered context so the reasoning service can correlate their
//! findings with recent deploys and config changes. Besides a finding it
//! appends a hypothesis that cites the deploy evidence.

use crate::agents::contract::{
    prompt_json, Investigator, InvestigatorSettings, DEPLOY_EVIDENCE, DEPLOY_INTEL_AGENT,
};
use crate::reasoning::{complete_within, ReasoningService};
use async_trait::async_trait;
use chrono::Utc;
use incident_commander_core::prelude::{AlertEvent, SharedIncidentRecord};
use incident_commander_core::Result;
use incident_commander_ingestion::telemetry::DeploySource;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// Confidence attached to every deploy-intelligence finding
pub const DEPLOY_INTEL_CONFIDENCE: f64 = 0.90;

pub const DEPLOY_INTEL_SYSTEM_PROMPT: &str = "You are a Deploy Intel Agent (Historian). Correlate incidents with:
- Recent CI/CD deployments
- Configuration changes (pool size, timeouts, etc.)
- Latent configuration bugs

Use findings from Logs and Metrics agents if available. Be concise. Output a finding and a hypothesis about root cause.";

/// Investigator over deploy and config-change history.
pub struct DeployIntelInvestigator {
    source: Arc<dyn DeploySource>,
    reasoning: Arc<dyn ReasoningService>,
    settings: InvestigatorSettings,
}

impl DeployIntelInvestigator {
    pub fn new(
        source: Arc<dyn DeploySource>,
        reasoning: Arc<dyn ReasoningService>,
        settings: InvestigatorSettings,
    ) -> Self {
        Self {
            source,
            reasoning,
            settings,
        }
    }
}

impl std::fmt::Debug for DeployIntelInvestigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployIntelInvestigator")
            .field("source", &self.source.name())
            .field("settings", &self.settings)
            .finish()
    }
}

#[async_trait]
impl Investigator for DeployIntelInvestigator {
    fn name(&self) -> &'static str {
        DEPLOY_INTEL_AGENT
    }

    async fn investigate(&self, alert: &AlertEvent, record: &SharedIncidentRecord) -> Result<()> {
        let since = Utc::now() - self.settings.deploy_lookback;

        let deploys = self
            .settings
            .fetch_within(
                self.source.name(),
                self.source.fetch_deploy_history(&alert.service, since),
            )
            .await?;
        debug!(
            incident_id = %record.incident_id(),
            service = %alert.service,
            count = deploys.len(),
            "fetched deploy history"
        );

        let deploys_json = prompt_json(&deploys)?;
        let evidence_id = record
            .add_evidence(DEPLOY_EVIDENCE, json!({ "deployments": deploys }))
            .await;

        let context = record.render_context().await;
        let prompt = format!(
            "{}\n\nExisting findings from other agents:\n{}\n\nDeployment history:\n{}\n\nCorrelate the incident with recent deployments and config changes. What hypothesis do you have for the root cause?",
            alert.headline(),
            context,
            deploys_json
        );

        let response = complete_within(
            self.reasoning.as_ref(),
            self.settings.reasoning_timeout,
            DEPLOY_INTEL_SYSTEM_PROMPT,
            &prompt,
        )
        .await?;

        record
            .add_finding(DEPLOY_INTEL_AGENT, response.clone(), DEPLOY_INTEL_CONFIDENCE)
            .await?;
        record.add_hypothesis(response, vec![evidence_id]).await;
        info!(
            incident_id = %record.incident_id(),
            agent = DEPLOY_INTEL_AGENT,
            "deploy finding and hypothesis recorded"
        );
        Ok(())
    }
}
