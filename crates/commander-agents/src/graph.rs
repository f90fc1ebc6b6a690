//! Investigation graph.
//!
//! Drives one alert through the fixed stage sequence:
//!
//! ```text
//! INIT ──► PARALLEL_INVESTIGATE ──► CORRELATE ──► SYNTHESIZE ──► DONE
//!              (logs ∥ metrics)      (deploy)     (decision)
//! ```
//!
//! The parallel stage runs exactly two investigator tasks on a `JoinSet` and
//! joins both before CORRELATE starts. The first failure there aborts the
//! sibling and fails the run. Every stage is recorded as a span in the run
//! trace, including the one that failed.

use crate::agents::contract::{Investigator, InvestigatorSettings};
use crate::agents::{DeployIntelInvestigator, LogsInvestigator, MetricsInvestigator};
use crate::reasoning::ReasoningService;
use crate::synthesizer::DecisionSynthesizer;
use incident_commander_core::execution::{Artifact, RunTraceCollector, Stage, StageSpan};
use incident_commander_core::prelude::{
    AlertEvent, Config, IncidentRecord, InvestigationOutcome, SharedIncidentRecord,
};
use incident_commander_core::{Error, Result, RunFailure};
use incident_commander_ingestion::telemetry::{DeploySource, LogSource, MetricsSource};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, RwLock, RwLockWriteGuard};
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Orchestrator statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct GraphStats {
    pub runs_started: u64,
    pub runs_completed: u64,
    pub runs_failed: u64,
    /// Runs whose caller stopped waiting before they finished
    pub runs_cancelled: u64,
    /// Failed runs keyed by the stage that failed
    pub failures_by_stage: BTreeMap<String, u64>,
    /// Mean wall time of finished runs (ms)
    pub avg_run_ms: f64,
}

fn write_stats(stats: &RwLock<GraphStats>) -> RwLockWriteGuard<'_, GraphStats> {
    stats.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Counts a run as started when created. Dropped before [`RunGuard::finish`],
/// the run counts as cancelled.
struct RunGuard<'a> {
    stats: &'a RwLock<GraphStats>,
    started: Instant,
    finished: bool,
}

impl<'a> RunGuard<'a> {
    fn start(stats: &'a RwLock<GraphStats>) -> Self {
        write_stats(stats).runs_started += 1;
        Self {
            stats,
            started: Instant::now(),
            finished: false,
        }
    }

    fn finish(mut self, result: &std::result::Result<InvestigationOutcome, RunFailure>) {
        self.finished = true;
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;

        let mut stats = write_stats(self.stats);
        match result {
            Ok(_) => stats.runs_completed += 1,
            Err(failure) => {
                stats.runs_failed += 1;
                *stats
                    .failures_by_stage
                    .entry(failure.stage.as_str().to_string())
                    .or_insert(0) += 1;
            }
        }

        let finished = (stats.runs_completed + stats.runs_failed) as f64;
        stats.avg_run_ms += (elapsed_ms - stats.avg_run_ms) / finished;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            write_stats(self.stats).runs_cancelled += 1;
            warn!(
                elapsed_ms = self.started.elapsed().as_millis() as u64,
                "investigation dropped before finishing"
            );
        }
    }
}

/// Static shape of the graph, as reported by the config endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct GraphDescription {
    pub stages: Vec<Stage>,
    pub parallel_investigators: Vec<&'static str>,
    pub correlate_investigator: &'static str,
}

/// Fixed-shape investigation pipeline.
pub struct InvestigationGraph {
    parallel: [Arc<dyn Investigator>; 2],
    correlate: Arc<dyn Investigator>,
    synthesizer: DecisionSynthesizer,
    stats: Arc<RwLock<GraphStats>>,
}

impl std::fmt::Debug for InvestigationGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvestigationGraph")
            .field("parallel", &[self.parallel[0].name(), self.parallel[1].name()])
            .field("correlate", &self.correlate.name())
            .field("synthesizer", &self.synthesizer)
            .finish()
    }
}

impl InvestigationGraph {
    pub fn new(
        parallel: [Arc<dyn Investigator>; 2],
        correlate: Arc<dyn Investigator>,
        synthesizer: DecisionSynthesizer,
    ) -> Self {
        Self {
            parallel,
            correlate,
            synthesizer,
            stats: Arc::new(RwLock::new(GraphStats::default())),
        }
    }

    /// Wire the standard logs/metrics/deploy roles over the given sources.
    pub fn from_sources(
        config: &Config,
        logs: Arc<dyn LogSource>,
        metrics: Arc<dyn MetricsSource>,
        deploys: Arc<dyn DeploySource>,
        reasoning: Arc<dyn ReasoningService>,
    ) -> Self {
        let settings = InvestigatorSettings::from_config(&config.investigation, &config.reasoning);
        let reasoning_timeout = settings.reasoning_timeout;

        let logs: Arc<dyn Investigator> = Arc::new(LogsInvestigator::new(
            logs,
            Arc::clone(&reasoning),
            settings.clone(),
        ));
        let metrics: Arc<dyn Investigator> = Arc::new(MetricsInvestigator::new(
            metrics,
            Arc::clone(&reasoning),
            settings.clone(),
        ));
        let deploy: Arc<dyn Investigator> = Arc::new(DeployIntelInvestigator::new(
            deploys,
            Arc::clone(&reasoning),
            settings,
        ));

        Self::new(
            [logs, metrics],
            deploy,
            DecisionSynthesizer::new(reasoning, reasoning_timeout),
        )
    }

    pub fn describe(&self) -> GraphDescription {
        let mut stages = vec![Stage::Init];
        while let Some(next) = stages.last().and_then(|s| s.next()) {
            stages.push(next);
        }
        GraphDescription {
            stages,
            parallel_investigators: self.parallel.iter().map(|i| i.name()).collect(),
            correlate_investigator: self.correlate.name(),
        }
    }

    pub fn stats(&self) -> GraphStats {
        self.stats
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Investigate one alert end to end.
    ///
    /// Returns the report and run trace, or the first stage failure with the
    /// trace up to it. A failed run never yields a partial report.
    #[instrument(
        skip_all,
        fields(service = %alert.service, trigger = %alert.trigger_kind)
    )]
    pub async fn run(&self, alert: AlertEvent) -> std::result::Result<InvestigationOutcome, RunFailure> {
        let guard = RunGuard::start(&self.stats);
        let result = self.execute(alert).await;
        guard.finish(&result);
        result
    }

    async fn execute(&self, alert: AlertEvent) -> std::result::Result<InvestigationOutcome, RunFailure> {
        let trace = RunTraceCollector::new();

        // INIT
        let mut span = StageSpan::open(Stage::Init);
        let record = SharedIncidentRecord::new(IncidentRecord::new());
        let incident_id = record.incident_id();
        span.attach_artifact(Artifact {
            reference: incident_id.to_string(),
            kind: "incident_record".to_string(),
        });
        span.complete();
        trace.add_span(span);
        info!(
            incident_id = %incident_id,
            run_id = %trace.run_id(),
            fingerprint = %alert.fingerprint(),
            "investigation started"
        );

        self.stage(
            &trace,
            incident_id,
            Stage::ParallelInvestigate,
            self.investigate_in_parallel(&alert, &record),
        )
        .await?;

        self.stage(
            &trace,
            incident_id,
            Stage::Correlate,
            self.correlate.investigate(&alert, &record),
        )
        .await?;

        let snapshot = record.snapshot().await;
        let rca = self
            .stage(
                &trace,
                incident_id,
                Stage::Synthesize,
                self.synthesizer.synthesize(&snapshot),
            )
            .await?;

        let mut done = StageSpan::open(Stage::Done);
        done.complete();
        trace.add_span(done);
        info!(
            incident_id = %incident_id,
            opened_at = %snapshot.created_at(),
            root_cause = %rca.root_cause,
            "investigation completed"
        );

        Ok(InvestigationOutcome {
            incident_id,
            alert: alert.summary(),
            rca,
            trace: trace.finalize(),
        })
    }

    /// Run one stage under a span. A failure closes the span as failed and
    /// becomes the run failure.
    async fn stage<T, F>(
        &self,
        trace: &RunTraceCollector,
        incident_id: Uuid,
        stage: Stage,
        work: F,
    ) -> std::result::Result<T, RunFailure>
    where
        F: Future<Output = Result<T>>,
    {
        let mut span = StageSpan::open(stage);
        match work.await {
            Ok(value) => {
                span.complete();
                debug!(
                    incident_id = %incident_id,
                    stage = %stage,
                    duration_ms = span.duration_ms(),
                    "stage completed"
                );
                trace.add_span(span);
                Ok(value)
            }
            Err(cause) => {
                error!(
                    incident_id = %incident_id,
                    stage = %stage,
                    code = cause.code(),
                    error = %cause,
                    "stage failed"
                );
                span.fail(vec![cause.to_string()]);
                trace.add_span(span);
                Err(RunFailure::new(Some(incident_id), stage, cause, trace.finalize()))
            }
        }
    }

    /// Both parallel investigators against the same record, joined before
    /// returning. The first failure aborts the other task.
    async fn investigate_in_parallel(
        &self,
        alert: &AlertEvent,
        record: &SharedIncidentRecord,
    ) -> Result<()> {
        let alert = Arc::new(alert.clone());
        let mut tasks = JoinSet::new();

        for investigator in &self.parallel {
            let investigator = Arc::clone(investigator);
            let alert = Arc::clone(&alert);
            let record = record.clone();
            tasks.spawn(async move {
                let name = investigator.name();
                investigator
                    .investigate(&alert, &record)
                    .await
                    .map_err(|e| (name, e))
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err((agent, err))) => {
                    warn!(
                        incident_id = %record.incident_id(),
                        agent,
                        error = %err,
                        "investigator failed, aborting sibling"
                    );
                    tasks.abort_all();
                    return Err(err);
                }
                Err(join_err) => {
                    tasks.abort_all();
                    return Err(Error::TaskAborted(join_err.to_string()));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::StaticReasoning;
    use crate::testing::{sample_alert, FailingTelemetry, SlowReasoning};
    use async_trait::async_trait;
    use incident_commander_core::execution::SpanStatus;
    use incident_commander_ingestion::prelude::FixtureTelemetry;
    use std::time::Duration;

    const REPORT: &str = r#"```json
{"summary":"S","root_cause":"R","evidence_summary":["E1"],"recommended_actions":["A1"]}
```"#;

    fn fixture_graph(reasoning: &str) -> InvestigationGraph {
        let fixture = Arc::new(FixtureTelemetry::new());
        InvestigationGraph::from_sources(
            &Config::default(),
            fixture.clone(),
            fixture.clone(),
            fixture,
            Arc::new(StaticReasoning::new(reasoning)),
        )
    }

    /// Never finishes on its own.
    struct HangingInvestigator;

    #[async_trait]
    impl Investigator for HangingInvestigator {
        fn name(&self) -> &'static str {
            "hanging"
        }

        async fn investigate(&self, _alert: &AlertEvent, _record: &SharedIncidentRecord) -> Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    struct FailingInvestigator;

    #[async_trait]
    impl Investigator for FailingInvestigator {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn investigate(&self, _alert: &AlertEvent, _record: &SharedIncidentRecord) -> Result<()> {
            Err(Error::fetch("logs", "connection refused"))
        }
    }

    #[tokio::test]
    async fn test_run_walks_every_stage() {
        let graph = fixture_graph(REPORT);
        let outcome = graph.run(sample_alert()).await.unwrap();

        assert_eq!(outcome.rca.summary, "S");
        assert_eq!(outcome.alert.service, "api-gateway");
        assert_eq!(
            outcome.trace.stages(),
            vec![
                Stage::Init,
                Stage::ParallelInvestigate,
                Stage::Correlate,
                Stage::Synthesize,
                Stage::Done
            ]
        );
        assert!(outcome.trace.validate().is_ok());

        let stats = graph.stats();
        assert_eq!(stats.runs_started, 1);
        assert_eq!(stats.runs_completed, 1);
        assert_eq!(stats.runs_failed, 0);
    }

    #[tokio::test]
    async fn test_parallel_failure_aborts_sibling_and_run() {
        let hanging: Arc<dyn Investigator> = Arc::new(HangingInvestigator);
        let failing: Arc<dyn Investigator> = Arc::new(FailingInvestigator);
        let graph = InvestigationGraph::new(
            [failing, Arc::clone(&hanging)],
            Arc::new(FailingInvestigator),
            DecisionSynthesizer::new(Arc::new(StaticReasoning::new(REPORT)), Duration::from_secs(5)),
        );

        let failure = graph.run(sample_alert()).await.unwrap_err();

        assert_eq!(failure.stage, Stage::ParallelInvestigate);
        assert!(failure.incident_id.is_some());
        assert!(matches!(failure.cause, Error::Fetch { .. }));

        // The aborted task releases its handle on the investigator once dropped.
        for _ in 0..10 {
            if Arc::strong_count(&hanging) == 2 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(Arc::strong_count(&hanging), 2);

        let stats = graph.stats();
        assert_eq!(stats.runs_failed, 1);
        assert_eq!(stats.failures_by_stage["parallel_investigate"], 1);
    }

    #[tokio::test]
    async fn test_correlate_failure_names_stage() {
        let fixture = Arc::new(FixtureTelemetry::new());
        let graph = InvestigationGraph::from_sources(
            &Config::default(),
            fixture.clone(),
            fixture,
            Arc::new(FailingTelemetry),
            Arc::new(StaticReasoning::new(REPORT)),
        );

        let failure = graph.run(sample_alert()).await.unwrap_err();
        assert_eq!(failure.stage, Stage::Correlate);
    }

    #[tokio::test]
    async fn test_synthesis_failure_yields_no_report() {
        let graph = fixture_graph("I think it was the database.");
        let failure = graph.run(sample_alert()).await.unwrap_err();

        assert_eq!(failure.stage, Stage::Synthesize);
        assert!(matches!(failure.cause, Error::SynthesisParse(_)));

        assert_eq!(
            failure.trace.stages(),
            vec![
                Stage::Init,
                Stage::ParallelInvestigate,
                Stage::Correlate,
                Stage::Synthesize
            ]
        );
        let failed = &failure.trace.spans[3];
        assert_eq!(failed.status, SpanStatus::Failed);
        assert!(failed.end_time.is_some());
        assert_eq!(failed.failure_reasons, vec![failure.cause.to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_run_counts_as_cancelled() {
        let fixture = Arc::new(FixtureTelemetry::new());
        let graph = InvestigationGraph::from_sources(
            &Config::default(),
            fixture.clone(),
            fixture.clone(),
            fixture,
            Arc::new(SlowReasoning(Duration::from_secs(100))),
        );

        let waited = tokio::time::timeout(Duration::from_secs(50), graph.run(sample_alert())).await;
        assert!(waited.is_err());

        let stats = graph.stats();
        assert_eq!(stats.runs_started, 1);
        assert_eq!(stats.runs_cancelled, 1);
        assert_eq!(stats.runs_completed, 0);
        assert_eq!(stats.runs_failed, 0);
        assert_eq!(stats.avg_run_ms, 0.0);
    }

    #[tokio::test]
    async fn test_failed_span_is_recorded() {
        let graph = fixture_graph("not json");
        let trace = RunTraceCollector::new();
        let result: std::result::Result<(), RunFailure> = graph
            .stage(&trace, Uuid::new_v4(), Stage::Synthesize, async {
                Err(Error::synthesis_parse("bad"))
            })
            .await;

        let failure = result.unwrap_err();
        assert_eq!(failure.trace.run_id, trace.run_id());
        assert_eq!(failure.trace.spans.len(), 1);
        let spans = trace.finalize().spans;
        assert_eq!(spans[0].status, SpanStatus::Failed);
        assert_eq!(spans[0].failure_reasons.len(), 1);
    }

    #[test]
    fn test_describe() {
        let description = fixture_graph(REPORT).describe();
        assert_eq!(description.stages.len(), 5);
        assert_eq!(description.parallel_investigators, vec!["logs", "metrics"]);
        assert_eq!(description.correlate_investigator, "deploy_intel");
    }
}
