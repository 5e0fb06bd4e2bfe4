//! Subcommand implementations

use anyhow::{Context, Result};
use osa_backend::BackendCache;
use osa_context::{ConnectorRegistry, StaticConnector};
use osa_orchestrator::{Pipeline, PipelineSettings, RouteRequest};
use osa_rollout::SubjectContext;
use osa_types::{MaturityPhase, OrgMeta, RunResult, Scenario, TracingSink};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Settings from `path`, or defaults, with environment credentials applied
pub(crate) fn load_settings(path: Option<&Path>) -> Result<PipelineSettings> {
    let settings = match path {
        Some(path) => PipelineSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => PipelineSettings::default(),
    };
    Ok(settings.with_env_credentials())
}

/// Organization metadata from a JSON file
pub(crate) fn load_org(path: &Path) -> Result<OrgMeta> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading organization file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("parsing organization file {}", path.display()))
}

/// Connector registry serving a JSON file keyed by bucket name
///
/// Without a file the registry is empty and every bucket falls back.
pub(crate) fn load_registry(path: Option<&Path>) -> Result<ConnectorRegistry> {
    let Some(path) = path else {
        return Ok(ConnectorRegistry::new());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading context file {}", path.display()))?;
    let document: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("parsing context file {}", path.display()))?;
    Ok(ConnectorRegistry::new().with_all(Arc::new(StaticConnector::from_json(&document))))
}

async fn build_pipeline(settings: &PipelineSettings, registry: ConnectorRegistry) -> Result<Pipeline> {
    let cache = BackendCache::default();
    let pipeline = Pipeline::from_settings(settings, registry, &cache, Arc::new(TracingSink))
        .await
        .context("building pipeline")?;
    info!(
        provider = %settings.backend.provider,
        model = %settings.backend.model_name(),
        scenario = %pipeline.config().scenario,
        test_id = %pipeline.test_id(),
        "pipeline ready"
    );
    Ok(pipeline)
}

/// `osa run`
pub(crate) async fn run(
    settings: &PipelineSettings,
    org: &OrgMeta,
    registry: ConnectorRegistry,
    scenario: Option<Scenario>,
    json: bool,
) -> Result<bool> {
    let pipeline = build_pipeline(settings, registry).await?;
    let result = pipeline.run_pipeline(org, scenario).await;
    if result.success {
        info!(run_id = %result.run_id, confidence = %result.confidence, "run succeeded");
    } else {
        warn!(
            run_id = %result.run_id,
            errors = result.errors.len(),
            "run degraded to the fallback document"
        );
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", render_summary(&result));
    }
    Ok(result.success)
}

/// `osa assign`
pub(crate) async fn assign(
    settings: &PipelineSettings,
    subject_id: &str,
    group: Option<&str>,
    phase: Option<MaturityPhase>,
    industry: Option<&str>,
) -> Result<()> {
    let pipeline = build_pipeline(settings, ConnectorRegistry::new()).await?;
    let mut ctx = SubjectContext::now();
    ctx.maturity_phase = phase;
    ctx.industry = industry.map(str::to_string);
    let assignment = pipeline
        .rollout()
        .assign_variant(pipeline.test_id(), subject_id, group, &ctx);
    info!(
        subject_id,
        variant = %assignment.variant,
        reason = %assignment.reason,
        "subject assigned"
    );
    println!("{}", serde_json::to_string_pretty(&assignment)?);
    Ok(())
}

/// `osa route`: assign, run the assigned arm and report both
pub(crate) async fn route(
    settings: &PipelineSettings,
    org: OrgMeta,
    registry: ConnectorRegistry,
    subject_id: &str,
    group: Option<&str>,
) -> Result<()> {
    let pipeline = build_pipeline(settings, registry).await?;
    let mut request = RouteRequest::new(subject_id, org);
    if let Some(group) = group {
        request = request.with_group(group);
    }
    let routed = pipeline.route(request).await;
    println!("{}", serde_json::to_string_pretty(&routed.assignment)?);
    print!("{}", render_summary(&routed.result));
    Ok(())
}

/// `osa check-config`
pub(crate) fn check_config(settings: &PipelineSettings) -> Result<String> {
    settings.validate().context("invalid settings")?;
    let loop_config = settings.orchestrator_config();
    let mut out = String::new();
    let _ = writeln!(out, "settings ok");
    let _ = writeln!(
        out,
        "backend: {} ({}), {} attempts",
        settings.backend.provider,
        settings.backend.model_name(),
        settings.backend.retry.max_attempts
    );
    let _ = writeln!(
        out,
        "loop: {} scenario, {} passes, threshold {:.2}, backend timeout {}ms",
        loop_config.scenario,
        loop_config.max_passes,
        loop_config.quality_threshold,
        loop_config.backend_timeout_ms
    );
    let _ = writeln!(
        out,
        "rollout: {} at {}%, max error rate {:.2}, max latency {}ms",
        settings.rollout.test_id,
        settings.rollout.treatment_percentage,
        settings.rollout.safeguards.max_error_rate,
        settings.rollout.safeguards.max_latency_ms
    );
    Ok(out)
}

/// Human-readable run summary
pub(crate) fn render_summary(result: &RunResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", result.document.title);
    let _ = writeln!(
        out,
        "run {} | {} | passes {} | confidence {} | {}",
        result.run_id,
        result.scenario,
        result.generation_passes(),
        result.confidence,
        if result.success { "ok" } else { "fallback" }
    );
    if let Some(overall) = result.final_overall() {
        let _ = writeln!(out, "overall quality {overall:.2}/5");
    }
    for section in &result.document.sections {
        let _ = writeln!(out, "\n## {}\n{}", section.kind.heading(), section.summary);
        for item in &section.recommendations {
            let _ = writeln!(out, "- {item}");
        }
        for target in &section.kpi_targets {
            let _ = writeln!(out, "* {}: {}", target.kpi, target.target);
        }
    }
    for error in &result.errors {
        let _ = writeln!(out, "\nerror: {error}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn org_file_round_trips_through_serde() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"org_name":"Acme","industry":"Retail","maturity_phase":"growth","primary_kpis":["conversion rate"]}}"#
        )
        .unwrap();
        let org = load_org(file.path()).unwrap();
        assert_eq!(org.org_name, "Acme");
        assert_eq!(org.maturity_phase, MaturityPhase::Growth);
    }

    #[test]
    fn bad_org_file_names_the_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = load_org(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing organization file"));
    }

    #[test]
    fn default_settings_check_out() {
        let report = check_config(&load_settings(None).unwrap()).unwrap();
        assert!(report.starts_with("settings ok"));
        assert!(report.contains("offline"));
    }

    #[test]
    fn context_file_feeds_registry() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"analytics":{{"sessions":10}}}}"#).unwrap();
        let registry = load_registry(Some(file.path())).unwrap();
        assert_eq!(registry.buckets().len(), 4);
    }

    #[tokio::test]
    async fn offline_run_succeeds() {
        let settings = load_settings(None).unwrap();
        let ok = run(
            &settings,
            &OrgMeta::new("Acme", "Retail"),
            ConnectorRegistry::new(),
            Some(Scenario::Speed),
            true,
        )
        .await
        .unwrap();
        assert!(ok);
    }
}
