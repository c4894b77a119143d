//! Generate command

use crate::config::{GenerateOptions, Settings};
use crate::output::{print_info, print_success};
use crate::GenerateArgs;
use anyhow::{Context, Result};
use kbom_lib::{Collector, Filters, Format, KubeSource, Mode, Output, OutputSink, RunConfig};
use std::sync::Arc;
use tracing::debug;

/// Collect the cluster inventory and write the document
pub async fn run(context: Option<String>, args: GenerateArgs, settings: Settings) -> Result<()> {
    let options = GenerateOptions::resolve(context, args, settings);
    debug!(?options, "Resolved generate options");

    // Both are checked before touching the cluster
    let format = Format::from_name(&options.format)
        .with_context(|| format!("Supported formats: {}", Format::names().join(", ")))?;
    let output = Output::from_name(&options.output)
        .with_context(|| format!("Supported outputs: {}", Output::names().join(", ")))?;

    let config = run_config(&options);
    let source = KubeSource::connect(options.context.as_deref())
        .await
        .context("Failed to create Kubernetes client")?;

    if output == Output::File {
        print_info(&format!("Collecting inventory from {}", source_name(&options)));
    }

    let collector = Collector::new(Arc::new(source), config);
    let snapshot = collector
        .collect()
        .await
        .context("Failed to collect cluster inventory")?;

    let sink = OutputSink::new(output, &options.out_path);
    let written = sink
        .write(&snapshot, format, collector.logger())
        .with_context(|| format!("Failed to write {} document", format))?;

    if let Some(path) = written {
        print_success(&format!("BOM written to {}", path.display()));
    }

    Ok(())
}

fn run_config(options: &GenerateOptions) -> RunConfig {
    let defaults = RunConfig::default();
    RunConfig {
        mode: Mode::from_short_flag(options.short),
        filters: Filters::parse(&options.namespace, &options.resource),
        request_timeout: options.request_timeout.unwrap_or(defaults.request_timeout),
        concurrency: options.concurrency.unwrap_or(defaults.concurrency),
        ..defaults
    }
}

fn source_name(options: &GenerateOptions) -> &str {
    options.context.as_deref().unwrap_or("the current context")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_run_config_from_options() {
        let args = GenerateArgs {
            short: true,
            namespace: Some("Default, backend".to_string()),
            resource: Some("Pod".to_string()),
            request_timeout_secs: Some(5),
            ..Default::default()
        };
        let options = GenerateOptions::resolve(None, args, Settings::default());
        let config = run_config(&options);

        assert_eq!(config.mode, Mode::Short);
        assert!(config.filters.allows_namespace("default"));
        assert!(config.filters.allows_namespace("backend"));
        assert!(!config.filters.allows_namespace("kube-system"));
        assert!(config.filters.allows_kind("Pod"));
        assert!(!config.filters.allows_kind("Deployment"));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.concurrency, RunConfig::default().concurrency);
    }
}
