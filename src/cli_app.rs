//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::Parser;
use colored::{Colorize, control};

use dashclock::core::config::{DashboardSettings, DatasourceRegistry, SettingsInput};
use dashclock::core::errors::{DashError, Result};
use dashclock::metrics::backend::{PrometheusBackend, query_range_url};
use dashclock::tui::run_dashboard;
use dashclock::tui::theme::AccessibilityProfile;

/// Terminal wall clock cycling through Prometheus metric charts.
#[derive(Debug, Parser)]
#[command(
    name = "dashclock",
    author,
    version,
    about = "Full-screen terminal clock with a rotating Prometheus chart",
    long_about = None
)]
pub struct Cli {
    /// Show a fixed clock ("23:59", "Wed 28 Mar") for layout checks.
    #[arg(long)]
    test: bool,
    /// Seconds between datasource switches.
    #[arg(long, value_name = "SECONDS")]
    refresh: Option<u64>,
    /// IANA timezone for the clock and chart labels.
    #[arg(long, value_name = "ZONE")]
    timezone: Option<String>,
    /// Datasource list (JSON).
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
    /// Chart window in steps, or `auto` to fill the terminal width.
    #[arg(long, value_name = "N|auto")]
    window: Option<String>,
    /// Seconds between chart points.
    #[arg(long, value_name = "SECONDS")]
    step: Option<u64>,
    /// Line color policy: `worst` or `historical`.
    #[arg(long, value_name = "POLICY")]
    color_policy: Option<String>,
    /// JSONL activity log path.
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
    /// Validate the configuration, print the datasources and exit.
    #[arg(long)]
    check: bool,
}

impl Cli {
    fn settings_input(&self) -> SettingsInput {
        SettingsInput {
            file: self.file.clone(),
            refresh_secs: self.refresh,
            timezone: self.timezone.clone(),
            window: self.window.clone(),
            step_secs: self.step,
            color_policy: self.color_policy.clone(),
            log_file: self.log_file.clone(),
            test_mode: self.test,
        }
    }
}

/// Resolve configuration, then hand over to the dashboard.
///
/// Everything that can fail on bad input is checked before the terminal is
/// taken over, so startup errors print to a normal screen.
pub fn run(cli: &Cli) -> Result<()> {
    let no_color = cli.no_color || AccessibilityProfile::from_environment().no_color();
    if no_color || !io::stdout().is_terminal() {
        control::set_override(false);
    }

    let settings = DashboardSettings::resolve(&cli.settings_input())?;
    let registry = DatasourceRegistry::load(&settings.file)?;

    if cli.check {
        return print_check(&settings, &registry);
    }

    let backend = PrometheusBackend::new()?;
    run_dashboard(
        &settings,
        registry,
        Box::new(backend),
        AccessibilityProfile::from_no_color_flag(no_color),
    )
}

fn print_check(settings: &DashboardSettings, registry: &DatasourceRegistry) -> Result<()> {
    let mut out = io::stdout().lock();
    let mut line = |text: String| {
        writeln!(out, "{text}").map_err(|e| DashError::io("<stdout>", e))
    };

    line(format!(
        "{} {} ({} sources, refresh {}s, timezone {})",
        "config".bold(),
        settings.file.display(),
        registry.len(),
        settings.refresh.as_secs(),
        settings.timezone.name(),
    ))?;
    for (index, source) in registry.iter().enumerate() {
        let endpoint = match query_range_url(&source.endpoint) {
            Ok(_) => source.endpoint.green(),
            Err(err) => format!("{} ({err})", source.endpoint).red(),
        };
        let thresholds = if source.thresholds_enabled() {
            format!("warn>{} error>{}", source.warn_threshold, source.error_threshold)
        } else {
            "no thresholds".to_string()
        };
        line(format!(
            "  [{index}] {} {} {}",
            source.title.bold(),
            endpoint,
            thresholds.dimmed(),
        ))?;
    }
    Ok(())
}
