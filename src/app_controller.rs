use anyhow::{anyhow, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::app_config::Config;
use crate::subtitle_processor::{write_srt_file, SubtitleCollection};
use crate::translation::{Dispatcher, Event, RunContext, RunReport};

// @module: Application controller for subtitle processing

/// Name of the file collecting warnings and errors of a run
pub const ISSUES_LOG_NAME: &str = "polysub.issues.log";

const PROGRESS_TICK: Duration = Duration::from_millis(250);

/// What a finished (or stopped) run produced
#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    pub output_path: PathBuf,
    pub report: RunReport,
    /// Present when the run recorded warnings or errors
    pub issues_log: Option<PathBuf>,
}

/// Main application controller for subtitle translation
pub struct Controller {
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Default output file: `translated_<name>` beside the input
    pub fn default_output_path(input_file: &Path) -> PathBuf {
        let name = input_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "subtitles.srt".to_string());
        input_file.with_file_name(format!("translated_{}", name))
    }

    /// Loads `input_file`, translates it with every eligible backend and
    /// exports the result. Ctrl-C stops the run; the partial document is
    /// still written.
    pub async fn run(&self, input_file: &Path, output_file: &Path, force_overwrite: bool) -> Result<TranslationOutcome> {
        if !input_file.is_file() {
            return Err(anyhow!("Input file does not exist: {}", input_file.display()));
        }
        if output_file.exists() && !force_overwrite {
            return Err(anyhow!(
                "Output file already exists: {}. Use -f to force overwrite.",
                output_file.display()
            ));
        }

        let collection = SubtitleCollection::read_from_file(input_file)?;
        if collection.units.is_empty() {
            return Err(anyhow!("No subtitles found in {}", input_file.display()));
        }
        info!(
            "Loaded {} subtitle(s) from {}",
            collection.units.len(),
            collection.source_file.display()
        );

        let context = Arc::new(RunContext::new(collection.units, self.config.backends.clone()));
        let dispatcher = Dispatcher::from_config(Arc::clone(&context), &self.config.dispatch);

        for backend in self.config.eligible_backends() {
            info!("Backend: {} ({})", backend.label(), backend.provider_type.display_name());
        }

        let report = self.run_with_progress(&dispatcher).await?;

        write_srt_file(output_file, &context.units_snapshot())?;
        info!("Success: {}", output_file.display());

        let issues = context.events().issues();
        let issues_log = if issues.is_empty() {
            None
        } else {
            let dir = output_file.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let path = dir.join(ISSUES_LOG_NAME);
            match self.write_issues_log(&issues, &path) {
                Ok(()) => {
                    info!("Logs written to {}", path.display());
                    Some(path)
                }
                Err(e) => {
                    warn!("Failed to write logs to file: {}", e);
                    None
                }
            }
        };

        self.log_summary(&report);

        Ok(TranslationOutcome {
            output_path: output_file.to_path_buf(),
            report,
            issues_log,
        })
    }

    /// Drives the run while polling its statistics into a progress bar
    async fn run_with_progress(&self, dispatcher: &Dispatcher) -> Result<RunReport> {
        let context = dispatcher.context();
        let progress_bar = ProgressBar::new(context.unit_count() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} lines ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar.set_message("Translating");

        let run = dispatcher.run(&self.config.translation);
        tokio::pin!(run);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut ticker = tokio::time::interval(PROGRESS_TICK);
        let mut stop_requested = false;

        let result = loop {
            tokio::select! {
                result = &mut run => break result,
                _ = ticker.tick() => {
                    let stats = context.stats().snapshot();
                    if stats.total_units > 0 {
                        progress_bar.set_length(stats.total_units as u64);
                    }
                    progress_bar.set_position(stats.processed() as u64);
                    if stats.failed > 0 {
                        progress_bar.set_message(format!("{} failed", stats.failed));
                    }
                }
                signal = &mut ctrl_c, if !stop_requested => {
                    stop_requested = true;
                    match signal {
                        Ok(()) => {
                            progress_bar.set_message("Stopping");
                            dispatcher.cancel();
                        }
                        Err(e) => debug!("Ctrl-C handler unavailable: {}", e),
                    }
                }
            }
        };

        progress_bar.finish_and_clear();
        result.context("Translation could not start")
    }

    fn log_summary(&self, report: &RunReport) {
        let stats = &report.stats;
        let elapsed = stats
            .duration()
            .and_then(|d| d.to_std().ok())
            .map(Self::format_duration)
            .unwrap_or_else(|| "-".to_string());

        for lane in &report.lanes {
            debug!(
                "{}: {} batch(es) done, {} failed",
                lane.lane, lane.batches_completed, lane.batches_failed
            );
        }

        if stats.failed > 0 {
            error!(
                "Translation finished with {} failed line(s) out of {} ({})",
                stats.failed, stats.total_units, elapsed
            );
        } else if report.cancelled {
            warn!(
                "Translation stopped after {} of {} line(s) ({})",
                stats.processed(),
                stats.total_units,
                elapsed
            );
        } else {
            info!("Translated {} line(s) in {}", stats.completed, elapsed);
        }
    }

    // Format duration in a human-readable format (HH:MM:SS)
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }

    /// Write warning and error events to a log file
    fn write_issues_log(&self, issues: &[Event], path: &Path) -> Result<()> {
        let settings = &self.config.translation;
        let mut content = format!(
            "Translation Log - {}\nContext: {} -> {} ({})\n\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            settings.source_language,
            settings.target_language,
            settings.domain.display_name()
        );
        for event in issues {
            content.push_str(&event.to_string());
            content.push('\n');
        }

        fs::write(path, content).with_context(|| format!("Failed to write issues log: {}", path.display()))?;
        Ok(())
    }
}
