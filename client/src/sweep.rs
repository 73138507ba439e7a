use chrono::{DateTime, Utc};
use common::Application;
use tracing::{debug, info};

use crate::api::SharedApi;
use crate::config::RestageConfig;
use crate::error::SweepError;
use crate::report::Reporter;
use crate::restage::BuildOrchestrator;
use crate::restart::RestartOrchestrator;

/// App names by outcome, in listing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub restaged: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

impl SweepSummary {
    pub fn line(&self) -> String {
        format!(
            "Restaged {}, skipped {}, failed {}",
            self.restaged.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}

/// Whole days since `created_at`, rounded down.
pub fn droplet_age_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_seconds().div_euclid(86_400)
}

enum AppOutcome {
    Restaged,
    Skipped,
    Failed,
}

/// One pass over every app in scope, restaging the ones that qualify.
pub struct Sweep<'a> {
    api: SharedApi,
    config: &'a RestageConfig,
    reporter: &'a dyn Reporter,
    builds: BuildOrchestrator,
    restarts: RestartOrchestrator,
}

impl<'a> Sweep<'a> {
    pub fn new(api: SharedApi, config: &'a RestageConfig, reporter: &'a dyn Reporter) -> Self {
        Self {
            builds: BuildOrchestrator::new(api.clone(), config),
            restarts: RestartOrchestrator::new(api.clone(), config),
            api,
            config,
            reporter,
        }
    }

    /// Fails only when the app list cannot be fetched or is empty. Every
    /// other problem is reported against its app and the sweep moves on.
    pub async fn run(&self) -> Result<SweepSummary, SweepError> {
        let apps = self
            .api
            .list_applications()
            .await
            .map_err(SweepError::ListApplications)?;
        if apps.is_empty() {
            return Err(SweepError::NoApplications);
        }
        info!("sweeping {} apps", apps.len());

        let mut summary = SweepSummary::default();
        for app in &apps {
            let bucket = match self.process(app).await {
                AppOutcome::Restaged => &mut summary.restaged,
                AppOutcome::Skipped => &mut summary.skipped,
                AppOutcome::Failed => &mut summary.failed,
            };
            bucket.push(app.name.clone());
        }

        Ok(summary)
    }

    async fn process(&self, app: &Application) -> AppOutcome {
        if app.state != self.config.state_filter {
            self.reporter.warn(&format!(
                "Skipping restage on {} in {} state",
                app.name, app.state
            ));
            return AppOutcome::Skipped;
        }

        let age = match self.api.get_current_droplet(&app.guid).await {
            Ok(droplet) => droplet_age_days(droplet.created_at, Utc::now()),
            Err(e) => {
                self.reporter.error(&format!("Error: {}: {}", app.name, e));
                return AppOutcome::Failed;
            }
        };
        debug!("{} droplet is {} days old", app.name, age);
        if age < i64::from(self.config.min_age_days) {
            self.reporter.warn(&format!(
                "Skipping restage on {} as app age is {}",
                app.name, age
            ));
            return AppOutcome::Skipped;
        }

        self.reporter
            .info(&format!("Starting restage of {}", app.name));

        match self.builds.restage(app).await {
            Ok(true) => {}
            Ok(false) => {
                self.reporter.error("Failed to restage application");
                return AppOutcome::Failed;
            }
            Err(e) => {
                self.reporter
                    .error(&format!("Error generating build for {}: {}", app.name, e));
                return AppOutcome::Failed;
            }
        }

        match self.restarts.restart_and_confirm(&app.guid).await {
            Ok(true) => {
                self.reporter
                    .success(&format!("{} has been restaged successfully", app.name));
                AppOutcome::Restaged
            }
            Ok(false) => {
                self.reporter
                    .error(&format!("{} has NOT been restaged successfully", app.name));
                AppOutcome::Failed
            }
            Err(e) => {
                self.reporter
                    .error(&format!("Error restarting {}: {}", app.name, e));
                AppOutcome::Failed
            }
        }
    }
}
