use common::{Application, BuildState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::SharedApi;
use crate::config::RestageConfig;
use crate::error::PlatformError;
use crate::poller::{wait_until, WaitMessages, WaitOutcome};

const BUILD_WAIT: WaitMessages = WaitMessages {
    waiting: "Processing Build",
    done: "Build created",
    failed: "Build failed",
    timed_out: "Timed out waiting for build",
};

/// Builds a fresh droplet from an app's current package and makes it the
/// app's current droplet.
pub struct BuildOrchestrator {
    api: SharedApi,
    poll_interval: Duration,
    stage_timeout: Duration,
}

impl BuildOrchestrator {
    pub fn new(api: SharedApi, config: &RestageConfig) -> Self {
        Self {
            api,
            poll_interval: config.poll_interval,
            stage_timeout: config.stage_timeout,
        }
    }

    /// `Ok(false)` when staging did not finish in time or the platform did
    /// not confirm the droplet assignment.
    ///
    /// A build that lands in `FAILED` is not told apart from one still
    /// staging; both run into the stage timeout.
    pub async fn restage(&self, app: &Application) -> Result<bool, PlatformError> {
        let package = self.api.get_current_droplet(&app.guid).await?.package_guid;
        let build = self.api.submit_build(&package).await?;
        info!(
            "submitted build {} for {} (package {})",
            build.guid, app.name, package
        );

        let api = Arc::clone(&self.api);
        let build_guid = build.guid.clone();
        let outcome = wait_until(
            move || {
                let api = Arc::clone(&api);
                let build_guid = build_guid.clone();
                async move {
                    let build = api.get_build(&build_guid).await?;
                    Ok::<_, PlatformError>(build.state == BuildState::Staged)
                }
            },
            self.poll_interval,
            self.stage_timeout,
            &BUILD_WAIT,
        )
        .await?;

        if outcome == WaitOutcome::TimedOut {
            warn!(
                "build {} for {} not staged within {:?}",
                build.guid, app.name, self.stage_timeout
            );
            return Ok(false);
        }

        let staged = self.api.get_build(&build.guid).await?;
        let droplet = staged.droplet_guid().ok_or_else(|| {
            PlatformError::decode(
                &format!("/v3/builds/{}", build.guid),
                "staged build has no droplet",
            )
        })?;

        let assigned = self.api.assign_droplet(&app.guid, droplet).await?;
        if !assigned {
            warn!("platform did not confirm droplet {} for {}", droplet, app.name);
        }
        Ok(assigned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{Call, FakeApi, BUILD_GUID, DROPLET_GUID};
    use common::AppState;

    fn app() -> Application {
        Application {
            guid: "guid-app1".to_string(),
            name: "app1".to_string(),
            state: AppState::Started,
        }
    }

    fn config(stage_timeout_secs: u64) -> RestageConfig {
        RestageConfig {
            stage_timeout: Duration::from_secs(stage_timeout_secs),
            ..RestageConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn staged_build_is_assigned() {
        let fake = FakeApi::new().with_app("app1", "started", 3).shared();
        let orchestrator = BuildOrchestrator::new(fake.clone(), &config(120));

        assert!(orchestrator.restage(&app()).await.unwrap());
        assert_eq!(
            fake.calls(),
            vec![
                Call::GetCurrentDroplet("guid-app1".to_string()),
                Call::SubmitBuild("pkg-guid-app1".to_string()),
                Call::GetBuild(BUILD_GUID.to_string()),
                Call::GetBuild(BUILD_GUID.to_string()),
                Call::AssignDroplet("guid-app1".to_string(), DROPLET_GUID.to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn waits_through_staging() {
        let fake = FakeApi::new()
            .with_app("app1", "started", 3)
            .build_states(&["PENDING", "STAGING", "STAGED"])
            .shared();
        let orchestrator = BuildOrchestrator::new(fake.clone(), &config(120));

        assert!(orchestrator.restage(&app()).await.unwrap());
        let polls = fake
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::GetBuild(_)))
            .count();
        assert_eq!(polls, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn stage_timeout_skips_assignment() {
        let fake = FakeApi::new()
            .with_app("app1", "started", 3)
            .build_states(&["PENDING"])
            .shared();
        let orchestrator = BuildOrchestrator::new(fake.clone(), &config(1));

        assert!(!orchestrator.restage(&app()).await.unwrap());
        assert!(!fake
            .calls()
            .iter()
            .any(|c| matches!(c, Call::AssignDroplet(..))));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_build_waits_for_the_timeout() {
        let fake = FakeApi::new()
            .with_app("app1", "started", 3)
            .build_states(&["FAILED"])
            .shared();
        let orchestrator = BuildOrchestrator::new(fake.clone(), &config(5));

        let started = tokio::time::Instant::now();
        assert!(!orchestrator.restage(&app()).await.unwrap());
        assert!(started.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn mismatched_echo_is_a_failed_restage() {
        let fake = FakeApi::new()
            .with_app("app1", "started", 3)
            .echo("someone-else")
            .shared();
        let orchestrator = BuildOrchestrator::new(fake, &config(120));

        assert!(!orchestrator.restage(&app()).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn staged_build_without_droplet_is_a_decode_error() {
        let fake = FakeApi::new()
            .with_app("app1", "started", 3)
            .staged_without_droplet()
            .shared();
        let orchestrator = BuildOrchestrator::new(fake.clone(), &config(120));

        let err = orchestrator.restage(&app()).await.unwrap_err();
        assert!(matches!(err, PlatformError::Decode { .. }));
        assert!(err.to_string().contains("staged build has no droplet"));
        assert!(!fake
            .calls()
            .iter()
            .any(|c| matches!(c, Call::AssignDroplet(..))));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_droplet_propagates_not_found() {
        let fake = FakeApi::new().with_app("app1", "started", -1).shared();
        let orchestrator = BuildOrchestrator::new(fake.clone(), &config(120));

        let err = orchestrator.restage(&app()).await.unwrap_err();
        assert!(matches!(err, PlatformError::NotFound(_)));
        assert!(fake.mutating_calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn submit_error_propagates() {
        let fake = FakeApi::new()
            .with_app("app1", "started", 3)
            .failing_submit()
            .shared();
        let orchestrator = BuildOrchestrator::new(fake, &config(120));

        let err = orchestrator.restage(&app()).await.unwrap_err();
        assert!(err.to_string().contains("some horrible error occurred"));
    }
}
