use common::AppState;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::api::SharedApi;
use crate::config::RestageConfig;
use crate::error::PlatformError;
use crate::poller::{wait_until, WaitMessages, WaitOutcome};

const RESTART_WAIT: WaitMessages = WaitMessages {
    waiting: "Restarting Application",
    done: "Application Restarted",
    failed: "Failed to restart application",
    timed_out: "Timed out waiting for application restart",
};

pub struct RestartOrchestrator {
    api: SharedApi,
    poll_interval: Duration,
    restart_timeout: Duration,
}

impl RestartOrchestrator {
    pub fn new(api: SharedApi, config: &RestageConfig) -> Self {
        Self {
            api,
            poll_interval: config.poll_interval,
            restart_timeout: config.restart_timeout,
        }
    }

    /// Restarts the app and waits for it to report `STARTED`. `Ok(false)`
    /// means it did not get there before the restart timeout.
    pub async fn restart_and_confirm(&self, app_guid: &str) -> Result<bool, PlatformError> {
        self.api.restart_application(app_guid).await?;

        let api = Arc::clone(&self.api);
        let guid = app_guid.to_string();
        let outcome = wait_until(
            move || {
                let api = Arc::clone(&api);
                let guid = guid.clone();
                async move {
                    let app = api.get_application(&guid).await?;
                    Ok::<_, PlatformError>(app.state == AppState::Started)
                }
            },
            self.poll_interval,
            self.restart_timeout,
            &RESTART_WAIT,
        )
        .await?;

        if outcome == WaitOutcome::TimedOut {
            warn!("app {} not started within {:?}", app_guid, self.restart_timeout);
        }
        Ok(outcome == WaitOutcome::Done)
    }
}
