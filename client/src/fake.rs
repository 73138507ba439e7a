//! Scripted in-memory `PlatformApi` that records every call.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use common::{AppState, Application, Build, BuildState, GuidRef};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::api::{CurrentDroplet, PlatformApi};
use crate::error::PlatformError;

pub const BUILD_GUID: &str = "build-1234";
pub const DROPLET_GUID: &str = "abcd";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListApplications,
    GetCurrentDroplet(String),
    SubmitBuild(String),
    GetBuild(String),
    AssignDroplet(String, String),
    RestartApplication(String),
    GetApplication(String),
}

impl Call {
    /// Calls that change something on the platform.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Call::SubmitBuild(_) | Call::AssignDroplet(..) | Call::RestartApplication(_)
        )
    }
}

#[derive(Default)]
struct FakeState {
    apps: Vec<Application>,
    ages: HashMap<String, i64>,
    list_error: bool,
    build_states: VecDeque<BuildState>,
    app_states: VecDeque<AppState>,
    echo_guid: Option<String>,
    staged_without_droplet: bool,
    fail_submit: bool,
    fail_restart: bool,
    calls: Vec<Call>,
}

fn pop_sticky<T: Clone>(queue: &mut VecDeque<T>, default: T) -> T {
    if queue.len() > 1 {
        queue.pop_front().unwrap_or(default)
    } else {
        queue.front().cloned().unwrap_or(default)
    }
}

fn boom(what: &str) -> PlatformError {
    PlatformError::Status {
        method: "GET".to_string(),
        path: what.to_string(),
        status: 500,
        detail: "some horrible error occurred".to_string(),
    }
}

#[derive(Default)]
pub struct FakeApi {
    state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an app whose current droplet is `age_days` old. A negative age
    /// means the app has no current droplet.
    pub fn with_app(self, name: &str, state: &str, age_days: i64) -> Self {
        {
            let mut s = self.state.lock().unwrap();
            let guid = format!("guid-{name}");
            s.apps.push(Application {
                guid: guid.clone(),
                name: name.to_string(),
                state: AppState::from(state),
            });
            if age_days >= 0 {
                s.ages.insert(guid, age_days);
            }
        }
        self
    }

    /// States returned by successive `get_build` calls; the last one repeats.
    pub fn build_states(self, states: &[&str]) -> Self {
        self.state.lock().unwrap().build_states =
            states.iter().map(|s| BuildState::from(*s)).collect();
        self
    }

    /// States returned by successive `get_application` calls; the last one repeats.
    pub fn app_states(self, states: &[&str]) -> Self {
        self.state.lock().unwrap().app_states =
            states.iter().map(|s| AppState::from(*s)).collect();
        self
    }

    pub fn echo(self, guid: &str) -> Self {
        self.state.lock().unwrap().echo_guid = Some(guid.to_string());
        self
    }

    /// Staged builds come back with no droplet attached.
    pub fn staged_without_droplet(self) -> Self {
        self.state.lock().unwrap().staged_without_droplet = true;
        self
    }

    pub fn failing_list(self) -> Self {
        self.state.lock().unwrap().list_error = true;
        self
    }

    pub fn failing_submit(self) -> Self {
        self.state.lock().unwrap().fail_submit = true;
        self
    }

    pub fn failing_restart(self) -> Self {
        self.state.lock().unwrap().fail_restart = true;
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutating).collect()
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl PlatformApi for FakeApi {
    async fn list_applications(&self) -> Result<Vec<Application>, PlatformError> {
        self.record(Call::ListApplications);
        let s = self.state.lock().unwrap();
        if s.list_error {
            return Err(boom("/v3/apps"));
        }
        Ok(s.apps.clone())
    }

    async fn get_current_droplet(&self, app_guid: &str) -> Result<CurrentDroplet, PlatformError> {
        self.record(Call::GetCurrentDroplet(app_guid.to_string()));
        let s = self.state.lock().unwrap();
        let age = s.ages.get(app_guid).copied().ok_or_else(|| {
            PlatformError::NotFound(format!("current droplet for app {app_guid}"))
        })?;
        Ok(CurrentDroplet {
            package_guid: format!("pkg-{app_guid}"),
            created_at: Utc::now() - ChronoDuration::days(age) - ChronoDuration::minutes(5),
        })
    }

    async fn submit_build(&self, package_guid: &str) -> Result<Build, PlatformError> {
        self.record(Call::SubmitBuild(package_guid.to_string()));
        if self.state.lock().unwrap().fail_submit {
            return Err(boom("/v3/builds"));
        }
        Ok(Build {
            guid: BUILD_GUID.to_string(),
            state: BuildState::Pending,
            droplet: None,
        })
    }

    async fn get_build(&self, build_guid: &str) -> Result<Build, PlatformError> {
        self.record(Call::GetBuild(build_guid.to_string()));
        let mut s = self.state.lock().unwrap();
        let state = pop_sticky(&mut s.build_states, BuildState::Staged);
        let droplet = (state == BuildState::Staged && !s.staged_without_droplet)
            .then(|| GuidRef::new(DROPLET_GUID));
        Ok(Build {
            guid: build_guid.to_string(),
            state,
            droplet,
        })
    }

    async fn assign_droplet(
        &self,
        app_guid: &str,
        droplet_guid: &str,
    ) -> Result<bool, PlatformError> {
        self.record(Call::AssignDroplet(
            app_guid.to_string(),
            droplet_guid.to_string(),
        ));
        let s = self.state.lock().unwrap();
        let echoed = s.echo_guid.as_deref().unwrap_or(droplet_guid);
        Ok(echoed == droplet_guid)
    }

    async fn restart_application(&self, app_guid: &str) -> Result<(), PlatformError> {
        self.record(Call::RestartApplication(app_guid.to_string()));
        if self.state.lock().unwrap().fail_restart {
            return Err(boom("/v3/apps/actions/restart"));
        }
        Ok(())
    }

    async fn get_application(&self, app_guid: &str) -> Result<Application, PlatformError> {
        self.record(Call::GetApplication(app_guid.to_string()));
        let mut s = self.state.lock().unwrap();
        let state = pop_sticky(&mut s.app_states, AppState::Started);
        let name = s
            .apps
            .iter()
            .find(|a| a.guid == app_guid)
            .map(|a| a.name.clone())
            .unwrap_or_default();
        Ok(Application {
            guid: app_guid.to_string(),
            name,
            state,
        })
    }
}
