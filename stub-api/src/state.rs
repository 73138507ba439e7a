use chrono::{DateTime, Duration, Utc};
use common::{AppState, Application, Build, BuildState, GuidRef};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub struct StubDroplet {
    pub guid: String,
    pub package_guid: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StubApp {
    pub guid: String,
    pub name: String,
    pub state: String,
    pub space_guid: Option<String>,
    pub droplet: Option<StubDroplet>,
    // states served by GET /v3/apps/:guid after a restart
    pending_states: VecDeque<String>,
}

impl StubApp {
    /// App with guid `guid-<name>` and a current droplet created just now.
    pub fn new(name: &str, state: &str) -> Self {
        let guid = format!("guid-{name}");
        Self {
            droplet: Some(StubDroplet {
                guid: format!("droplet-{name}"),
                package_guid: format!("pkg-{name}"),
                created_at: Utc::now(),
            }),
            guid,
            name: name.to_string(),
            state: state.to_string(),
            space_guid: None,
            pending_states: VecDeque::new(),
        }
    }

    pub fn aged_days(mut self, days: i64) -> Self {
        if let Some(droplet) = self.droplet.as_mut() {
            droplet.created_at = Utc::now() - Duration::days(days) - Duration::minutes(1);
        }
        self
    }

    pub fn without_droplet(mut self) -> Self {
        self.droplet = None;
        self
    }

    pub fn in_space(mut self, space_guid: &str) -> Self {
        self.space_guid = Some(space_guid.to_string());
        self
    }

    fn view(&self) -> Application {
        Application {
            guid: self.guid.clone(),
            name: self.name.clone(),
            state: AppState::from(self.state.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
struct StubBuild {
    guid: String,
    package_guid: String,
    states: VecDeque<String>,
    state: String,
    droplet_guid: String,
}

impl StubBuild {
    fn view(&self) -> Build {
        let state = BuildState::from(self.state.as_str());
        let droplet = (state == BuildState::Staged).then(|| GuidRef::new(&self.droplet_guid));
        Build {
            guid: self.guid.clone(),
            state,
            droplet,
        }
    }
}

#[derive(Debug)]
struct Inner {
    apps: Vec<StubApp>,
    builds: HashMap<String, StubBuild>,
    build_script: Vec<String>,
    restart_script: Vec<String>,
    echo_override: Option<String>,
    fail_listing: bool,
    page_size: Option<usize>,
    calls: Vec<String>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            apps: Vec::new(),
            builds: HashMap::new(),
            build_script: vec!["STAGED".to_string()],
            restart_script: vec!["STARTED".to_string()],
            echo_override: None,
            fail_listing: false,
            page_size: None,
            calls: Vec::new(),
        }
    }
}

/// Shared, scriptable state behind the stub API.
///
/// By default builds are `STAGED` on the first poll and restarted apps are
/// `STARTED` on the first poll.
#[derive(Clone, Default)]
pub struct StubState {
    inner: Arc<Mutex<Inner>>,
}

/// Advances through a script; the last entry repeats.
fn next_sticky(queue: &mut VecDeque<String>) -> Option<String> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

impl StubState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_app(self, app: StubApp) -> Self {
        self.lock().apps.push(app);
        self
    }

    /// States returned by successive polls of every new build.
    pub fn build_states(self, states: &[&str]) -> Self {
        self.lock().build_script = states.iter().map(|s| s.to_string()).collect();
        self
    }

    /// States returned by successive polls of an app after it is restarted.
    pub fn restart_states(self, states: &[&str]) -> Self {
        self.lock().restart_script = states.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Echo this guid from the current-droplet relationship instead of the
    /// requested one.
    pub fn echo_droplet(self, guid: &str) -> Self {
        self.lock().echo_override = Some(guid.to_string());
        self
    }

    pub fn failing_listing(self) -> Self {
        self.lock().fail_listing = true;
        self
    }

    pub fn page_size(self, size: usize) -> Self {
        self.lock().page_size = Some(size.max(1));
        self
    }

    /// Every request seen so far, as `"METHOD /path"`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn app(&self, guid: &str) -> Option<StubApp> {
        self.lock().apps.iter().find(|a| a.guid == guid).cloned()
    }

    pub(crate) fn record(&self, call: String) {
        self.lock().calls.push(call);
    }

    pub(crate) fn effective_page_size(&self, requested: Option<usize>) -> usize {
        self.lock()
            .page_size
            .unwrap_or_else(|| requested.unwrap_or(50).max(1))
    }

    /// One page of apps and whether more follow. `None` when listing is set
    /// to fail.
    pub(crate) fn list_apps(
        &self,
        space_guids: Option<&str>,
        page: usize,
        per_page: usize,
    ) -> Option<(Vec<Application>, bool)> {
        let inner = self.lock();
        if inner.fail_listing {
            return None;
        }
        let spaces: Option<Vec<&str>> = space_guids.map(|s| s.split(',').collect());
        let visible: Vec<Application> = inner
            .apps
            .iter()
            .filter(|a| match (&spaces, &a.space_guid) {
                (None, _) => true,
                (Some(spaces), Some(space)) => spaces.contains(&space.as_str()),
                (Some(_), None) => false,
            })
            .map(StubApp::view)
            .collect();

        let start = page.saturating_sub(1) * per_page;
        let items: Vec<Application> = visible.iter().skip(start).take(per_page).cloned().collect();
        let has_next = start + per_page < visible.len();
        Some((items, has_next))
    }

    pub(crate) fn get_app(&self, guid: &str) -> Option<Application> {
        let mut inner = self.lock();
        let app = inner.apps.iter_mut().find(|a| a.guid == guid)?;
        if let Some(state) = next_sticky(&mut app.pending_states) {
            app.state = state;
        }
        Some(app.view())
    }

    pub(crate) fn current_droplet(&self, app_guid: &str) -> Option<StubDroplet> {
        let inner = self.lock();
        inner
            .apps
            .iter()
            .find(|a| a.guid == app_guid)
            .and_then(|a| a.droplet.clone())
    }

    /// Starts a build for a package some app is running; `None` for an
    /// unknown package.
    pub(crate) fn create_build(&self, package_guid: &str) -> Option<Build> {
        let mut inner = self.lock();
        let known = inner.apps.iter().any(|a| {
            a.droplet
                .as_ref()
                .is_some_and(|d| d.package_guid == package_guid)
        });
        if !known {
            return None;
        }

        let guid = uuid::Uuid::new_v4().to_string();
        let build = StubBuild {
            guid: guid.clone(),
            package_guid: package_guid.to_string(),
            states: inner.build_script.iter().cloned().collect(),
            state: "STAGING".to_string(),
            droplet_guid: uuid::Uuid::new_v4().to_string(),
        };
        let view = build.view();
        inner.builds.insert(guid, build);
        Some(view)
    }

    pub(crate) fn poll_build(&self, guid: &str) -> Option<Build> {
        let mut inner = self.lock();
        let build = inner.builds.get_mut(guid)?;
        if let Some(state) = next_sticky(&mut build.states) {
            build.state = state;
        }
        Some(build.view())
    }

    /// Points the app at a staged droplet and returns the guid to echo.
    /// `None` when the app is unknown; `Some(None)` when the droplet is not
    /// a staged build output.
    pub(crate) fn assign_droplet(&self, app_guid: &str, droplet_guid: &str) -> Option<Option<String>> {
        let mut inner = self.lock();
        let staged = inner
            .builds
            .values()
            .find(|b| {
                b.droplet_guid == droplet_guid
                    && BuildState::from(b.state.as_str()) == BuildState::Staged
            })
            .map(|b| b.package_guid.clone());
        let echo = inner.echo_override.clone();

        let app = inner.apps.iter_mut().find(|a| a.guid == app_guid)?;
        let Some(package_guid) = staged else {
            return Some(None);
        };
        app.droplet = Some(StubDroplet {
            guid: droplet_guid.to_string(),
            package_guid,
            created_at: Utc::now(),
        });
        Some(Some(echo.unwrap_or_else(|| droplet_guid.to_string())))
    }

    pub(crate) fn restart(&self, app_guid: &str) -> Option<Application> {
        let mut inner = self.lock();
        let script: VecDeque<String> = inner.restart_script.iter().cloned().collect();
        let app = inner.apps.iter_mut().find(|a| a.guid == app_guid)?;
        app.state = "STARTING".to_string();
        app.pending_states = script;
        Some(app.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_script_advances_and_sticks() {
        let state = StubState::new()
            .with_app(StubApp::new("app1", "STARTED"))
            .build_states(&["PENDING", "STAGED"]);

        let build = state.create_build("pkg-app1").unwrap();
        assert_eq!(state.poll_build(&build.guid).unwrap().state, BuildState::Pending);
        let staged = state.poll_build(&build.guid).unwrap();
        assert_eq!(staged.state, BuildState::Staged);
        assert!(staged.droplet_guid().is_some());
        assert_eq!(state.poll_build(&build.guid).unwrap().state, BuildState::Staged);
    }

    #[test]
    fn unknown_package_is_rejected() {
        let state = StubState::new().with_app(StubApp::new("app1", "STARTED"));
        assert!(state.create_build("nope").is_none());
    }

    #[test]
    fn assignment_requires_a_staged_droplet() {
        let state = StubState::new().with_app(StubApp::new("app1", "STARTED"));
        assert_eq!(state.assign_droplet("guid-app1", "random"), Some(None));
        assert_eq!(state.assign_droplet("missing", "random"), None);

        let build = state.create_build("pkg-app1").unwrap();
        let droplet = state.poll_build(&build.guid).unwrap();
        let droplet = droplet.droplet_guid().unwrap();
        assert_eq!(
            state.assign_droplet("guid-app1", droplet),
            Some(Some(droplet.to_string()))
        );
        assert_eq!(state.current_droplet("guid-app1").unwrap().guid, droplet);
    }

    #[test]
    fn restart_runs_the_restart_script() {
        let state = StubState::new()
            .with_app(StubApp::new("app1", "STARTED"))
            .restart_states(&["STARTING", "STARTED"]);

        assert_eq!(state.restart("guid-app1").unwrap().state, AppState::from("STARTING"));
        assert_eq!(state.get_app("guid-app1").unwrap().state, AppState::from("STARTING"));
        assert_eq!(state.get_app("guid-app1").unwrap().state, AppState::Started);
    }

    #[test]
    fn listing_pages_and_space_filter() {
        let state = StubState::new()
            .with_app(StubApp::new("a", "STARTED").in_space("s1"))
            .with_app(StubApp::new("b", "STARTED").in_space("s2"))
            .with_app(StubApp::new("c", "STOPPED").in_space("s1"));

        let (first, more) = state.list_apps(None, 1, 2).unwrap();
        assert_eq!(first.len(), 2);
        assert!(more);
        let (second, more) = state.list_apps(None, 2, 2).unwrap();
        assert_eq!(second[0].name, "c");
        assert!(!more);

        let (scoped, _) = state.list_apps(Some("s1"), 1, 50).unwrap();
        let names: Vec<_> = scoped.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }
}
