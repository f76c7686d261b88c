pub mod groups;
pub mod history;
pub mod routes;

use std::fmt;

use tracing::{debug, info};

use crate::{
    config::{DuplicateNavigation, RouterConfig},
    location::RouteData,
};
use groups::RouteTable;
use history::{History, HistoryEvent};
use routes::EncodeError;

/// Where the router currently is.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// Name of the matched route.
    pub name: String,
    /// Encoded path, without query and fragment.
    pub path: String,
    /// Encoded path including query and fragment.
    pub full_path: String,
    pub data: RouteData,
}

/// Where a navigation should go.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationTarget {
    Named { name: String, data: RouteData },
    Url(String),
}

impl NavigationTarget {
    pub fn named(name: impl Into<String>, data: RouteData) -> Self {
        Self::Named {
            name: name.into(),
            data,
        }
    }
}

impl From<&str> for NavigationTarget {
    fn from(url: &str) -> Self {
        Self::Url(url.to_owned())
    }
}

impl From<String> for NavigationTarget {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NavigationError {
    #[error("no route named `{0}`")]
    UnknownRoute(String),
    #[error("a route named `{0}` already exists")]
    DuplicateRoute(String),
    #[error("no route matches `{0}`")]
    NoMatch(String),
    #[error("already at `{0}`")]
    DuplicateNavigation(String),
    #[error("failed to encode route")]
    Encode(#[from] EncodeError),
}

/// Handle returned by [`Router::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&Location) + Send>;

#[derive(Clone, Copy)]
enum Action {
    Push,
    Replace,
    /// The history already moved, only follow it.
    Follow,
}

/// Keeps the current [`Location`] in step with a [`History`] and tells
/// listeners about every change.
pub struct Router<H> {
    table: RouteTable,
    history: H,
    config: RouterConfig,
    location: Location,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl<H: History> Router<H> {
    /// Fails with [`NavigationError::NoMatch`] if the history's current path
    /// matches no route.
    pub fn new(table: RouteTable, history: H, config: RouterConfig) -> Result<Self, NavigationError> {
        let current = history.current_path();
        let location = table
            .resolve(&current, config.match_strategy)?
            .ok_or(NavigationError::NoMatch(current))?;

        debug!(route = %location.name, path = %location.full_path, "router started");

        Ok(Self {
            table,
            history,
            config,
            location,
            listeners: Vec::new(),
            next_id: 0,
        })
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn routes(&self) -> &RouteTable {
        &self.table
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    /// Direct access to the backend, e.g. to queue events. Changes only show
    /// up in [`Router::location`] after [`Router::sync`].
    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }

    /// Navigates to `target`, adding a history entry.
    ///
    /// Returns `false` if the navigation was ignored as a duplicate.
    pub fn push(&mut self, target: impl Into<NavigationTarget>) -> Result<bool, NavigationError> {
        let location = self.locate(target.into())?;
        self.navigate(location, Action::Push)
    }

    /// Navigates to `target`, overwriting the current history entry.
    pub fn replace(
        &mut self,
        target: impl Into<NavigationTarget>,
    ) -> Result<bool, NavigationError> {
        let location = self.locate(target.into())?;
        self.navigate(location, Action::Replace)
    }

    pub fn back(&mut self) -> Result<(), NavigationError> {
        self.history.back();
        self.sync()
    }

    pub fn forward(&mut self) -> Result<(), NavigationError> {
        self.history.forward();
        self.sync()
    }

    pub fn go(&mut self, delta: isize) -> Result<(), NavigationError> {
        self.history.go(delta);
        self.sync()
    }

    /// Applies an event reported by the history backend.
    pub fn handle(&mut self, event: HistoryEvent) -> Result<bool, NavigationError> {
        debug!(?event, "history event");

        match event {
            HistoryEvent::Pop(url) => {
                let location = self.locate(NavigationTarget::Url(url))?;
                self.navigate(location, Action::Follow)
            }
            HistoryEvent::Push(url) => {
                let location = self.locate(NavigationTarget::Url(url))?;
                self.navigate(location, Action::Push)
            }
        }
    }

    /// Handles every pending history event, stopping at the first failure.
    pub fn sync(&mut self) -> Result<(), NavigationError> {
        while let Some(event) = self.history.poll_event() {
            self.handle(event)?;
        }
        Ok(())
    }

    /// Renders the URL of the route called `name`.
    pub fn encode(&self, name: &str, data: &RouteData) -> Result<String, NavigationError> {
        let route = self.table.get(name)?;
        Ok(route.pattern().encode(data)?)
    }

    /// Resolves `url` against the route table without navigating.
    pub fn decode(&self, url: &str) -> Result<Location, NavigationError> {
        self.locate(NavigationTarget::Url(url.to_owned()))
    }

    /// Registers `listener` and calls it right away with the current
    /// location.
    pub fn subscribe<F>(&mut self, mut listener: F) -> SubscriptionId
    where
        F: FnMut(&Location) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        listener(&self.location);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(other, _)| *other != id);
        self.listeners.len() != before
    }

    fn locate(&self, target: NavigationTarget) -> Result<Location, NavigationError> {
        match target {
            NavigationTarget::Named { name, data } => self.table.get(&name)?.locate(&data),
            NavigationTarget::Url(url) => self
                .table
                .resolve(&url, self.config.match_strategy)?
                .ok_or(NavigationError::NoMatch(url)),
        }
    }

    fn navigate(&mut self, location: Location, action: Action) -> Result<bool, NavigationError> {
        if location.full_path == self.location.full_path {
            match self.config.on_duplicate_navigation {
                DuplicateNavigation::Ignore => {
                    debug!(path = %location.full_path, "ignoring duplicate navigation");
                    return Ok(false);
                }
                DuplicateNavigation::Error => {
                    return Err(NavigationError::DuplicateNavigation(location.full_path));
                }
            }
        }

        match action {
            Action::Push => self.history.push_state(&location.full_path),
            Action::Replace => self.history.replace_state(&location.full_path),
            Action::Follow => {}
        }

        info!(route = %location.name, path = %location.full_path, "navigated");
        self.location = location;

        for (_, listener) in &mut self.listeners {
            listener(&self.location);
        }

        Ok(true)
    }
}

impl<H: fmt::Debug> fmt::Debug for Router<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("table", &self.table)
            .field("history", &self.history)
            .field("config", &self.config)
            .field("location", &self.location)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{
        config::MatchStrategy,
        router::{
            groups::Route,
            history::MemoryHistory,
            routes::Pattern,
        },
    };
    use pretty_assertions::assert_eq;

    fn table() -> RouteTable {
        let mut table = RouteTable::new();
        for (name, template) in [
            ("home", "/"),
            ("settings", "/users/settings"),
            ("user", "/users/{id:integer}"),
        ] {
            table
                .insert(Route::new(name, Pattern::parse(template).unwrap()))
                .unwrap();
        }
        table
    }

    fn router() -> Router<MemoryHistory> {
        Router::new(table(), MemoryHistory::new(), RouterConfig::default()).unwrap()
    }

    fn recorder(router: &mut Router<MemoryHistory>) -> (SubscriptionId, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = router.subscribe(move |location| {
            sink.lock().unwrap().push(location.full_path.clone());
        });
        (id, seen)
    }

    #[test]
    fn starts_at_history_location() {
        let history = MemoryHistory::with_entry("/users/3?tab=posts");
        let router = Router::new(table(), history, RouterConfig::default()).unwrap();

        let location = router.location();
        assert_eq!(location.name, "user");
        assert_eq!(location.path, "/users/3");
        assert_eq!(location.full_path, "/users/3?tab=posts");
        assert_eq!(
            location.data,
            RouteData::new().param("id", 3i64).search("tab", "posts")
        );
    }

    #[test]
    fn unmatched_start_is_an_error() {
        let history = MemoryHistory::with_entry("/nowhere");
        let err = Router::new(table(), history, RouterConfig::default()).unwrap_err();
        assert!(matches!(err, NavigationError::NoMatch(url) if url == "/nowhere"));
    }

    #[test]
    fn push_by_name_and_url() {
        let mut router = router();

        assert!(router
            .push(NavigationTarget::named("user", RouteData::new().param("id", 7i64)))
            .unwrap());
        assert_eq!(router.history().current_path(), "/users/7");

        assert!(router.push("/users/8#bio").unwrap());
        assert_eq!(router.location().data.hash, "bio");
        assert_eq!(router.history().len(), 3);
    }

    #[test]
    fn replace_overwrites_current_entry() {
        let mut router = router();
        router.push("/users/1").unwrap();
        router.replace("/users/2").unwrap();

        assert_eq!(router.history().len(), 2);
        assert_eq!(router.history().current_path(), "/users/2");
        assert_eq!(router.location().name, "user");
    }

    #[test]
    fn subscribe_calls_listener_immediately_and_on_change() {
        let mut router = router();
        let (_, seen) = recorder(&mut router);

        router.push("/users/1").unwrap();
        router.push("/users/settings").unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            ["/", "/users/1", "/users/settings"]
        );
    }

    #[test]
    fn unsubscribed_listener_is_not_called() {
        let mut router = router();
        let (id, seen) = recorder(&mut router);

        assert!(router.unsubscribe(id));
        assert!(!router.unsubscribe(id));

        router.push("/users/1").unwrap();
        assert_eq!(*seen.lock().unwrap(), ["/"]);
    }

    #[test]
    fn duplicate_navigation_is_ignored_by_default() {
        let mut router = router();
        router.push("/users/1").unwrap();
        let (_, seen) = recorder(&mut router);

        assert!(!router.push("/users/01").unwrap());
        assert_eq!(router.history().len(), 2);
        assert_eq!(*seen.lock().unwrap(), ["/users/1"]);
    }

    #[test]
    fn duplicate_navigation_can_be_an_error() {
        let config =
            RouterConfig::default().on_duplicate_navigation(DuplicateNavigation::Error);
        let mut router = Router::new(table(), MemoryHistory::new(), config).unwrap();

        let err = router.push("/").unwrap_err();
        assert!(matches!(err, NavigationError::DuplicateNavigation(path) if path == "/"));
    }

    #[test]
    fn back_and_forward_follow_history() {
        let mut router = router();
        let (_, seen) = recorder(&mut router);
        router.push("/users/1").unwrap();
        router.push("/users/2").unwrap();

        router.back().unwrap();
        assert_eq!(router.location().full_path, "/users/1");

        router.go(-1).unwrap();
        assert_eq!(router.location().name, "home");

        router.forward().unwrap();
        assert_eq!(router.location().full_path, "/users/1");
        assert_eq!(router.history().len(), 3);

        assert_eq!(
            *seen.lock().unwrap(),
            ["/", "/users/1", "/users/2", "/users/1", "/", "/users/1"]
        );
    }

    #[test]
    fn events_from_the_backend_are_applied_on_sync() {
        let mut router = router();
        router
            .history_mut()
            .emit(HistoryEvent::Push("/users/5".to_owned()));
        assert_eq!(router.location().name, "home");

        router.sync().unwrap();
        assert_eq!(router.location().full_path, "/users/5");
        assert_eq!(router.history().current_path(), "/users/5");
    }

    #[test]
    fn pop_to_unknown_url_fails() {
        let mut router = router();
        let err = router
            .handle(HistoryEvent::Pop("/nowhere".to_owned()))
            .unwrap_err();
        assert!(matches!(err, NavigationError::NoMatch(_)));
        assert_eq!(router.location().name, "home");
    }

    #[test]
    fn unknown_route_name() {
        let mut router = router();
        let err = router
            .push(NavigationTarget::named("missing", RouteData::new()))
            .unwrap_err();
        assert!(matches!(err, NavigationError::UnknownRoute(name) if name == "missing"));
    }

    #[test]
    fn encode_and_decode_by_name() {
        let router = router();

        let data = RouteData::new().param("id", 42i64).search("q", "a b");
        assert_eq!(router.encode("user", &data).unwrap(), "/users/42?q=a+b");

        let location = router.decode("/users/42?q=a+b").unwrap();
        assert_eq!(location.name, "user");
        assert_eq!(location.data, data);

        let err = router.encode("user", &RouteData::new()).unwrap_err();
        assert!(matches!(
            err,
            NavigationError::Encode(EncodeError::MissingParameter(name)) if name == "id"
        ));
    }

    #[test]
    fn ranked_strategy_prefers_static_route() {
        let config = RouterConfig::default().match_strategy(MatchStrategy::Ranked);
        let mut table = RouteTable::new();
        table
            .insert(Route::new("home", Pattern::parse("/").unwrap()))
            .unwrap();
        table
            .insert(Route::new("page", Pattern::parse("/{page}").unwrap()))
            .unwrap();
        table
            .insert(Route::new("about", Pattern::parse("/about").unwrap()))
            .unwrap();
        let router = Router::new(table, MemoryHistory::new(), config).unwrap();

        assert_eq!(router.decode("/about").unwrap().name, "about");
        assert_eq!(router.decode("/contact").unwrap().name, "page");
    }

    #[test]
    fn named_navigation_matches_url_navigation() {
        let mut router = router();
        router
            .push(NavigationTarget::named(
                "user",
                RouteData::new()
                    .param("id", 7i64)
                    .param("bogus", "x")
                    .hash("a b"),
            ))
            .unwrap();

        let location = router.location().clone();
        assert_eq!(location.full_path, "/users/7#a%20b");
        assert_eq!(location, router.decode(&location.full_path).unwrap());

        router.push("/").unwrap();
        router.back().unwrap();
        assert_eq!(router.location(), &location);
    }

    #[test]
    fn integer_params_survive_navigation() {
        let mut router = router();
        router
            .push(NavigationTarget::named(
                "user",
                RouteData::new().param("id", 12i64).hash("top"),
            ))
            .unwrap();

        let location = router.location();
        assert_eq!(location.full_path, "/users/12#top");
        assert_eq!(location.data.get("id").and_then(|id| id.as_i64()), Some(12));
    }
}
