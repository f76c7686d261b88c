use tracing::debug;

use crate::{
    config::RouterConfig,
    router::{
        groups::{Group, RouteTable},
        history::History,
        routes::{CompileError, Segment},
        NavigationError, Router,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("route `{name}` failed to compile")]
    Route {
        name: String,
        #[source]
        source: CompileError,
    },
    #[error(transparent)]
    Navigation(#[from] NavigationError),
}

/// Collects routes and configuration, then starts a [`Router`].
///
/// ```
/// use typeroute::{integer, App, MemoryHistory, Segment};
///
/// let mut app = App::new();
/// app.route("home", ["/"]);
/// app.mount("/users", |group| {
///     group.add("user", [Segment::from("/"), Segment::from(integer("id"))]);
/// });
///
/// let mut router = app.run(MemoryHistory::new())?;
/// router.push("/users/7")?;
/// assert_eq!(router.location().name, "user");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct App {
    root: Group,
    groups: Vec<Group>,
    config: RouterConfig,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            root: Group::new(""),
            groups: Vec::new(),
            config,
        }
    }

    pub fn config_mut(&mut self) -> &mut RouterConfig {
        &mut self.config
    }

    pub fn mount<P, F>(&mut self, prefix: P, func: F) -> &mut App
    where
        P: Into<Segment>,
        F: FnOnce(&mut Group),
    {
        let mut group = Group::new(prefix);

        func(&mut group);

        self.groups.push(group);
        self
    }

    pub fn mount_group(&mut self, group: Group) -> &mut App {
        self.groups.push(group);
        self
    }

    /// Registers a route outside of any group.
    pub fn route<I, S>(&mut self, name: &str, segments: I) -> &mut App
    where
        I: IntoIterator<Item = S>,
        S: Into<Segment>,
    {
        self.root.add(name, segments);
        self
    }

    /// Collects all routes, ungrouped ones first, then groups in mount order.
    pub fn build(self) -> Result<RouteTable, AppError> {
        let mut table = RouteTable::new();

        for group in std::iter::once(self.root).chain(self.groups) {
            for route in group.finish()? {
                table.insert(route)?;
            }
        }

        debug!(routes = table.len(), "route table built");
        Ok(table)
    }

    pub fn run<H: History>(self, history: H) -> Result<Router<H>, AppError> {
        let config = self.config.clone();
        let table = self.build()?;
        Ok(Router::new(table, history, config)?)
    }
}
