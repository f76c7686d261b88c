use std::{cmp::Reverse, fmt, iter};

use tracing::trace;

use super::{
    routes::{CompileError, Pattern, Segment},
    Location, NavigationError,
};
use crate::{app::AppError, config::MatchStrategy, location::RouteData};

/// A named pattern.
#[derive(Debug, Clone)]
pub struct Route {
    name: String,
    pattern: Pattern,
}

impl Route {
    pub fn new(name: impl Into<String>, pattern: Pattern) -> Self {
        Self {
            name: name.into(),
            pattern,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    /// Snapshot of this route at `data`.
    ///
    /// The snapshot carries what the rendered URL decodes to, so keys the
    /// pattern does not know are dropped and values take the variant their
    /// decoder produces.
    pub fn locate(&self, data: &RouteData) -> Result<Location, NavigationError> {
        let path = self.pattern.encode_path(&data.params)?;
        let full_path = crate::location::render(&path, &data.search, &data.hash);

        let data = self
            .pattern
            .decode(&full_path)
            .ok_or_else(|| NavigationError::NoMatch(full_path.clone()))?;

        Ok(Location {
            name: self.name.clone(),
            path,
            full_path,
            data,
        })
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.pattern)
    }
}

/// Named routes in registration order.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, route: Route) -> Result<(), NavigationError> {
        if self.routes.iter().any(|existing| existing.name == route.name) {
            return Err(NavigationError::DuplicateRoute(route.name));
        }

        self.routes.push(route);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Route, NavigationError> {
        self.routes
            .iter()
            .find(|route| route.name == name)
            .ok_or_else(|| NavigationError::UnknownRoute(name.to_owned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes in the order `strategy` tries them.
    pub fn candidates(&self, strategy: MatchStrategy) -> Vec<&Route> {
        let mut routes: Vec<&Route> = self.routes.iter().collect();
        if strategy == MatchStrategy::Ranked {
            routes.sort_by_key(|route| Reverse(route.pattern.rank()));
        }
        routes
    }

    /// The location `url` points at, or [`None`] if no route matches.
    pub fn resolve(
        &self,
        url: &str,
        strategy: MatchStrategy,
    ) -> Result<Option<Location>, NavigationError> {
        let found = self
            .candidates(strategy)
            .into_iter()
            .find_map(|route| route.pattern.decode(url).map(|data| (route, data)));

        match found {
            Some((route, data)) => {
                trace!(route = %route, url, "resolved");
                route.locate(&data).map(Some)
            }
            None => Ok(None),
        }
    }
}

impl<'a> IntoIterator for &'a RouteTable {
    type Item = &'a Route;
    type IntoIter = std::slice::Iter<'a, Route>;

    fn into_iter(self) -> Self::IntoIter {
        self.routes.iter()
    }
}

/// Routes sharing a common prefix.
///
/// # Examples
///
/// ```
/// use typeroute::{integer, App, Group, Pattern, Segment};
///
/// let mut group = Group::new(Pattern::parse("/users")?);
/// group.add("users", [""]);
/// group.add("user", [Segment::from("/"), Segment::from(integer("id"))]);
///
/// let mut app = App::new();
/// app.mount_group(group);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// or
///
/// ```
/// use typeroute::{integer, App, Segment};
///
/// let mut app = App::new();
///
/// app.mount("/users", |group| {
///     group.add("users", [""]);
///     group.add("user", [Segment::from("/"), Segment::from(integer("id"))]);
/// });
/// ```
#[derive(Debug)]
pub struct Group {
    prefix: Segment,
    routes: Vec<Route>,
    error: Option<AppError>,
}

impl Group {
    /// Create a route group.
    pub fn new(prefix: impl Into<Segment>) -> Group {
        Group {
            prefix: prefix.into(),
            routes: Vec::new(),
            error: None,
        }
    }

    /// Compiles the group prefix followed by `segments` into one pattern and
    /// registers it as `name`.
    ///
    /// A failure is kept and reported when the app is built, later calls are
    /// still compiled but only the first failure is reported.
    pub fn add<I, S>(&mut self, name: &str, segments: I) -> &mut Group
    where
        I: IntoIterator<Item = S>,
        S: Into<Segment>,
    {
        let segments = iter::once(self.prefix.clone()).chain(segments.into_iter().map(Into::into));

        match Pattern::new(segments) {
            Ok(pattern) => self.routes.push(Route::new(name, pattern)),
            Err(source) => self.fail(name, source),
        }

        self
    }

    pub fn prefix(&self) -> &Segment {
        &self.prefix
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    fn fail(&mut self, name: &str, source: CompileError) {
        if self.error.is_none() {
            self.error = Some(AppError::Route {
                name: name.to_owned(),
                source,
            });
        }
    }

    pub(crate) fn finish(self) -> Result<Vec<Route>, AppError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.routes),
        }
    }
}
