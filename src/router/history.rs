//! History backends.
//!
//! The [`Router`](super::Router) never touches a navigation stack itself. It
//! reads the current URL from a [`History`], tells it about programmatic
//! navigation and reacts to the [`HistoryEvent`]s it reports.

use std::collections::VecDeque;

use tracing::warn;
use url::{Position, Url};

/// Something that happened on the history stack outside of the router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    /// The user moved back or forward; carries the URL now current.
    Pop(String),
    /// A navigation was requested from outside the router, e.g. a link click.
    Push(String),
}

pub trait History {
    /// Path, query and fragment of the current entry.
    fn current_path(&self) -> String;

    /// Moves `delta` entries through the stack. Out of range moves are
    /// ignored.
    fn go(&mut self, delta: isize);

    fn back(&mut self) {
        self.go(-1);
    }

    fn forward(&mut self) {
        self.go(1);
    }

    /// Adds a new entry after the current one, discarding forward entries.
    fn push_state(&mut self, url: &str);

    /// Overwrites the current entry.
    fn replace_state(&mut self, url: &str);

    /// Takes the oldest pending event, if any.
    fn poll_event(&mut self) -> Option<HistoryEvent> {
        None
    }
}

/// A [`History`] that stores all information in memory.
///
/// Moving through the stack with [`History::go`] queues a
/// [`HistoryEvent::Pop`], the same way a browser fires `popstate`.
/// Programmatic pushes and replaces do not queue anything.
#[derive(Debug, Clone)]
pub struct MemoryHistory {
    entries: Vec<Url>,
    index: usize,
    events: VecDeque<HistoryEvent>,
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHistory {
    const BASE: &'static str = "memory://localhost/";

    pub fn new() -> Self {
        Self::with_entry("/")
    }

    /// A history whose only entry is `path`. An unparseable `path` falls back
    /// to `/`.
    pub fn with_entry(path: &str) -> Self {
        let entries = Url::parse(Self::BASE)
            .map(|base| vec![base.join(path).unwrap_or(base)])
            .unwrap_or_default();

        Self {
            entries,
            index: 0,
            events: VecDeque::new(),
        }
    }

    /// Queues an event as if it came from the user.
    pub fn emit(&mut self, event: HistoryEvent) {
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn can_go_back(&self) -> bool {
        self.index > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.index + 1 < self.entries.len()
    }

    fn current(&self) -> Option<&Url> {
        self.entries.get(self.index)
    }

    fn resolve(&self, url: &str) -> Option<Url> {
        if url.starts_with("//") {
            warn!(url, r#"cannot navigate to paths starting with "//""#);
            return None;
        }

        let base = match self.current() {
            Some(current) => current.clone(),
            None => Url::parse(Self::BASE).ok()?,
        };

        match base.join(url) {
            Ok(url) => Some(url),
            Err(err) => {
                warn!(url, error = %err, "cannot navigate to invalid url");
                None
            }
        }
    }
}

impl History for MemoryHistory {
    fn current_path(&self) -> String {
        self.current()
            .map(|url| url[Position::BeforePath..].to_owned())
            .unwrap_or_else(|| "/".to_owned())
    }

    fn go(&mut self, delta: isize) {
        let Some(target) = self.index.checked_add_signed(delta) else {
            return;
        };

        if delta == 0 || target >= self.entries.len() {
            return;
        }

        self.index = target;
        self.events.push_back(HistoryEvent::Pop(self.current_path()));
    }

    fn push_state(&mut self, url: &str) {
        let Some(url) = self.resolve(url) else {
            return;
        };

        self.entries.truncate(self.index + 1);
        self.entries.push(url);
        self.index = self.entries.len() - 1;
    }

    fn replace_state(&mut self, url: &str) {
        let Some(url) = self.resolve(url) else {
            return;
        };

        match self.entries.get_mut(self.index) {
            Some(entry) => *entry = url,
            None => self.entries.push(url),
        }
    }

    fn poll_event(&mut self) -> Option<HistoryEvent> {
        self.events.pop_front()
    }
}
