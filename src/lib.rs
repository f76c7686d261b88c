//! Typed route patterns.
//!
//! A [`Pattern`] is compiled from literal text and typed parameters. It
//! decodes matching URLs into [`RouteData`] and encodes [`RouteData`] back
//! into URLs. A [`Router`] keeps a table of named patterns in step with a
//! [`History`] backend and notifies subscribers whenever the current
//! [`Location`] changes.
//!
//! ```
//! use typeroute::{integer, route, RouteData};
//!
//! let user = route!["/users/", integer("id")]?;
//!
//! let data = user.decode("/users/42?tab=posts").unwrap();
//! assert_eq!(data, RouteData::new().param("id", 42i64).search("tab", "posts"));
//! assert_eq!(user.encode(&data)?, "/users/42?tab=posts");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod app;
mod config;
mod location;
mod router;

pub use app::{App, AppError};
pub use config::{DuplicateNavigation, MatchStrategy, RouterConfig};
pub use location::RouteData;
pub use router::{
    groups::{Group, Route, RouteTable},
    history::{History, HistoryEvent, MemoryHistory},
    routes::{
        array, boolean, date, datetime, float, integer, string, ArrayDecoder, BooleanDecoder,
        CompileError, DateDecoder, DateTimeDecoder, DecodeError, Decoder, DecoderExt, EncodeError,
        FloatDecoder, IntegerDecoder, Param, ParseError, Pattern, PatternError, Segment,
        StringDecoder, Token, Value,
    },
    Location, NavigationError, NavigationTarget, Router, SubscriptionId,
};
