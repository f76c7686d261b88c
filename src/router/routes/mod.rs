pub mod decoders;
mod paths;

use std::{collections::BTreeMap, fmt, str::FromStr, sync::Arc};

use regex::Regex;
use tracing::{debug, trace};

use crate::location::{self, RouteData};

pub use self::{
    decoders::{
        array, boolean, date, datetime, float, integer, string, ArrayDecoder, BooleanDecoder,
        DateDecoder, DateTimeDecoder, DecodeError, Decoder, DecoderExt, EncodeError, FloatDecoder,
        IntegerDecoder, StringDecoder, Value,
    },
    paths::ParseError,
};

const SEGMENT_SCORE: i32 = 4;
const STATIC_SCORE: i32 = 3;
const DYNAMIC_SCORE: i32 = 2;
const ROOT_SCORE: i32 = 1;

/// A named, typed placeholder inside a [`Pattern`].
#[derive(Debug, Clone)]
pub struct Param {
    name: String,
    decoder: Arc<dyn Decoder>,
}

impl Param {
    pub fn new(name: impl Into<String>, decoder: Arc<dyn Decoder>) -> Self {
        Self {
            name: name.into(),
            decoder,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn decoder(&self) -> &dyn Decoder {
        self.decoder.as_ref()
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decoder.kind().as_ref() {
            "string" => write!(f, "{{{}}}", self.name),
            kind => write!(f, "{{{}:{}}}", self.name, kind),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Token {
    /// Raw path text, matched verbatim.
    Literal(String),
    Param(Param),
}

/// Building block accepted by [`Pattern::new`] and [`route!`](crate::route).
#[derive(Debug, Clone)]
pub enum Segment {
    Literal(String),
    Param(Param),
    /// An already compiled pattern, spliced in token by token.
    Pattern(Pattern),
}

impl From<&str> for Segment {
    fn from(literal: &str) -> Self {
        Segment::Literal(literal.to_owned())
    }
}

impl From<String> for Segment {
    fn from(literal: String) -> Self {
        Segment::Literal(literal)
    }
}

impl From<Param> for Segment {
    fn from(param: Param) -> Self {
        Segment::Param(param)
    }
}

impl From<Pattern> for Segment {
    fn from(pattern: Pattern) -> Self {
        Segment::Pattern(pattern)
    }
}

impl From<&Pattern> for Segment {
    fn from(pattern: &Pattern) -> Self {
        Segment::Pattern(pattern.clone())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("duplicate parameter names: {}", .names.join(", "))]
    DuplicateParameters { names: Vec<String> },
    #[error("matcher of parameter `{name}` is not a valid regex")]
    InvalidMatcher {
        name: String,
        #[source]
        source: regex::Error,
    },
    /// Every matcher is valid on its own but the assembled expression is not,
    /// e.g. a matcher names a group `p1` or the size limit is exceeded.
    #[error("failed to compile route regex")]
    Regex(#[from] regex::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// A compiled route template.
///
/// Cloning is cheap, all clones share the same compiled state.
#[derive(Clone)]
pub struct Pattern {
    inner: Arc<Compiled>,
}

struct Compiled {
    tokens: Vec<Token>,
    /// Capture group index of each parameter, in token order.
    groups: Vec<usize>,
    regex: Regex,
}

impl Pattern {
    /// Compiles a sequence of literals, parameters and nested patterns.
    ///
    /// ```
    /// use typeroute::{integer, Pattern, Segment};
    ///
    /// let users = Pattern::new(["/users"])?;
    /// let user = Pattern::new([
    ///     Segment::from(users),
    ///     Segment::from("/"),
    ///     Segment::from(integer("id")),
    /// ])?;
    /// assert_eq!(user.to_string(), "/users/{id:integer}");
    /// # Ok::<(), typeroute::CompileError>(())
    /// ```
    pub fn new<I, S>(segments: I) -> Result<Self, CompileError>
    where
        I: IntoIterator<Item = S>,
        S: Into<Segment>,
    {
        let mut tokens = Vec::new();
        for segment in segments {
            flatten(&mut tokens, segment.into());
        }
        normalize(&mut tokens);

        let names = duplicate_names(&tokens);
        if !names.is_empty() {
            return Err(CompileError::DuplicateParameters { names });
        }

        let (regex, groups) = compile(&tokens)?;
        let pattern = Self {
            inner: Arc::new(Compiled {
                tokens,
                groups,
                regex,
            }),
        };

        trace!(pattern = %pattern, regex = pattern.inner.regex.as_str(), "compiled route pattern");
        Ok(pattern)
    }

    /// Parses and compiles a textual template such as `/users/{id:integer}`.
    pub fn parse(template: &str) -> Result<Self, PatternError> {
        let segments = paths::parse(template)?;
        Ok(Self::new(segments)?)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.inner.tokens
    }

    /// Parameters in order of appearance.
    pub fn params(&self) -> impl Iterator<Item = &Param> {
        self.inner.tokens.iter().filter_map(|token| match token {
            Token::Param(param) => Some(param),
            Token::Literal(_) => None,
        })
    }

    pub fn regex(&self) -> &Regex {
        &self.inner.regex
    }

    /// Whether the path of `url` matches, without decoding any parameter.
    pub fn is_match(&self, url: &str) -> bool {
        location::split(url).is_some_and(|parts| self.inner.regex.is_match(&parts.path))
    }

    /// Matches `url` and extracts its data, treating parameters that fail to
    /// decode the same as a URL that does not match.
    pub fn decode(&self, url: &str) -> Option<RouteData> {
        match self.try_decode(url) {
            Ok(data) => data,
            Err(err) => {
                debug!(pattern = %self, url, error = %err, "parameter failed to decode");
                None
            }
        }
    }

    /// Like [`Pattern::decode`], but reports decoder failures instead of
    /// folding them into [`None`].
    pub fn try_decode(&self, url: &str) -> Result<Option<RouteData>, DecodeError> {
        let Some(parts) = location::split(url) else {
            debug!(url, "not a valid url reference");
            return Ok(None);
        };

        let Some(captures) = self.inner.regex.captures(&parts.path) else {
            trace!(pattern = %self, path = %parts.path, "no match");
            return Ok(None);
        };

        let mut params = BTreeMap::new();
        for (param, &group) in self.params().zip(&self.inner.groups) {
            let Some(raw) = captures.get(group) else {
                return Ok(None);
            };
            let Some(segment) = location::decode_component(raw.as_str()) else {
                return Ok(None);
            };

            let value = param.decoder.decode(&segment)?;
            params.insert(param.name.clone(), value);
        }

        Ok(Some(RouteData {
            params,
            search: parts.search,
            hash: parts.hash,
        }))
    }

    /// Renders only the path component.
    pub fn encode_path(&self, params: &BTreeMap<String, Value>) -> Result<String, EncodeError> {
        let mut path = String::new();

        for token in self.tokens() {
            match token {
                Token::Literal(literal) => path.push_str(literal),
                Token::Param(param) => {
                    let value = params
                        .get(&param.name)
                        .ok_or_else(|| EncodeError::MissingParameter(param.name.clone()))?;
                    let encoded = param.decoder.encode(value)?;
                    path.push_str(&location::encode_component(&encoded));
                }
            }
        }

        Ok(path)
    }

    /// Renders a URL from `data`. The result decodes back to `data` but need
    /// not be byte-identical to the URL `data` was decoded from.
    pub fn encode(&self, data: &RouteData) -> Result<String, EncodeError> {
        let path = self.encode_path(&data.params)?;
        Ok(location::render(&path, &data.search, &data.hash))
    }

    /// Specificity score, higher is more specific. Static segments outrank
    /// parameter segments, which outrank the root.
    pub fn rank(&self) -> i32 {
        // (parameter count, contains literal text) per `/`-separated segment
        let mut segments = vec![(0usize, false)];

        for token in self.tokens() {
            match token {
                Token::Literal(literal) => {
                    for (i, part) in literal.split('/').enumerate() {
                        if i > 0 {
                            segments.push((0, false));
                        }
                        if let Some(last) = segments.last_mut() {
                            last.1 |= !part.is_empty();
                        }
                    }
                }
                Token::Param(_) => {
                    if let Some(last) = segments.last_mut() {
                        last.0 += 1;
                    }
                }
            }
        }

        let is_empty = |segment: &(usize, bool)| *segment == (0, false);
        while segments.len() > 1 && segments.first().is_some_and(is_empty) {
            segments.remove(0);
        }
        while segments.len() > 1 && segments.last().is_some_and(is_empty) {
            segments.pop();
        }

        segments
            .iter()
            .map(|segment| {
                SEGMENT_SCORE
                    + match segment {
                        (0, false) => ROOT_SCORE,
                        (1, false) => DYNAMIC_SCORE,
                        _ => STATIC_SCORE,
                    }
            })
            .sum()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in self.tokens() {
            match token {
                Token::Literal(literal) => f.write_str(literal)?,
                Token::Param(param) => fmt::Display::fmt(param, f)?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("template", &self.to_string())
            .field("regex", &self.inner.regex.as_str())
            .finish()
    }
}

impl FromStr for Pattern {
    type Err = PatternError;

    fn from_str(template: &str) -> Result<Self, Self::Err> {
        Self::parse(template)
    }
}

/// Compiles a [`Pattern`] from literals, parameters and nested patterns.
///
/// ```
/// use typeroute::{route, string, RouteData};
///
/// let pattern = route!["/foo/", string("bar")]?;
/// let data = pattern.decode("/foo/index.html").unwrap();
/// assert_eq!(data, RouteData::new().param("bar", "index.html"));
/// # Ok::<(), typeroute::CompileError>(())
/// ```
#[macro_export]
macro_rules! route {
    ($($segment:expr),* $(,)?) => {{
        let segments: ::std::vec::Vec<$crate::Segment> =
            ::std::vec![$($crate::Segment::from($segment)),*];
        $crate::Pattern::new(segments)
    }};
}

fn push_literal(tokens: &mut Vec<Token>, literal: &str) {
    if literal.is_empty() {
        return;
    }

    match tokens.last_mut() {
        Some(Token::Literal(previous)) => previous.push_str(literal),
        _ => tokens.push(Token::Literal(literal.to_owned())),
    }
}

fn flatten(tokens: &mut Vec<Token>, segment: Segment) {
    match segment {
        Segment::Literal(literal) => push_literal(tokens, &literal),
        Segment::Param(param) => tokens.push(Token::Param(param)),
        Segment::Pattern(pattern) => {
            for token in pattern.tokens() {
                match token {
                    Token::Literal(literal) => push_literal(tokens, literal),
                    Token::Param(param) => tokens.push(Token::Param(param.clone())),
                }
            }
        }
    }
}

/// Every pattern starts with `/`.
fn normalize(tokens: &mut Vec<Token>) {
    match tokens.first_mut() {
        Some(Token::Literal(literal)) if literal.starts_with('/') => {}
        Some(Token::Literal(literal)) => literal.insert(0, '/'),
        _ => tokens.insert(0, Token::Literal("/".to_owned())),
    }
}

/// Names declared more than once, each reported once in order of first
/// appearance.
fn duplicate_names(tokens: &[Token]) -> Vec<String> {
    let mut seen = Vec::new();
    let mut duplicates = Vec::new();

    for token in tokens {
        let Token::Param(param) = token else { continue };

        if !seen.contains(&param.name.as_str()) {
            seen.push(param.name.as_str());
        } else if !duplicates.contains(&param.name) {
            duplicates.push(param.name.clone());
        }
    }

    duplicates
}

fn compile(tokens: &[Token]) -> Result<(Regex, Vec<usize>), CompileError> {
    let mut expr = String::from("^");
    let mut names = Vec::new();

    for token in tokens {
        match token {
            Token::Literal(literal) => expr.push_str(&regex::escape(literal)),
            Token::Param(param) => {
                let matcher = param.decoder.matcher();
                Regex::new(matcher).map_err(|source| CompileError::InvalidMatcher {
                    name: param.name.clone(),
                    source,
                })?;

                let group = format!("p{}", names.len());
                expr.push_str(&format!("(?P<{group}>{matcher})"));
                names.push(group);
            }
        }
    }
    expr.push('$');

    let regex = Regex::new(&expr)?;
    let groups = names
        .iter()
        .map(|name| {
            regex
                .capture_names()
                .position(|candidate| candidate == Some(name.as_str()))
                .unwrap_or_else(|| unreachable!("every parameter has a named group"))
        })
        .collect();

    Ok((regex, groups))
}
