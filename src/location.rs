use std::collections::BTreeMap;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS, NON_ALPHANUMERIC};
use url::{form_urlencoded, Url};

use crate::router::routes::Value;

/// Patterns only look at path, query and fragment, so every input is
/// resolved against this fixed origin.
const BASE: &str = "http://localhost/";

/// The bytes `encodeURIComponent` escapes: everything except
/// `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
pub const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// <https://url.spec.whatwg.org/#fragment-percent-encode-set> plus `%`, since
/// fragments are percent-decoded when split off.
pub const FRAGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'%');

/// Data carried by a URL that matched a pattern.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteData {
    pub params: BTreeMap<String, Value>,
    pub search: BTreeMap<String, String>,
    /// Fragment without the leading `#`, empty when absent.
    pub hash: String,
}

impl RouteData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn search(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.search.insert(key.into(), value.into());
        self
    }

    pub fn hash(mut self, hash: impl Into<String>) -> Self {
        self.hash = hash.into();
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }
}

/// A URL reference split into the components a pattern cares about.
#[derive(Debug, PartialEq)]
pub(crate) struct Parts {
    /// Absolute, dot-segment resolved and percent-encoded path.
    pub path: String,
    pub search: BTreeMap<String, String>,
    pub hash: String,
}

/// Resolves `input` as a URL reference, returning [`None`] if it is not
/// one.
pub(crate) fn split(input: &str) -> Option<Parts> {
    let base = Url::parse(BASE).ok()?;
    let url = base.join(input).ok()?;

    // Later pairs overwrite earlier ones.
    let search = url.query_pairs().into_owned().collect();

    // A fragment that does not decode to UTF-8 is kept as written.
    let fragment = url.fragment().unwrap_or_default();
    let hash = decode_component(fragment).unwrap_or_else(|| fragment.to_owned());

    Some(Parts {
        path: url.path().to_owned(),
        search,
        hash,
    })
}

/// Percent-decodes a single component. Returns [`None`] if the decoded bytes
/// are not UTF-8.
pub(crate) fn decode_component(component: &str) -> Option<String> {
    percent_decode_str(component)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}

pub(crate) fn encode_component(component: &str) -> String {
    utf8_percent_encode(component, COMPONENT).to_string()
}

/// Appends query and fragment to an already encoded path. Empty components
/// are left out entirely.
pub(crate) fn render(path: &str, search: &BTreeMap<String, String>, hash: &str) -> String {
    let mut url = path.to_owned();

    if !search.is_empty() {
        let query = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(search)
            .finish();
        url.push('?');
        url.push_str(&query);
    }

    if !hash.is_empty() {
        url.push('#');
        url.extend(utf8_percent_encode(hash, FRAGMENT));
    }

    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn path_of(input: &str) -> String {
        split(input).expect("valid url reference").path
    }

    #[test]
    fn relative_input_becomes_absolute() {
        assert_eq!(path_of("foo/bar"), "/foo/bar");
        assert_eq!(path_of("/foo/bar"), "/foo/bar");
        assert_eq!(path_of(""), "/");
    }

    #[test]
    fn dot_segments_are_resolved() {
        assert_eq!(path_of("/foo/./bar"), "/foo/bar");
        assert_eq!(path_of("/foo/baz/../bar"), "/foo/bar");
    }

    #[test]
    fn non_ascii_is_percent_encoded_uppercase() {
        assert_eq!(path_of("/café"), "/caf%C3%A9");
        assert_eq!(path_of("/caf%c3%a9"), "/caf%c3%a9");
    }

    #[test]
    fn query_and_fragment_are_split_off() {
        let parts = split("/foo?a=1&b=two+words&a=3#top").unwrap();
        assert_eq!(parts.path, "/foo");
        assert_eq!(
            parts.search,
            BTreeMap::from([("a".into(), "3".into()), ("b".into(), "two words".into())])
        );
        assert_eq!(parts.hash, "top");
    }

    #[test]
    fn fragment_is_percent_decoded() {
        assert_eq!(split("/foo#a%20b").unwrap().hash, "a b");
        assert_eq!(split("/foo#caf%C3%A9").unwrap().hash, "café");
        assert_eq!(split("/foo#café").unwrap().hash, "café");
        assert_eq!(split("/foo#%FF").unwrap().hash, "%FF");
    }

    #[test]
    fn malformed_reference_is_rejected() {
        assert_eq!(split("http://[::1"), None);
        assert_eq!(split("http://exa mple.com/"), None);
    }

    #[test]
    fn component_encoding_matches_uri_component_rules() {
        assert_eq!(encode_component("a b/c?d"), "a%20b%2Fc%3Fd");
        assert_eq!(encode_component("-_.!~*'()"), "-_.!~*'()");
        assert_eq!(encode_component("é"), "%C3%A9");
        assert_eq!(encode_component("07:07"), "07%3A07");
    }

    #[test]
    fn decode_rejects_invalid_utf8() {
        assert_eq!(decode_component("%C3%A9"), Some("é".to_owned()));
        assert_eq!(decode_component("%FF"), None);
    }

    #[test]
    fn render_omits_empty_components() {
        let mut search = BTreeMap::new();
        assert_eq!(render("/foo", &search, ""), "/foo");

        search.insert("q".to_owned(), "a b".to_owned());
        assert_eq!(render("/foo", &search, "x y"), "/foo?q=a+b#x%20y");
        assert_eq!(render("/foo", &BTreeMap::new(), "100%"), "/foo#100%25");
    }
}
