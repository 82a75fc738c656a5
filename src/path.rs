use std::fmt::{self, Debug, Display, Formatter};

use crate::error::Error;
use crate::value::Value;

/// A route into a nested value.
///
/// Keys are separated by dots. Sequence indices are written either as a
/// bracketed number or as a plain numeric segment, so `items[1].name` and
/// `items.1.name` are the same route. Empty segments are ignored and parsing
/// never fails: a route that leads nowhere simply resolves to
/// [`Value::Undefined`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Path {
    /// The path as it was written.
    raw: String,
    /// The parsed segments.
    segments: Vec<Segment>,
}

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A mapping key.
    Key(String),
    /// A sequence index.
    Index(usize),
}

impl Path {
    /// Parse a path.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let segments = unbracket(&raw)
            .split('.')
            .filter(|part| !part.is_empty())
            .map(|part| match parse_index(part) {
                Some(i) => Segment::Index(i),
                None => Segment::Key(part.to_owned()),
            })
            .collect();
        Self { raw, segments }
    }

    /// The path as it was written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl From<&str> for Path {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Path {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl Display for Path {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.pad(&self.raw)
    }
}

impl Debug for Path {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Debug::fmt(&self.raw, f)
    }
}

/// Resolve a path against a value.
///
/// Yields [`Value::Undefined`] as soon as the walk hits a missing or null
/// node, and also if a node on the way is mutably borrowed. Use
/// [`try_resolve`] to tell the latter apart.
pub fn resolve(root: &Value, path: &Path) -> Value {
    try_resolve(root, path).unwrap_or_default()
}

/// Resolve a path against a value, failing if a node on the way is mutably
/// borrowed.
pub fn try_resolve(root: &Value, path: &Path) -> Result<Value, Error> {
    if root.is_nullish() {
        return Ok(Value::Undefined);
    }

    let mut cursor = root.clone();
    for segment in &path.segments {
        if cursor.is_nullish() {
            return Ok(Value::Undefined);
        }
        cursor = match segment {
            Segment::Key(key) => cursor.property(key)?,
            Segment::Index(i) => cursor.element(*i)?,
        };
    }
    Ok(cursor)
}

/// Parse a canonical sequence index: digits without leading zeros.
pub(crate) fn parse_index(part: &str) -> Option<usize> {
    let canonical = !part.is_empty()
        && part.bytes().all(|b| b.is_ascii_digit())
        && (part == "0" || !part.starts_with('0'));
    if canonical { part.parse().ok() } else { None }
}

/// Rewrite every `[digits]` into `.digits`.
fn unbracket(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('[') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let digits = after.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && after[digits..].starts_with(']') {
            out.push('.');
            out.push_str(&after[..digits]);
            rest = &after[digits + 1..];
        } else {
            out.push('[');
            rest = after;
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::*;
    use crate::value::arbitrary::Tree;

    fn data() -> Value {
        Value::from(serde_json::json!({
            "user": { "id": 1, "profile": { "name": "Gemini" } },
            "items": [{ "id": "a", "val": 10 }, { "id": "b", "val": 20 }],
        }))
    }

    #[test]
    fn test_parse() {
        let key = |k: &str| Segment::Key(k.into());
        assert_eq!(Path::new("user.id").segments(), [key("user"), key("id")]);
        assert_eq!(
            Path::new("items[0].name").segments(),
            [key("items"), Segment::Index(0), key("name")]
        );
        assert_eq!(Path::new("items.0.name").segments(), Path::new("items[0].name").segments());
        assert_eq!(Path::new("a..b.").segments(), [key("a"), key("b")]);
        assert_eq!(Path::new("a.01").segments(), [key("a"), key("01")]);
        assert_eq!(Path::new("a[x]").segments(), [key("a[x]")]);
        assert_eq!(Path::new("a[12]b").segments(), [key("a"), key("12b")]);
        assert!(Path::new("").segments().is_empty());
    }

    #[test]
    fn test_format() {
        let path = Path::new("items[0].name");
        assert_eq!(format!("{path:?}"), r#""items[0].name""#);
        assert_eq!(format!("{path}"), "items[0].name");
        assert_eq!(format!("{path:>16}"), "   items[0].name");
        assert_eq!(format!("{:?}", [Path::from("a"), Path::from("b.c")]), r#"["a", "b.c"]"#);
    }

    #[test]
    fn test_resolve() {
        let data = data();
        assert!(resolve(&data, &"user.profile.name".into()).same(&Value::from("Gemini")));
        assert!(resolve(&data, &"items[1].val".into()).same(&Value::from(20)));
        assert!(resolve(&data, &"items.0.id".into()).same(&Value::from("a")));
        assert!(resolve(&data, &"".into()).same(&data));
    }

    #[test]
    fn test_resolve_missing() {
        let data = data();
        assert!(resolve(&data, &"user.address.street".into()).same(&Value::Undefined));
        assert!(resolve(&data, &"items[7].val".into()).same(&Value::Undefined));
        assert!(resolve(&data, &"user.id.deeper".into()).same(&Value::Undefined));
        assert!(resolve(&Value::Null, &"a".into()).same(&Value::Undefined));

        let nulled = Value::object([("a", Value::Null)]);
        assert!(resolve(&nulled, &"a.b.c".into()).same(&Value::Undefined));
    }

    #[test]
    fn test_resolve_length() {
        let data = data();
        assert!(resolve(&data, &"items.length".into()).same(&Value::from(2)));
        assert!(resolve(&data, &"user.profile.name.length".into()).same(&Value::from(6)));
        assert!(resolve(&data, &"user.profile.name[0]".into()).same(&Value::from("G")));
        assert!(resolve(&data, &"items[0].id.length".into()).same(&Value::from(1)));
        assert!(resolve(&data, &"user.length".into()).same(&Value::Undefined));
    }

    #[test]
    fn test_resolve_busy() {
        let inner = Value::object([("x", Value::from(1))]);
        let root = Value::object([("inner", inner.clone())]);
        let Value::Object(map) = &inner else { unreachable!() };
        let _guard = map.borrow_mut();
        assert!(try_resolve(&root, &"inner.x".into()).is_err());
        assert!(resolve(&root, &"inner.x".into()).same(&Value::Undefined));
    }

    #[quickcheck]
    fn test_missing_never_fails(tree: Tree, keys: Vec<u8>) -> bool {
        let raw = keys.iter().map(|k| format!("k{}", k % 7)).collect::<Vec<_>>().join(".");
        let path = Path::new(format!("{raw}.nowhere.deeper"));
        try_resolve(&tree.build(), &path).is_ok()
    }
}
