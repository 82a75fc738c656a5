use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::fmt::{self, Debug, Formatter};
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::Error;
use crate::path::parse_index;

/// A value that is carried from one render to the next.
///
/// Primitives compare by content. Arrays and objects are shared nodes:
/// cloning a `Value` clones the handle, so the clone is the _same_ node as
/// the original. Use [`Value::shallow_copy`] to get a fresh node with the
/// same children.
#[derive(Clone, Default)]
pub enum Value {
    /// The absence of a value, e.g. at a path that does not resolve.
    #[default]
    Undefined,
    /// An explicit null.
    Null,
    /// A boolean.
    Bool(bool),
    /// A floating point number.
    Number(f64),
    /// An immutable string.
    String(Rc<str>),
    /// An ordered sequence.
    Array(Rc<RefCell<Vec<Value>>>),
    /// A mapping from string keys to values, in insertion order.
    Object(Rc<RefCell<Map>>),
}

impl Value {
    /// Create a new object node from key-value pairs.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::from(entries.into_iter().collect::<Map>())
    }

    /// Create a new array node from items.
    pub fn array<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Self::from(items.into_iter().collect::<Vec<_>>())
    }

    /// Whether this is an array or an object.
    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Object(_))
    }

    /// Whether this is `Undefined` or `Null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Whether two values are the same value.
    ///
    /// Composites are the same if they are the same node. Numbers are the
    /// same if their bits match, except that all NaNs are the same and
    /// positive and negative zero are not.
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => {
                if a.is_nan() { b.is_nan() } else { a.to_bits() == b.to_bits() }
            }
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// The own keys of this value.
    ///
    /// Objects yield their keys in insertion order, arrays their indices.
    /// Everything else has no keys.
    pub fn own_keys(&self) -> Result<Vec<String>, Error> {
        Ok(match self {
            Self::Array(items) => (0..items.try_borrow()?.len()).map(|i| i.to_string()).collect(),
            Self::Object(map) => map.try_borrow()?.keys().map(str::to_owned).collect(),
            _ => Vec::new(),
        })
    }

    /// Look up a key, yielding `Undefined` if there is nothing there.
    ///
    /// Arrays accept canonical index keys like `"0"` and `"12"`. Arrays and
    /// strings have a `length`.
    pub fn get(&self, key: &str) -> Value {
        self.property(key).unwrap_or_default()
    }

    /// Insert into an object, returning the previous value at the key.
    ///
    /// Does nothing and returns `None` if this is not an object.
    ///
    /// # Panics
    /// Panics if the object is currently borrowed.
    pub fn set(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        match self {
            Self::Object(map) => map.borrow_mut().insert(key, value),
            _ => None,
        }
    }

    /// Append to an array. Does nothing if this is not an array.
    ///
    /// # Panics
    /// Panics if the array is currently borrowed.
    pub fn push(&self, value: Value) {
        if let Self::Array(items) = self {
            items.borrow_mut().push(value);
        }
    }

    /// A fresh node with the same children, or a clone for primitives.
    ///
    /// # Panics
    /// Panics if the node is currently mutably borrowed.
    pub fn shallow_copy(&self) -> Self {
        match self {
            Self::Array(items) => Self::from(items.borrow().clone()),
            Self::Object(map) => Self::from(map.borrow().clone()),
            other => other.clone(),
        }
    }

    /// The value under a key, as an indexing expression would see it.
    ///
    /// Arrays and strings also expose their `length`, and strings yield
    /// single characters at canonical indices.
    pub(crate) fn property(&self, key: &str) -> Result<Value, Error> {
        Ok(match self {
            Self::Object(map) => map.try_borrow()?.get(key).cloned().unwrap_or_default(),
            Self::Array(items) => match parse_index(key) {
                Some(i) => items.try_borrow()?.get(i).cloned().unwrap_or_default(),
                None if key == LENGTH => Self::from(items.try_borrow()?.len()),
                None => Self::Undefined,
            },
            Self::String(text) => match parse_index(key) {
                Some(i) => char_at(text, i),
                None if key == LENGTH => Self::from(text.encode_utf16().count()),
                None => Self::Undefined,
            },
            _ => Self::Undefined,
        })
    }

    /// The value at an index. Objects are looked up by the index's key.
    pub(crate) fn element(&self, index: usize) -> Result<Value, Error> {
        Ok(match self {
            Self::Array(items) => items.try_borrow()?.get(index).cloned().unwrap_or_default(),
            Self::Object(map) => {
                map.try_borrow()?.get(&index.to_string()).cloned().unwrap_or_default()
            }
            Self::String(text) => char_at(text, index),
            _ => Self::Undefined,
        })
    }

    /// The address of a composite node.
    pub(crate) fn node(&self) -> Option<usize> {
        match self {
            Self::Array(items) => Some(Rc::as_ptr(items).cast::<()>() as usize),
            Self::Object(map) => Some(Rc::as_ptr(map).cast::<()>() as usize),
            _ => None,
        }
    }
}

/// The pseudo-key under which arrays and strings expose their length.
const LENGTH: &str = "length";

/// The UTF-16 code unit at an index, as a one-unit string.
fn char_at(text: &str, index: usize) -> Value {
    match text.encode_utf16().nth(index) {
        Some(unit) => Value::from(String::from_utf16_lossy(&[unit])),
        None => Value::Undefined,
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Inspect { value: self, seen: &RefCell::new(FxHashSet::default()) }.fmt(f)
    }
}

/// Cycle-aware debug rendering of a value.
struct Inspect<'a> {
    value: &'a Value,
    seen: &'a RefCell<FxHashSet<usize>>,
}

impl Inspect<'_> {
    fn nested<'b>(&'b self, value: &'b Value) -> Inspect<'b> {
        Inspect { value, seen: self.seen }
    }
}

impl Debug for Inspect<'_> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self.value {
            Value::Undefined => f.pad("undefined"),
            Value::Null => f.pad("null"),
            Value::Bool(v) => v.fmt(f),
            Value::Number(v) => v.fmt(f),
            Value::String(v) => v.fmt(f),
            composite => {
                let Some(node) = composite.node() else { return Ok(()) };
                if !self.seen.borrow_mut().insert(node) {
                    return f.pad("[Circular]");
                }
                let result = match composite {
                    Value::Array(items) => match items.try_borrow() {
                        Ok(items) => {
                            f.debug_list().entries(items.iter().map(|v| self.nested(v))).finish()
                        }
                        Err(_) => f.pad("[Busy]"),
                    },
                    Value::Object(map) => match map.try_borrow() {
                        Ok(map) => f
                            .debug_map()
                            .entries(map.iter().map(|(k, v)| (k, self.nested(v))))
                            .finish(),
                        Err(_) => f.pad("{Busy}"),
                    },
                    _ => Ok(()),
                };
                self.seen.borrow_mut().remove(&node);
                result
            }
        }
    }
}

/// An insertion-ordered map from string keys to values.
#[derive(Clone, Default)]
pub struct Map {
    /// The entries in insertion order.
    entries: Vec<(String, Value)>,
    /// Maps from keys to indices in `entries`.
    index: FxHashMap<String, usize>,
}

impl Map {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether the key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// The value under a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    /// Insert a value. An existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        match self.index.entry(key.into()) {
            Entry::Occupied(entry) => {
                Some(std::mem::replace(&mut self.entries[*entry.get()].1, value))
            }
            Entry::Vacant(entry) => {
                let key = entry.key().clone();
                entry.insert(self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Remove a key, shifting later entries forward.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let i = self.index.remove(key)?;
        let (_, value) = self.entries.remove(i);
        for (k, _) in &self.entries[i..] {
            if let Some(slot) = self.index.get_mut(k.as_str()) {
                *slot -= 1;
            }
        }
        Some(value)
    }

    /// The keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// The entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Map {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        let mut map = Map::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl Debug for Map {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Self::Object(Rc::new(RefCell::new(map)))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(Rc::new(RefCell::new(items)))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.into())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v.into())
    }
}

impl From<Rc<str>> for Value {
    fn from(v: Rc<str>) -> Self {
        Self::String(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(v) => Self::Bool(v),
            serde_json::Value::Number(v) => Self::Number(v.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(v) => Self::from(v),
            serde_json::Value::Array(items) => Self::array(items.into_iter().map(Self::from)),
            serde_json::Value::Object(map) => {
                Self::object(map.into_iter().map(|(k, v)| (k, Self::from(v))))
            }
        }
    }
}

macro_rules! number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::Number(v as f64)
                }
            }

            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::Number(*self as f64)
                }
            }
        )*
    };
}

number! { i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64 }

/// Conversion into a [`Value`].
///
/// Can be derived for structs with `#[derive(ToValue)]`. Named fields become
/// an object, tuple fields an array. Fields can be renamed with
/// `#[shield(rename = "...")]` and left out with `#[shield(skip)]`.
///
/// Every call produces fresh nodes, except for fields that already hold a
/// [`Value`]: those keep their identity.
pub trait ToValue {
    /// Convert `self` into a value.
    fn to_value(&self) -> Value;
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        T::to_value(self)
    }
}

impl<T: ToValue + ?Sized> ToValue for Box<T> {
    fn to_value(&self) -> Value {
        T::to_value(self)
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::from(self)
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::from(self.as_str())
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, T::to_value)
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        Value::array(self.iter().map(T::to_value))
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Value {
        Value::from(self.clone())
    }
}

#[cfg(test)]
pub(crate) mod arbitrary {
    use quickcheck::{Arbitrary, Gen};

    use super::Value;

    /// A plain description of a value that quickcheck can generate.
    #[derive(Debug, Clone)]
    pub enum Tree {
        Null,
        Bool(bool),
        Number(i8),
        Str(u8),
        List(Vec<Tree>),
        Record(Vec<(u8, Tree)>),
    }

    impl Tree {
        /// Build fresh nodes for this tree.
        pub fn build(&self) -> Value {
            match self {
                Self::Null => Value::Null,
                Self::Bool(v) => Value::Bool(*v),
                Self::Number(v) => Value::from(*v),
                Self::Str(v) => Value::from(format!("s{}", v % 4)),
                Self::List(items) => Value::array(items.iter().map(Self::build)),
                Self::Record(fields) => Value::object(
                    fields.iter().map(|(k, v)| (format!("k{}", k % 5), v.build())),
                ),
            }
        }

        fn sized(g: &mut Gen, depth: usize) -> Self {
            let choices: &[u8] = if depth == 0 { &[0, 1, 2, 3] } else { &[0, 1, 2, 3, 4, 5, 5] };
            let len = |g: &mut Gen| usize::arbitrary(g) % 4;
            match g.choose(choices).copied().unwrap_or(0) {
                0 => Self::Null,
                1 => Self::Bool(Arbitrary::arbitrary(g)),
                2 => Self::Number(Arbitrary::arbitrary(g)),
                3 => Self::Str(Arbitrary::arbitrary(g)),
                4 => Self::List((0..len(g)).map(|_| Self::sized(g, depth - 1)).collect()),
                _ => Self::Record(
                    (0..len(g))
                        .map(|_| (u8::arbitrary(g), Self::sized(g, depth - 1)))
                        .collect(),
                ),
            }
        }
    }

    impl Arbitrary for Tree {
        fn arbitrary(g: &mut Gen) -> Self {
            Self::sized(g, 3)
        }
    }
}
