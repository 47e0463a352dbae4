use linked_hash_map::LinkedHashMap;
use std::{fmt, rc::Rc};

/// A named collection of shared records. The order of insertion is the order the values are
/// laid out in the file, so it is preserved.
pub struct ResDict<T> {
    entries: LinkedHashMap<String, Rc<T>>,
}

impl<T> Default for ResDict<T> {
    fn default() -> Self {
        ResDict {
            entries: LinkedHashMap::new(),
        }
    }
}

impl<T> ResDict<T> {
    pub fn new() -> Self {
        ResDict::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts `value` under `name`. A name that is already present keeps its position.
    pub fn insert<N: Into<String>>(&mut self, name: N, value: Rc<T>) -> Option<Rc<T>> {
        let name = name.into();
        if let Some(slot) = self.entries.get_mut(&name) {
            return Some(std::mem::replace(slot, value));
        }
        self.entries.insert(name, value)
    }

    pub fn get(&self, name: &str) -> Option<&Rc<T>> {
        self.entries.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Rc<T>> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rc<T>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Index of `name` in layout order.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.entries.keys().position(|k| k == name)
    }
}

impl<T> Clone for ResDict<T> {
    fn clone(&self) -> Self {
        ResDict {
            entries: self.entries.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ResDict<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for ResDict<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other.iter())
                .all(|((ka, va), (kb, vb))| ka == kb && va == vb)
    }
}

impl<N: Into<String>, T> FromIterator<(N, Rc<T>)> for ResDict<T> {
    fn from_iter<I: IntoIterator<Item = (N, Rc<T>)>>(iter: I) -> Self {
        let mut dict = ResDict::new();
        for (name, value) in iter {
            dict.insert(name, value);
        }
        dict
    }
}
