use std::collections::BTreeMap;
use std::ops::Bound;

/// The ordered key-value store a keyed table is layered on.
///
/// Keys iterate in lexical (byte) order.
pub trait KvEngine {
    fn put(&mut self, key: &str, value: &str);

    /// Every entry whose key starts with `prefix`, in key order.
    fn scan_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;
}

#[derive(Debug, Default, Clone)]
pub struct MemEngine {
    entries: BTreeMap<String, String>,
}

impl MemEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl KvEngine for MemEngine {
    fn put(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_owned(), value.to_owned());
    }

    fn scan_prefix<'a>(
        &'a self,
        prefix: &'a str,
    ) -> Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a> {
        Box::new(
            self.entries
                .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
                .take_while(move |(k, _)| k.starts_with(prefix))
                .map(|(k, v)| (k.as_str(), v.as_str())),
        )
    }
}
