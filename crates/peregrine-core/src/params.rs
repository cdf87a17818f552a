//! Path parameter storage.
//!
//! Parameters bound during trie matching are stored on the stack for the
//! common case of four or fewer captures. Insertion order is match order and
//! lookup is a linear scan, which beats hashing at these cardinalities.

use smallvec::SmallVec;

/// Captures held inline before spilling to the heap.
const STACK_PARAMS: usize = 4;

/// Ordered `name -> value` pairs bound by the router during matching.
///
/// Values are owned: the matched text is copied out of the request buffer at
/// bind time so params never borrow from connection memory.
#[derive(Debug, Clone, Default)]
pub struct PathParams {
    inner: SmallVec<[(String, String); STACK_PARAMS]>,
}

impl PathParams {
    /// Create an empty collection.
    #[inline]
    pub fn new() -> Self {
        Self {
            inner: SmallVec::new(),
        }
    }

    /// Bind a parameter. Called by the router in match order.
    #[inline]
    pub fn insert(&mut self, name: String, value: String) {
        self.inner.push((name, value));
    }

    /// Look up a bound value by name.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Iterate pairs in match order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut params = PathParams::new();
        params.insert("id".to_string(), "42".to_string());
        params.insert("name".to_string(), "ada".to_string());

        assert_eq!(params.get("id"), Some("42"));
        assert_eq!(params.get("name"), Some("ada"));
        assert_eq!(params.get("missing"), None);
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_iteration_preserves_match_order() {
        let mut params = PathParams::new();
        params.insert("a".to_string(), "1".to_string());
        params.insert("b".to_string(), "2".to_string());

        let order: Vec<&str> = params.iter().map(|(n, _)| n).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn test_spills_past_inline_capacity() {
        let mut params = PathParams::new();
        for i in 0..8 {
            params.insert(format!("k{i}"), format!("v{i}"));
        }
        assert_eq!(params.len(), 8);
        assert_eq!(params.get("k7"), Some("v7"));
    }
}
