use core::fmt;

/// An owned, immutable key/value record produced by bulk export.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyValuePair<K, V> {
    key: K,
    value: V,
}

impl<K, V> KeyValuePair<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }
}

impl<K, V> From<(K, V)> for KeyValuePair<K, V> {
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

/// Renders as `[key, value]`.
impl<K: fmt::Display, V: fmt::Display> fmt::Display for KeyValuePair<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.key, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_bracketed() {
        let p = KeyValuePair::new("e", "f");
        assert_eq!(p.to_string(), "[e, f]");
        let empty = KeyValuePair::new(String::new(), String::new());
        assert_eq!(empty.to_string(), "[, ]");
    }

    #[test]
    fn parts_round_out() {
        let p: KeyValuePair<String, i32> = ("k".to_string(), 1).into();
        assert_eq!(p.key(), "k");
        assert_eq!(*p.value(), 1);
        assert_eq!(p.into_parts(), ("k".to_string(), 1));
    }
}
