use super::{AsHeaderName, HeaderName, HeaderValue, IntoHeaderName};

/// HTTP Headers Multimap.
///
/// Fields are kept in insertion order, which is also the order they are written on the wire.
#[derive(Clone, Default)]
pub struct HeaderMap {
    fields: Vec<HeaderField>,
}

#[derive(Clone, Debug)]
struct HeaderField {
    name: HeaderName,
    value: HeaderValue,
}

impl HeaderMap {
    /// Create new empty [`HeaderMap`].
    ///
    /// This function does not allocate.
    #[inline]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Create new empty [`HeaderMap`] with at least the specified capacity.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Returns the number of fields, counting duplicates.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if headers has no element.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ===== Lookup =====

impl HeaderMap {
    /// Returns `true` if the map contains a header value for given header name.
    #[inline]
    pub fn contains_key<K: AsHeaderName>(&self, name: K) -> bool {
        let name = name.as_header_str();
        self.fields.iter().any(|field| field.name.matches(name))
    }

    /// Returns a reference to the first header value corresponding to the given header name.
    ///
    /// ```rust
    /// use ferry::headers::{standard::CONTENT_TYPE, HeaderMap, HeaderValue};
    ///
    /// let mut map = HeaderMap::new();
    /// map.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));
    /// assert_eq!(map.get("content-type").unwrap(), "text/html");
    /// ```
    #[inline]
    pub fn get<K: AsHeaderName>(&self, name: K) -> Option<&HeaderValue> {
        let name = name.as_header_str();
        self.fields
            .iter()
            .find(|field| field.name.matches(name))
            .map(|field| &field.value)
    }

    /// Returns an iterator to all header values corresponding to the given header name, in
    /// insertion order.
    #[inline]
    pub fn get_all<K: AsHeaderName>(&self, name: K) -> GetAll<'_, K> {
        GetAll {
            iter: self.fields.iter(),
            name,
        }
    }

    /// Returns `true` if any value of the given header contains `token` in its comma separated
    /// list, ignoring ASCII case.
    pub fn contains_token<K: AsHeaderName>(&self, name: K, token: &str) -> bool {
        self.get_all(name).any(|value| value.contains_token(token))
    }

    /// Returns an iterator over headers as name and value pair.
    #[inline]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            iter: self.fields.iter(),
        }
    }
}

// ===== Mutation =====

impl HeaderMap {
    /// Inserts a key-value pair into the map.
    ///
    /// If the map did have this key present, the first field takes the new value in place, the
    /// remaining duplicates are removed, and the old first value is returned.
    pub fn insert<K: IntoHeaderName>(&mut self, name: K, value: HeaderValue) -> Option<HeaderValue> {
        let name = name.into_header_name();
        let Some(idx) = self.position(name.as_str()) else {
            self.fields.push(HeaderField { name, value });
            return None;
        };

        let old = std::mem::replace(&mut self.fields[idx].value, value);
        let mut current = 0;
        self.fields.retain(|field| {
            let keep = current <= idx || !field.name.matches(name.as_str());
            current += 1;
            keep
        });
        Some(old)
    }

    /// Appends a key-value pair into the map, keeping existing values.
    #[inline]
    pub fn append<K: IntoHeaderName>(&mut self, name: K, value: HeaderValue) {
        self.fields.push(HeaderField {
            name: name.into_header_name(),
            value,
        });
    }

    /// Removes all values of a header, returning the first one if the key was present.
    pub fn remove<K: AsHeaderName>(&mut self, name: K) -> Option<HeaderValue> {
        let name = name.as_header_str();
        let idx = self.position(name)?;
        let first = self.fields.remove(idx);
        self.fields.retain(|field| !field.name.matches(name));
        Some(first.value)
    }

    /// Removes all headers.
    #[inline]
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name.matches(name))
    }
}

// ===== Iterators =====

/// Iterator over all values of one header, see [`HeaderMap::get_all`].
#[derive(Debug)]
pub struct GetAll<'a, K> {
    iter: std::slice::Iter<'a, HeaderField>,
    name: K,
}

impl<'a, K: AsHeaderName> Iterator for GetAll<'a, K> {
    type Item = &'a HeaderValue;

    fn next(&mut self) -> Option<Self::Item> {
        let name = self.name.as_header_str();
        self.iter
            .by_ref()
            .find(|field| field.name.matches(name))
            .map(|field| &field.value)
    }
}

/// Iterator over headers as name and value pair, see [`HeaderMap::iter`].
#[derive(Debug)]
pub struct Iter<'a> {
    iter: std::slice::Iter<'a, HeaderField>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = (&'a HeaderName, &'a HeaderValue);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|field| (&field.name, &field.value))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<'a> IntoIterator for &'a HeaderMap {
    type Item = (&'a HeaderName, &'a HeaderValue);

    type IntoIter = Iter<'a>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl std::fmt::Debug for HeaderMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
