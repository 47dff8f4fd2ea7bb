//! Wire-order control for request headers.
//!
//! Profiles install per-method order tables; callers can override per
//! request. The enforcer splits an ordered name list into pseudo headers
//! (`:`-prefixed, HTTP/2/3 only) and regular headers, dedupes them, and
//! rewrites the request so the engine emits both in the given order. Headers
//! not named by the order sort after all named ones, stably.

use std::collections::HashMap;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use hyper2::PseudoOrder;

/// Which wire family an order applies to. Pseudo-header order differs
/// between HTTP/2 and HTTP/3 for some browsers.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum OrderFamily {
    /// HTTP/1.1 and HTTP/2.
    Http1Or2,
    /// HTTP/3.
    Http3,
}

/// An ordered, deduplicated list of header names defining wire order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeaderOrder {
    pseudo: Option<[PseudoOrder; 4]>,
    regular: Vec<HeaderName>,
}

impl HeaderOrder {
    /// Builds an order from raw names, in the order given.
    ///
    /// Names are lowercased; duplicates keep their first position; names
    /// starting with `:` populate the pseudo-header order.
    pub fn from_names<I, S>(names: I) -> HeaderOrder
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pseudo = Vec::with_capacity(4);
        let mut regular: Vec<HeaderName> = Vec::new();

        for name in names {
            let name = name.as_ref();
            if let Some(pseudo_name) = name.strip_prefix(':') {
                let id = match pseudo_name.to_ascii_lowercase().as_str() {
                    "method" => PseudoOrder::Method,
                    "scheme" => PseudoOrder::Scheme,
                    "authority" => PseudoOrder::Authority,
                    "path" => PseudoOrder::Path,
                    _ => continue,
                };
                if !pseudo.contains(&id) {
                    pseudo.push(id);
                }
            } else if let Ok(name) = HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes()) {
                if !regular.contains(&name) {
                    regular.push(name);
                }
            }
        }

        HeaderOrder {
            pseudo: if pseudo.is_empty() {
                None
            } else {
                Some(complete_pseudo(pseudo))
            },
            regular,
        }
    }

    /// The pseudo-header emission order, when the order names any.
    pub fn pseudo(&self) -> Option<[PseudoOrder; 4]> {
        self.pseudo
    }

    /// The regular-header order vector.
    pub fn regular(&self) -> &[HeaderName] {
        &self.regular
    }

    /// Rewrites `headers` so iteration yields the ordered names first, in
    /// order, then all remaining headers in their previous relative order.
    pub(crate) fn sort_headers(&self, headers: &mut HeaderMap) {
        if headers.len() <= 1 || self.regular.is_empty() {
            return;
        }

        let mut sorted = HeaderMap::with_capacity(headers.keys_len());

        for name in &self.regular {
            for value in headers.get_all(name) {
                sorted.append(name.clone(), value.clone());
            }
            headers.remove(name);
        }

        // HeaderMap::drain yields the name only for the first value of each
        // key; follow-up values belong to the previous name.
        let mut prev_name: Option<HeaderName> = None;
        for (name, value) in headers.drain() {
            match (name, &prev_name) {
                (Some(name), _) => {
                    prev_name.replace(name.clone());
                    sorted.insert(name, value);
                }
                (None, Some(prev)) => {
                    sorted.append(prev.clone(), value);
                }
                (None, None) => {}
            }
        }

        std::mem::swap(headers, &mut sorted);
    }
}

/// Pads a partial pseudo order out to all four ids, appending the missing
/// ones in protocol-default order.
fn complete_pseudo(mut pseudo: Vec<PseudoOrder>) -> [PseudoOrder; 4] {
    for id in [
        PseudoOrder::Method,
        PseudoOrder::Scheme,
        PseudoOrder::Authority,
        PseudoOrder::Path,
    ] {
        if !pseudo.contains(&id) {
            pseudo.push(id);
        }
    }
    [pseudo[0], pseudo[1], pseudo[2], pseudo[3]]
}

/// Per-method header order tables for one profile.
///
/// Lookup resolves `(method, family)`, falling back to the family default.
#[derive(Clone, Debug, Default)]
pub struct HeaderOrderTable {
    methods: HashMap<(Method, OrderFamily), HeaderOrder>,
    defaults: HashMap<OrderFamily, HeaderOrder>,
}

impl HeaderOrderTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the fallback order for a wire family.
    pub fn with_default<I, S>(mut self, family: OrderFamily, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.defaults.insert(family, HeaderOrder::from_names(names));
        self
    }

    /// Installs a method-specific order for a wire family.
    pub fn with_method<I, S>(mut self, method: Method, family: OrderFamily, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.methods
            .insert((method, family), HeaderOrder::from_names(names));
        self
    }

    /// Resolves the order for a request.
    pub fn get(&self, method: &Method, family: OrderFamily) -> Option<&HeaderOrder> {
        self.methods
            .get(&(method.clone(), family))
            .or_else(|| self.defaults.get(&family))
    }

    /// True when the table carries no orders at all.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty() && self.defaults.is_empty()
    }
}

/// Splits caller-supplied ordered `(name, value)` pairs into actual headers
/// and an order.
///
/// Pairs with an empty value are placeholders: they contribute to the order
/// but never reach the header map.
pub(crate) fn split_ordered_headers<'a, I>(pairs: I) -> (HeaderMap, HeaderOrder)
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut names = Vec::new();
    let mut headers = HeaderMap::new();

    for (name, value) in pairs {
        names.push(name.to_owned());
        if name.starts_with(':') || value.is_empty() {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.to_ascii_lowercase().as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.append(name, value);
        }
    }

    (headers, HeaderOrder::from_names(names))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(order: &HeaderOrder) -> Vec<&str> {
        order.regular().iter().map(|n| n.as_str()).collect()
    }

    #[test]
    fn splits_pseudo_from_regular() {
        let order = HeaderOrder::from_names([":method", "user-agent", ":path", "accept"]);
        assert_eq!(
            order.pseudo(),
            Some([
                PseudoOrder::Method,
                PseudoOrder::Path,
                PseudoOrder::Scheme,
                PseudoOrder::Authority,
            ])
        );
        assert_eq!(names(&order), ["user-agent", "accept"]);
    }

    #[test]
    fn dedupes_first_occurrence_and_lowercases() {
        let order = HeaderOrder::from_names(["Accept", "User-Agent", "accept", "ACCEPT"]);
        assert_eq!(names(&order), ["accept", "user-agent"]);
    }

    #[test]
    fn sort_puts_known_first_unknown_after_stably() {
        let order = HeaderOrder::from_names(["b", "a"]);
        let mut headers = HeaderMap::new();
        headers.insert("x-one", HeaderValue::from_static("1"));
        headers.insert("a", HeaderValue::from_static("2"));
        headers.insert("x-two", HeaderValue::from_static("3"));
        headers.insert("b", HeaderValue::from_static("4"));

        order.sort_headers(&mut headers);

        let got: Vec<&str> = headers.keys().map(|k| k.as_str()).collect();
        assert_eq!(&got[..2], ["b", "a"]);
        // Unknown headers follow, preserving their relative order.
        let rest: Vec<&str> = got[2..].to_vec();
        let one = rest.iter().position(|&n| n == "x-one").unwrap();
        let two = rest.iter().position(|&n| n == "x-two").unwrap();
        assert!(one < two);
    }

    #[test]
    fn sort_preserves_multi_values() {
        let order = HeaderOrder::from_names(["cookie", "accept"]);
        let mut headers = HeaderMap::new();
        headers.insert("accept", HeaderValue::from_static("*/*"));
        headers.append("cookie", HeaderValue::from_static("a=1"));
        headers.append("cookie", HeaderValue::from_static("b=2"));

        order.sort_headers(&mut headers);

        let values: Vec<_> = headers.get_all("cookie").iter().collect();
        assert_eq!(values, ["a=1", "b=2"]);
        assert_eq!(headers.keys().next().unwrap(), "cookie");
    }

    #[test]
    fn placeholders_order_without_values() {
        let (headers, order) =
            split_ordered_headers([(":path", ""), ("x-custom", "v"), ("x-empty", "")]);

        assert_eq!(headers.get("x-custom").unwrap(), "v");
        assert!(!headers.contains_key("x-empty"));
        assert_eq!(
            order.pseudo().unwrap()[0],
            PseudoOrder::Path,
        );
        assert_eq!(names(&order), ["x-custom", "x-empty"]);
    }

    #[test]
    fn table_resolves_method_then_default() {
        let table = HeaderOrderTable::new()
            .with_default(OrderFamily::Http1Or2, ["user-agent", "accept"])
            .with_method(Method::POST, OrderFamily::Http1Or2, ["content-type", "accept"]);

        let post = table.get(&Method::POST, OrderFamily::Http1Or2).unwrap();
        assert_eq!(names(post), ["content-type", "accept"]);

        let get = table.get(&Method::GET, OrderFamily::Http1Or2).unwrap();
        assert_eq!(names(get), ["user-agent", "accept"]);

        assert!(table.get(&Method::GET, OrderFamily::Http3).is_none());
    }
}
