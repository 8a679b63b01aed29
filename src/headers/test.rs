use crate::headers::standard::{CONTENT_LENGTH, CONTENT_TYPE, HOST};
use crate::headers::{HeaderMap, HeaderName, HeaderValue};

const fn is_send_sync<T: Send + Sync>() { }
const _: () = {
    is_send_sync::<HeaderMap>();
    is_send_sync::<HeaderName>();
    is_send_sync::<HeaderValue>();
};

#[test]
fn header_map() {
    let mut map = HeaderMap::new();

    map.insert(HOST, HeaderValue::from_static("example.test"));
    map.insert("X-Custom", HeaderValue::from_static("a"));
    map.append("x-custom", HeaderValue::from_static("b"));
    map.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));

    assert_eq!(map.len(), 4);
    assert!(map.contains_key("host"));
    assert!(map.contains_key("HOST"));
    assert_eq!(map.get("x-CUSTOM").unwrap(), "a");

    let all = map.get_all("x-custom").collect::<Vec<_>>();
    assert_eq!(all, ["a", "b"]);

    // insertion order and original case are preserved
    let names = map.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["Host", "X-Custom", "x-custom", "Content-Type"]);

    // insert replaces in place and drops duplicates
    let old = map.insert("x-custom", HeaderValue::from_static("c"));
    assert_eq!(old.unwrap(), "a");
    assert_eq!(map.get_all("x-custom").count(), 1);
    let names = map.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, ["Host", "X-Custom", "Content-Type"]);
    assert_eq!(map.get("x-custom").unwrap(), "c");

    // remove
    assert!(map.remove(CONTENT_LENGTH).is_none());
    assert_eq!(map.remove("content-type").unwrap(), "text/plain");
    assert!(!map.contains_key(CONTENT_TYPE));
    assert_eq!(map.len(), 2);
}

#[test]
fn header_token() {
    let mut map = HeaderMap::new();
    map.append("Connection", HeaderValue::from_static("Keep-Alive, Upgrade"));
    map.append("Expect", HeaderValue::from_static("100-Continue"));

    assert!(map.contains_token("connection", "keep-alive"));
    assert!(map.contains_token("connection", "upgrade"));
    assert!(!map.contains_token("connection", "close"));
    assert!(map.contains_token("expect", "100-continue"));
    assert!(!map.contains_token("te", "trailers"));
}

#[test]
fn header_validation() {
    assert!(HeaderName::from_slice("Content-Type").is_ok());
    assert!(HeaderName::from_slice("").is_err());
    assert!(HeaderName::from_slice("Bad Name").is_err());
    assert!(HeaderName::from_slice("Bad:Name").is_err());

    assert!("value\twith tab".parse::<HeaderValue>().is_ok());
    assert!("bad\r\nvalue".parse::<HeaderValue>().is_err());

    assert_eq!(HeaderValue::from_u64(1024), "1024");
    assert_eq!(HeaderName::from_static("host"), HOST);
}
