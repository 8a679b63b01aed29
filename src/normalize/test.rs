use bytes::Bytes;

use super::normalize;
use crate::body::{Body, BodyStream, Form};
use crate::config::Options;
use crate::error::Error;
use crate::headers::HeaderValue;
use crate::http::{Method, Uri, Version};
use crate::request::{IntoRequest, Request};

fn uri(s: &str) -> Uri {
    Uri::parse(s).unwrap()
}

async fn run(req: Request) -> Request {
    normalize(req, &Options::default()).await.unwrap()
}

#[tokio::test]
async fn get_defaults() {
    let req = run("http://Example.test:80".into_request().unwrap()).await;
    let headers = req.headers();

    assert_eq!(req.method(), &Method::GET);
    assert_eq!(req.version(), &Version::HTTP_11);
    assert_eq!(headers.get("host").unwrap(), "example.test");
    assert!(headers.get("user-agent").unwrap().to_str().unwrap().starts_with("ferry/"));
    assert!(!headers.contains_key("content-length"));
    assert!(!headers.contains_key("expect"));
    assert!(req.body().is_empty());

    let req = run(Request::get(uri("https://example.test:8443/"))).await;
    assert_eq!(req.headers().get("host").unwrap(), "example.test:8443");

    let req = Request::get(uri("http://example.test/"))
        .with_header("Host", HeaderValue::from_static("virtual.test"))
        .with_header("User-Agent", HeaderValue::from_static("custom"));
    let req = run(req).await;
    assert_eq!(req.headers().get("host").unwrap(), "virtual.test");
    assert_eq!(req.headers().get("user-agent").unwrap(), "custom");
}

#[tokio::test]
async fn invalid_input() {
    assert!(matches!("example.test/path".into_request(), Err(Error::InvalidRequest(_))));

    let err = normalize(Request::get(uri("ftp://example.test/")), &Options::default()).await;
    assert!(matches!(err, Err(Error::InvalidRequest(_))));
}

#[tokio::test]
async fn scalar_body() {
    let req = Request::post(uri("http://example.test/submit"), "a=1")
        .with_header("Transfer-Encoding", HeaderValue::from_static("chunked"));
    let req = run(req).await;

    assert_eq!(req.headers().get("content-length").unwrap(), "3");
    assert!(!req.headers().contains_key("transfer-encoding"));
    assert_eq!(req.headers().get("expect").unwrap(), "100-continue");
    assert!(matches!(req.body(), Body::Full(bytes) if bytes == "a=1"));
}

#[tokio::test]
async fn empty_body_methods() {
    let req = run(Request::new(Method::POST, uri("http://example.test/"))).await;
    assert_eq!(req.headers().get("content-length").unwrap(), "0");
    assert!(!req.headers().contains_key("expect"));

    let req = run(Request::new(Method::DELETE, uri("http://example.test/"))).await;
    assert!(!req.headers().contains_key("content-length"));

    let req = Request::new(Method::HEAD, uri("http://example.test/")).with_body("dropped");
    let req = run(req).await;
    assert!(req.body().is_empty());
    assert!(!req.headers().contains_key("content-length"));
}

#[tokio::test]
async fn stream_body() {
    let stream = BodyStream::from_chunks([Bytes::from_static(b"abc"), Bytes::from_static(b"de")]);
    let req = run(Request::new(Method::PUT, uri("http://example.test/")).with_body(stream)).await;
    assert_eq!(req.headers().get("transfer-encoding").unwrap(), "chunked");
    assert!(!req.headers().contains_key("content-length"));

    let mut req = req;
    let Body::Stream(stream) = req.take_body() else {
        panic!("stream body is kept as a stream");
    };
    assert_eq!(stream.collect().await.unwrap(), "3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n");

    let stream = BodyStream::with_len(BodyStream::from_chunks([Bytes::from_static(b"abc")]), 3);
    let req = run(Request::new(Method::PUT, uri("http://example.test/")).with_body(stream)).await;
    assert_eq!(req.headers().get("content-length").unwrap(), "3");
    assert!(!req.headers().contains_key("transfer-encoding"));

    let stream = BodyStream::from_chunks([Bytes::from_static(b"abc"), Bytes::from_static(b"de")]);
    let req = Request::new(Method::PUT, uri("http://example.test/"))
        .with_version(Version::HTTP_10)
        .with_body(stream);
    let req = run(req).await;
    assert_eq!(req.headers().get("content-length").unwrap(), "5");
    assert!(matches!(req.body(), Body::Full(bytes) if bytes == "abcde"));
}

#[tokio::test]
async fn aggregate_body() {
    let form = Form::new().field("a", "1").field("b", "two words");
    let req = run(Request::post(uri("http://example.test/"), form)).await;

    assert_eq!(req.headers().get("content-type").unwrap(), "application/x-www-form-urlencoded");
    assert_eq!(req.headers().get("content-length").unwrap(), "15");
    assert!(matches!(req.body(), Body::Full(bytes) if bytes == "a=1&b=two+words"));
}

#[tokio::test]
async fn option_driven_headers() {
    let mut options = Options::default();
    options.keep_alive = false;
    options.send_expect_continue = false;

    let req = Request::post(uri("http://example.test/"), "x")
        .with_header("Accept-Encoding", HeaderValue::from_static("br"));
    let req = normalize(req, &options).await.unwrap();

    assert_eq!(req.headers().get("connection").unwrap(), "close");
    assert!(!req.headers().contains_key("expect"));
    if cfg!(feature = "gzip") {
        assert_eq!(req.headers().get("accept-encoding").unwrap(), "gzip, identity");
    } else {
        assert!(!req.headers().contains_key("accept-encoding"));
    }

    options.auto_accept_encoding = false;
    let req = Request::get(uri("http://example.test/"))
        .with_header("Accept-Encoding", HeaderValue::from_static("br"));
    let req = normalize(req, &options).await.unwrap();
    assert_eq!(req.headers().get("accept-encoding").unwrap(), "br");
}
