use bytes::Bytes;
use std::{
    future::Future,
    io::Write,
    net::SocketAddr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::{mpsc, oneshot},
};

use ferry::{
    BodyStream, Client, Error, Event, Method, Options, ParseError, Request, ResponseBody,
    StatusCode, Uri,
};

// ===== Scripted Server =====

struct Head {
    line: String,
    headers: Vec<(String, String)>,
}

impl Head {
    fn path(&self) -> &str {
        self.line.split(' ').nth(1).unwrap_or_default()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

struct Conn {
    io: BufReader<TcpStream>,
}

impl Conn {
    /// Read a request head, `None` once the client closed the connection.
    async fn head(&mut self) -> Option<Head> {
        let mut line = String::new();
        if self.io.read_line(&mut line).await.ok()? == 0 {
            return None;
        }
        let mut head = Head {
            line: line.trim_end().to_owned(),
            headers: vec![],
        };
        loop {
            let mut line = String::new();
            if self.io.read_line(&mut line).await.ok()? == 0 {
                return None;
            }
            let line = line.trim_end();
            if line.is_empty() {
                return Some(head);
            }
            let (name, value) = line.split_once(':')?;
            head.headers.push((name.to_owned(), value.trim().to_owned()));
        }
    }

    async fn body(&mut self, head: &Head) -> Vec<u8> {
        let len = head.header("content-length").map_or(0, |len| len.parse().unwrap());
        let mut body = vec![0; len];
        self.io.read_exact(&mut body).await.unwrap();
        body
    }

    /// Read raw bytes up to and including `end`.
    async fn raw_until(&mut self, end: &[u8]) -> Vec<u8> {
        let mut raw = vec![];
        while !raw.ends_with(end) {
            raw.push(self.io.read_u8().await.unwrap());
        }
        raw
    }

    async fn send(&mut self, data: impl AsRef<[u8]>) {
        self.io.get_mut().write_all(data.as_ref()).await.unwrap();
    }
}

/// Serve every connection with `handler`, returns the base URI and the accepted connection count.
async fn serve<F, Fut>(handler: F) -> (String, Arc<AtomicUsize>)
where
    F: Fn(Conn) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();
    let handler = Arc::new(handler);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let handler = handler.clone();
            tokio::spawn(async move { handler(Conn { io: BufReader::new(stream) }).await });
        }
    });

    (format!("http://{addr}"), accepted)
}

type BoxFuture = std::pin::Pin<Box<dyn Future<Output = ()> + Send>>;

fn ok(body: &str) -> String {
    format!("HTTP/1.1 200 OK\r\nContent-Length: {}\r\n\r\n{body}", body.len())
}

/// Answers each request on a connection with its path, forwarding the heads to `tx`.
fn echo_path(tx: mpsc::UnboundedSender<Head>) -> impl Fn(Conn) -> BoxFuture + Send + Sync + 'static {
    move |mut conn| {
        let tx = tx.clone();
        Box::pin(async move {
            while let Some(head) = conn.head().await {
                let body = conn.body(&head).await;
                let mut reply = format!("{} {}", head.path(), body.len());
                if head.header("connection") == Some("close") {
                    reply.push_str(" close");
                }
                conn.send(ok(&reply)).await;
                let _ = tx.send(head);
            }
        })
    }
}

fn options() -> Options {
    Options {
        send_expect_continue: false,
        ..Options::default()
    }
}

// ===== Request Serialization =====

#[tokio::test]
async fn get_request_line() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (base, _) = serve(echo_path(tx)).await;
    let client = Client::new(options());

    let response = client.request(base.as_str()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.reason(), "OK");
    assert_eq!(response.into_body().into_text().unwrap(), "/ 0");

    let head = rx.recv().await.unwrap();
    assert_eq!(head.line, "GET / HTTP/1.1");
    assert_eq!(head.header("host"), Some(&base["http://".len()..]));
    assert!(head.header("user-agent").unwrap().starts_with("ferry/"));
    assert_eq!(head.header("accept-encoding"), Some("gzip, identity"));
    assert_eq!(head.header("content-length"), None);
    assert_eq!(head.header("transfer-encoding"), None);
}

#[tokio::test]
async fn post_content_length() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (base, _) = serve(echo_path(tx)).await;
    let client = Client::new(options());

    let uri = Uri::parse(&format!("{base}/submit?x=1")).unwrap();
    let response = client.request(Request::post(uri, "a=1")).await.unwrap();
    assert_eq!(response.into_body().into_text().unwrap(), "/submit?x=1 3");

    let head = rx.recv().await.unwrap();
    assert_eq!(head.line, "POST /submit?x=1 HTTP/1.1");
    assert_eq!(head.header("content-length"), Some("3"));
    assert_eq!(head.header("transfer-encoding"), None);
    assert_eq!(head.header("expect"), None);
}

#[tokio::test]
async fn header_order_and_case() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (base, _) = serve(echo_path(tx)).await;
    let client = Client::new(options());

    let request = Request::get(Uri::parse(&base).unwrap())
        .with_header("X-First", "1".into())
        .with_header("x-second", "2".into())
        .with_header("X-First", "3".into());
    client.request(request).await.unwrap();

    let head = rx.recv().await.unwrap();
    let custom: Vec<_> = head
        .headers
        .iter()
        .filter(|(name, _)| name.starts_with("X-") || name.starts_with("x-"))
        .map(|(name, value)| format!("{name}={value}"))
        .collect();
    assert_eq!(custom, ["X-First=1", "x-second=2", "X-First=3"]);
}

#[tokio::test]
async fn chunked_put() {
    let (tx, rx) = oneshot::channel();
    let tx = Mutex::new(Some(tx));
    let (base, _) = serve(move |mut conn| {
        let tx = tx.lock().unwrap().take();
        async move {
            let head = conn.head().await.unwrap();
            let raw = conn.raw_until(b"0\r\n\r\n").await;
            conn.send(ok("")).await;
            if let Some(tx) = tx {
                let _ = tx.send((head, raw));
            }
        }
    })
    .await;
    let client = Client::new(options());

    let body = BodyStream::from_chunks([
        Bytes::from_static(b"hello "),
        Bytes::new(),
        Bytes::from_static(b"world"),
    ]);
    let request = Request::new(Method::PUT, Uri::parse(&format!("{base}/upload")).unwrap())
        .with_body(body);
    let response = client.request(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let (head, raw) = rx.await.unwrap();
    assert_eq!(head.line, "PUT /upload HTTP/1.1");
    assert_eq!(head.header("transfer-encoding"), Some("chunked"));
    assert_eq!(head.header("content-length"), None);
    assert_eq!(raw, b"6\r\nhello \r\n5\r\nworld\r\n0\r\n\r\n");
}

#[tokio::test]
async fn stream_length_mismatch() {
    let (base, _) = serve(|mut conn| async move {
        conn.head().await;
        let mut rest = vec![];
        let _ = conn.io.read_to_end(&mut rest).await;
    })
    .await;
    let client = Client::new(options());

    for (chunks, len) in [(&["abc"][..], 10), (&["hello", " world"][..], 5)] {
        let chunks: Vec<_> = chunks
            .iter()
            .copied()
            .map(|chunk| Bytes::from_static(chunk.as_bytes()))
            .collect();
        let body = BodyStream::with_len(BodyStream::from_chunks(chunks), len);
        let request = Request::new(Method::PUT, Uri::parse(&format!("{base}/upload")).unwrap())
            .with_body(body);
        let err = client.request(request).await.unwrap_err();
        assert!(matches!(err, Error::Body(_)), "{err:?}");
    }
}

// ===== 100-continue =====

#[tokio::test]
async fn continue_received() {
    let (base, _) = serve(|mut conn| async move {
        let head = conn.head().await.unwrap();
        assert_eq!(head.header("expect"), Some("100-continue"));
        conn.send("HTTP/1.1 100 Continue\r\n\r\n").await;
        let body = conn.body(&head).await;
        assert_eq!(body, b"payload");
        conn.send("HTTP/1.1 201 Created\r\nContent-Length: 0\r\n\r\n").await;
    })
    .await;
    let client = Client::new(Options {
        continue_wait: Duration::from_secs(30),
        ..Options::default()
    });

    let uri = Uri::parse(&base).unwrap();
    let response = tokio::time::timeout(
        Duration::from_secs(5),
        client.request(Request::post(uri, "payload")),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.body().is_empty());
}

#[tokio::test]
async fn continue_delay_elapsed() {
    let (base, _) = serve(|mut conn| async move {
        let head = conn.head().await.unwrap();
        let body = conn.body(&head).await;
        conn.send(ok(&String::from_utf8(body).unwrap())).await;
    })
    .await;
    let client = Client::new(Options {
        continue_wait: Duration::from_millis(50),
        ..Options::default()
    });

    let uri = Uri::parse(&base).unwrap();
    let response = client.request(Request::post(uri, "payload")).await.unwrap();
    assert_eq!(response.into_body().into_text().unwrap(), "payload");
}

// ===== Redirect =====

#[tokio::test]
async fn redirect_sets_referer() {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let (base, _) = serve(move |mut conn| {
        let tx = tx.clone();
        async move {
            while let Some(head) = conn.head().await {
                match head.path() {
                    "/old" => conn.send("HTTP/1.1 301 Moved\r\nLocation: /new\r\nContent-Length: 0\r\n\r\n").await,
                    _ => conn.send(ok("new")).await,
                }
                let _ = tx.send(head);
            }
        }
    })
    .await;
    let client = Client::new(options());

    let response = client.request(format!("{base}/old")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.uri().unwrap().path(), "/new");
    let previous = response.previous_response().unwrap();
    assert_eq!(previous.status(), StatusCode::MOVED_PERMANENTLY);
    assert_eq!(previous.uri().unwrap().path(), "/old");
    assert_eq!(response.into_body().into_text().unwrap(), "new");

    let first = rx.recv().await.unwrap();
    assert_eq!(first.line, "GET /old HTTP/1.1");
    let second = rx.recv().await.unwrap();
    assert_eq!(second.line, "GET /new HTTP/1.1");
    assert_eq!(second.header("referer"), Some(format!("{base}/old").as_str()));
}

#[tokio::test]
async fn redirect_loop_stops() {
    let requests = Arc::new(AtomicUsize::new(0));
    let count = requests.clone();
    let (base, _) = serve(move |mut conn| {
        let count = count.clone();
        async move {
            while let Some(head) = conn.head().await {
                count.fetch_add(1, Ordering::SeqCst);
                let location = if head.path() == "/a" { "/b" } else { "/a" };
                conn.send(format!(
                    "HTTP/1.1 302 Found\r\nLocation: {location}\r\nContent-Length: 0\r\n\r\n"
                ))
                .await;
            }
        }
    })
    .await;
    let client = Client::new(options());

    let response = client.request(format!("{base}/a")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.uri().unwrap().path(), "/b");
    assert_eq!(response.previous_response().unwrap().uri().unwrap().path(), "/a");
    assert_eq!(requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn redirect_disabled() {
    let (base, _) = serve(|mut conn| async move {
        conn.head().await.unwrap();
        conn.send("HTTP/1.1 302 Found\r\nLocation: /elsewhere\r\nContent-Length: 0\r\n\r\n").await;
    })
    .await;
    let client = Client::new(options());
    client.set_option("follow-redirects", false).unwrap();

    let response = client.request(format!("{base}/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(response.previous_response().is_none());
}

// ===== Connection Reuse =====

#[tokio::test]
async fn keep_alive_reuses_socket() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let (base, accepted) = serve(echo_path(tx)).await;
    let client = Client::new(options());

    for path in ["/one", "/two", "/three"] {
        let response = client.request(format!("{base}{path}")).await.unwrap();
        assert_eq!(response.into_body().into_text().unwrap(), format!("{path} 0"));
    }
    assert_eq!(accepted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn keep_alive_disabled() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let (base, accepted) = serve(echo_path(tx)).await;
    let client = Client::new(Options {
        keep_alive: false,
        ..options()
    });

    for path in ["/one", "/two"] {
        let response = client.request(format!("{base}{path}")).await.unwrap();
        assert_eq!(response.into_body().into_text().unwrap(), format!("{path} 0 close"));
    }
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn server_connection_close() {
    let (base, accepted) = serve(|mut conn| async move {
        while conn.head().await.is_some() {
            conn.send("HTTP/1.1 200 OK\r\nConnection: close\r\nContent-Length: 2\r\n\r\nok").await;
        }
    })
    .await;
    let client = Client::new(options());

    for _ in 0..2 {
        let response = client.request(base.as_str()).await.unwrap();
        assert_eq!(response.into_body().into_text().unwrap(), "ok");
    }
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn per_host_limit() {
    let live = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (live2, peak2) = (live.clone(), peak.clone());
    let (base, accepted) = serve(move |mut conn| {
        let (live, peak) = (live2.clone(), peak2.clone());
        async move {
            let now = live.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            while let Some(head) = conn.head().await {
                tokio::time::sleep(Duration::from_millis(20)).await;
                conn.send(ok(head.path())).await;
            }
            live.fetch_sub(1, Ordering::SeqCst);
        }
    })
    .await;
    let client = Client::new(options());
    client.set_option("max-connections-per-host", 2).unwrap();

    let futures: Vec<_> = (0..6).map(|i| client.submit(format!("{base}/{i}"))).collect();
    for (i, future) in futures.into_iter().enumerate() {
        let response = future.await.unwrap();
        assert_eq!(response.into_body().into_text().unwrap(), format!("/{i}"));
    }
    assert!(peak.load(Ordering::SeqCst) <= 2);
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn early_response_closes_socket() {
    /// Yields one chunk, then never completes.
    struct Stalled(bool);

    impl futures_core::Stream for Stalled {
        type Item = std::io::Result<Bytes>;

        fn poll_next(
            mut self: std::pin::Pin<&mut Self>,
            _: &mut std::task::Context<'_>,
        ) -> std::task::Poll<Option<Self::Item>> {
            if std::mem::replace(&mut self.0, true) {
                std::task::Poll::Pending
            } else {
                std::task::Poll::Ready(Some(Ok(Bytes::from_static(b"partial"))))
            }
        }
    }

    let (base, accepted) = serve(|mut conn| async move {
        let Some(head) = conn.head().await else {
            return;
        };
        if head.path() == "/upload" {
            conn.send("HTTP/1.1 413 Content Too Large\r\nContent-Length: 0\r\n\r\n").await;
            let mut rest = vec![];
            let _ = conn.io.read_to_end(&mut rest).await;
        } else {
            conn.send(ok("after")).await;
        }
    })
    .await;
    let client = Client::new(options());

    let request = Request::new(Method::PUT, Uri::parse(&format!("{base}/upload")).unwrap())
        .with_body(BodyStream::new(Stalled(false)));
    let response = client.request(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONTENT_TOO_LARGE);

    let response = client.request(format!("{base}/next")).await.unwrap();
    assert_eq!(response.into_body().into_text().unwrap(), "after");
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn idle_socket_frees_global_capacity() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let (first, first_accepted) = serve(echo_path(tx.clone())).await;
    let (second, second_accepted) = serve(echo_path(tx)).await;
    let client = Client::new(Options {
        max_connections: std::num::NonZeroUsize::new(1),
        keep_alive_idle_timeout: Duration::from_millis(100),
        ..options()
    });

    let response = client.request(format!("{first}/a")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    tokio::time::sleep(Duration::from_millis(200)).await;

    let response = tokio::time::timeout(Duration::from_secs(3), client.request(format!("{second}/b")))
        .await
        .expect("request to the second host got no socket")
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // a fresh idle socket also yields to another host
    let response = tokio::time::timeout(Duration::from_secs(3), client.request(format!("{first}/c")))
        .await
        .expect("request to the first host got no socket")
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(first_accepted.load(Ordering::SeqCst), 2);
    assert_eq!(second_accepted.load(Ordering::SeqCst), 1);
}

// ===== Response Body =====

#[tokio::test]
async fn eof_delimited_body() {
    let (base, _) = serve(|mut conn| async move {
        conn.head().await.unwrap();
        conn.send("HTTP/1.1 200 OK\r\n\r\nuntil the end").await;
    })
    .await;
    let client = Client::new(options());

    let response = client.request(base.as_str()).await.unwrap();
    assert_eq!(response.into_body().into_text().unwrap(), "until the end");
}

#[tokio::test]
async fn chunked_response_with_trailers() {
    let (base, _) = serve(|mut conn| async move {
        conn.head().await.unwrap();
        conn.send(
            "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n\
             5\r\nhello\r\n6\r\n world\r\n0\r\nX-Checksum: 42\r\n\r\n",
        )
        .await;
    })
    .await;
    let client = Client::new(options());

    let response = client.request(base.as_str()).await.unwrap();
    assert_eq!(response.headers().get("x-checksum").unwrap(), "42");
    assert_eq!(response.into_body().into_text().unwrap(), "hello world");
}

#[tokio::test]
async fn gzip_body() {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(b"hello gzip").unwrap();
    let compressed = encoder.finish().unwrap();

    let (base, _) = serve(move |mut conn| {
        let compressed = compressed.clone();
        async move {
            conn.head().await.unwrap();
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\nContent-Length: {}\r\n\r\n",
                compressed.len()
            );
            conn.send(head).await;
            conn.send(compressed).await;
        }
    })
    .await;
    let client = Client::new(options());

    let response = client.request(base.as_str()).await.unwrap();
    assert!(!response.headers().contains_key("content-encoding"));
    assert_eq!(response.into_body().into_text().unwrap(), "hello gzip");
}

#[tokio::test]
async fn gzip_spilled_body() {
    let text = "compressed and spilled ".repeat(64);
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    let (base, _) = serve(move |mut conn| {
        let compressed = compressed.clone();
        async move {
            while conn.head().await.is_some() {
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Encoding: gzip\r\nContent-Length: {}\r\n\r\n",
                    compressed.len()
                );
                conn.send(head).await;
                conn.send(&compressed).await;
            }
        }
    })
    .await;
    let client = Client::new(Options {
        body_spill_threshold: 16,
        ..options()
    });

    let response = client.request(base.as_str()).await.unwrap();
    assert!(!response.headers().contains_key("content-length"));
    let body = response.into_body();
    assert!(matches!(body, ResponseBody::Bytes(_)));
    assert_eq!(body.into_text().unwrap(), text);

    client.set_option("buffer-response-body", false).unwrap();
    let body = client.request(base.as_str()).await.unwrap().into_body();
    assert!(matches!(body, ResponseBody::File(_)));
    assert_eq!(body.into_text().unwrap(), text);
}

#[tokio::test]
async fn spilled_body() {
    let (base, _) = serve(|mut conn| async move {
        conn.head().await.unwrap();
        conn.send(ok("a body larger than the threshold")).await;
    })
    .await;
    let client = Client::new(Options {
        body_spill_threshold: 8,
        buffer_response_body: false,
        ..options()
    });

    let response = client.request(base.as_str()).await.unwrap();
    let body = response.into_body();
    assert!(matches!(body, ResponseBody::File(_)));
    assert_eq!(body.into_text().unwrap(), "a body larger than the threshold");
}

#[tokio::test]
async fn body_limit() {
    let (base, _) = serve(|mut conn| async move {
        conn.head().await.unwrap();
        conn.send(ok("too long")).await;
    })
    .await;
    let client = Client::new(options());
    client.set_option("max-body-bytes", 4).unwrap();

    let err = client.request(base.as_str()).await.unwrap_err();
    assert!(matches!(err, Error::Parse(ParseError::BodyTooLarge)), "{err:?}");
}

// ===== Errors =====

#[tokio::test]
async fn malformed_response() {
    let (base, _) = serve(|mut conn| async move {
        conn.head().await.unwrap();
        conn.send("garbage\r\n\r\n").await;
    })
    .await;
    let client = Client::new(options());

    let err = client.request(base.as_str()).await.unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "{err:?}");
}

#[tokio::test]
async fn truncated_response() {
    let (base, _) = serve(|mut conn| async move {
        conn.head().await.unwrap();
        conn.send("HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nshort").await;
    })
    .await;
    let client = Client::new(options());

    let err = client.request(base.as_str()).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "{err:?}");
}

#[tokio::test]
async fn transfer_timeout() {
    let (base, _) = serve(|mut conn| async move {
        conn.head().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    })
    .await;
    let client = Client::new(Options {
        transfer_timeout: Some(Duration::from_millis(100)),
        ..options()
    });

    let err = client.request(base.as_str()).await.unwrap_err();
    assert!(err.is_timeout(), "{err:?}");
    assert!(matches!(err, Error::TransferTimeout));
}

#[tokio::test]
async fn dns_failure() {
    let client = Client::new(options());
    let err = client.request("http://nonexistent.invalid/").await.unwrap_err();
    assert!(matches!(err, Error::Dns { ref host, .. } if host == "nonexistent.invalid"), "{err:?}");
}

#[tokio::test]
async fn invalid_request() {
    let client = Client::new(options());

    let err = client.request("not a uri").await.unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)), "{err:?}");
    let err = client.request("ftp://example.test/file").await.unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)), "{err:?}");
    let err = client.set_option("no-such-option", true).unwrap_err();
    assert_eq!(err, ferry::ConfigError::UnknownOption("no-such-option".into()));
}

// ===== Cancellation and Observation =====

#[tokio::test]
async fn cancel_request() {
    let (seen_tx, seen_rx) = oneshot::channel();
    let seen_tx = Mutex::new(Some(seen_tx));
    let (base, _) = serve(move |mut conn| {
        let seen_tx = seen_tx.lock().unwrap().take();
        async move {
            conn.head().await.unwrap();
            if let Some(tx) = seen_tx {
                let _ = tx.send(());
            }
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    })
    .await;
    let client = Client::new(options());

    let cancelled = Arc::new(AtomicUsize::new(0));
    let count = cancelled.clone();
    client.observe(move |_: &Request, event: &Event<'_>| {
        if let Event::Cancel = event {
            count.fetch_add(1, Ordering::SeqCst);
        }
    });

    let future = client.submit(base.as_str());
    seen_rx.await.unwrap();
    client.cancel(future.id());

    let err = future.await.unwrap_err();
    assert!(err.is_cancelled(), "{err:?}");
    assert_eq!(cancelled.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn observe_lifecycle() {
    let (tx, _rx) = mpsc::unbounded_channel();
    let (base, _) = serve(echo_path(tx)).await;
    let client = Client::new(options());

    let events = Arc::new(Mutex::new(Vec::new()));
    let log = events.clone();
    let id = client.observe(move |request: &Request, event: &Event<'_>| {
        let name = match event {
            Event::Request => "request",
            Event::Socket { .. } => "socket",
            Event::Headers(_) => "headers",
            Event::BodyData(_) => "body",
            Event::Response(_) => "response",
            Event::DataOut(_) | Event::DataIn(_) => return,
            _ => "other",
        };
        log.lock().unwrap().push(format!("{name} {}", request.uri().path()));
    });

    client.request(format!("{base}/watched")).await.unwrap();
    client.remove_observation(id);
    client.request(format!("{base}/unwatched")).await.unwrap();

    let mut events = events.lock().unwrap().clone();
    events.dedup();
    assert_eq!(
        events,
        [
            "request /watched",
            "socket /watched",
            "headers /watched",
            "body /watched",
            "response /watched",
        ]
    );
}

// ===== Blocking =====

fn serve_blocking(stream: std::net::TcpStream) {
    use std::io::BufRead;

    let mut reader = std::io::BufReader::new(stream.try_clone().unwrap());
    let mut stream = stream;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).unwrap_or(0) == 0 {
            return;
        }
        let path = line.split(' ').nth(1).unwrap_or_default().to_owned();
        loop {
            let mut header = String::new();
            if reader.read_line(&mut header).unwrap_or(0) == 0 {
                return;
            }
            if header.trim_end().is_empty() {
                break;
            }
        }
        if stream.write_all(ok(&path).as_bytes()).is_err() {
            return;
        }
    }
}

#[test]
fn blocking_client() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { return };
            std::thread::spawn(move || serve_blocking(stream));
        }
    });

    let client = ferry::blocking::Client::new(options()).unwrap();
    let response = client.request(format!("http://{addr}/single")).unwrap();
    assert_eq!(response.into_body().into_text().unwrap(), "/single");

    let mut results = Vec::new();
    client.request_multi((0..4).map(|i| format!("http://{addr}/{i}")), |index, result| {
        results.push((index, result.unwrap().into_body().into_text().unwrap()));
    });
    results.sort();
    assert_eq!(
        results,
        (0..4).map(|i| (i, format!("/{i}"))).collect::<Vec<_>>()
    );
}
