//! Fetch every URI given as argument concurrently.
//!
//! ```sh
//! RUST_LOG=ferry=debug cargo run -p example -- http://example.com/ https://example.org/
//! ```
use ferry::{Client, Event, Options, Request};

#[tokio::main]
async fn main() {
    env_logger::init();

    let uris: Vec<String> = std::env::args().skip(1).collect();
    if uris.is_empty() {
        eprintln!("usage: example <uri>...");
        return;
    }

    let client = Client::new(Options::default());
    if let Err(err) = client.set_all_options([("max-connections-per-host", 4), ("transfer-timeout", 10)]) {
        eprintln!("{err}");
        return;
    }

    client.observe(|req: &Request, event: &Event<'_>| match event {
        Event::Socket { authority, reused } => {
            println!("* {} on {authority} (reused: {reused})", req.uri());
        }
        Event::Redirect { response, location } => {
            println!("* {} {} -> {location}", req.uri(), response.status());
        }
        _ => {}
    });

    let futures: Vec<_> = uris.iter().map(|uri| client.submit(uri)).collect();
    for (uri, future) in uris.iter().zip(futures) {
        match future.await {
            Ok(res) => {
                println!("> {uri}");
                println!("< {} {} {}", res.version(), res.status(), res.reason());
                for (name, value) in res.headers() {
                    println!("< {name}: {value:?}");
                }
                match res.into_body().into_bytes() {
                    Ok(body) => println!("< {} bytes\n", body.len()),
                    Err(err) => eprintln!("! failed to read body: {err}\n"),
                }
            }
            Err(err) => eprintln!("! {uri}: {err}\n"),
        }
    }
}
