// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Demonstrates memoizing a slow, blocking fetch.
//!
//! The list of URLs contains every URL twice. Fetched sequentially, the second round is served
//! from the cache instantly. Fetched concurrently, duplicate requests wait for the first one and
//! the fetch runs once per URL either way.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use memoflight::Memo;

const URLS: [&str; 8] = [
    "https://golang.org",
    "https://godoc.org",
    "https://play.golang.org",
    "http://gopl.io",
    "https://golang.org",
    "https://godoc.org",
    "https://play.golang.org",
    "http://gopl.io",
];

/// Stands in for an HTTP GET returning the response body.
fn fetch_body(url: &str) -> Result<Vec<u8>, String> {
    std::thread::sleep(Duration::from_millis(200));
    if url.starts_with("https://") {
        Ok(url.repeat(100).into_bytes())
    } else {
        Err(format!("{url}: insecure scheme"))
    }
}

fn fetching_memo(fetches: &Arc<AtomicUsize>) -> Memo<String, Vec<u8>, String> {
    let fetches = Arc::clone(fetches);
    Memo::builder_blocking(move |url: String| {
        fetches.fetch_add(1, Ordering::SeqCst);
        fetch_body(&url)
    })
    .name("bodies")
    .build()
}

async fn sequential() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let memo = fetching_memo(&fetches);

    for url in URLS {
        let start = Instant::now();
        match memo.get(url.to_string()).await {
            Ok(body) => println!("  {url}, {:?}, {} bytes", start.elapsed(), body.len()),
            Err(e) => println!("  {url}, {:?}, {e}", start.elapsed()),
        }
    }

    println!("Sequential: {} fetches for {} requests\n", fetches.load(Ordering::SeqCst), URLS.len());
}

async fn concurrent() {
    let fetches = Arc::new(AtomicUsize::new(0));
    let memo = fetching_memo(&fetches);

    let handles: Vec<_> = URLS
        .into_iter()
        .map(|url| {
            let memo = memo.clone();
            tokio::spawn(async move {
                let start = Instant::now();
                match memo.get(url.to_string()).await {
                    Ok(body) => println!("  {url}, {:?}, {} bytes", start.elapsed(), body.len()),
                    Err(e) => println!("  {url}, {:?}, {e}", start.elapsed()),
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.expect("Task panicked");
    }

    println!("Concurrent: {} fetches for {} requests", fetches.load(Ordering::SeqCst), URLS.len());
}

#[tokio::main]
async fn main() {
    println!("Fetching sequentially...");
    sequential().await;

    println!("Fetching concurrently...");
    concurrent().await;
}
