//! Generation with live progress reporting.
//!
//! A second task subscribes to the session's state channel and prints how
//! much of the document has arrived, while the main task awaits the
//! result. Enable debug logs to also see per-event traces.
//!
//! ```bash
//! DOCSTREAM_BASE_URL=http://localhost:3001 cargo run --example generate_progress
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use docstream::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let base_url = std::env::var("DOCSTREAM_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:3001".to_string());
    let generator = Client::builder()
        .base_url(base_url)
        .token_provider(EnvToken::new("DOCSTREAM_API_TOKEN"))
        .build()
        .generator();

    let mut updates = generator.subscribe();
    let progress = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let (bytes, generating) = {
                let state = updates.borrow_and_update();
                (state.document.len(), state.generating)
            };
            eprintln!("[{bytes} bytes, generating={generating}]");
            if !generating {
                break;
            }
        }
    });

    let request = GenerationRequest::new(
        "def fib(n):\n    return n if n < 2 else fib(n - 1) + fib(n - 2)\n",
        DocType::Api,
        "fib.py",
    )
    .with_language("python");

    let result = generator.generate(request).await?;
    progress.await?;

    println!("{}", result.documentation);
    Ok(())
}
