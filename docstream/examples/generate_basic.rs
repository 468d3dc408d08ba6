//! Minimal generation example.
//!
//! Points at a locally running service unless `DOCSTREAM_BASE_URL` says
//! otherwise; attaches a bearer token when `DOCSTREAM_API_TOKEN` is set.
//!
//! ```bash
//! DOCSTREAM_BASE_URL=http://localhost:3001 cargo run --example generate_basic
//! ```

#![allow(clippy::print_stdout)]

use docstream::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base_url = std::env::var("DOCSTREAM_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:3001".to_string());

    let generator = Client::builder()
        .base_url(base_url)
        .token_provider(EnvToken::new("DOCSTREAM_API_TOKEN"))
        .build()
        .generator();

    let request = GenerationRequest::new(
        "function add(a, b) {\n  return a + b;\n}\n",
        DocType::Readme,
        "add.js",
    )
    .with_language("javascript");

    let result = generator.generate(request).await?;
    println!("{}", result.documentation);
    if let Some(score) = result.quality_score {
        println!("\nquality: {score}");
    }

    Ok(())
}
