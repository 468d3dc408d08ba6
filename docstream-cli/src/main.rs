//! docstream CLI - streaming documentation generation for source files.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use docstream::{Client, DocType};
use docstream_cli::{BatchConfig, BatchRunner};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Documentation flavors the service can produce.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum DocTypeArg {
    /// Project README
    #[default]
    Readme,
    /// Inline JSDoc comments
    Jsdoc,
    /// API reference
    Api,
    /// Architecture overview
    Architecture,
}

impl From<DocTypeArg> for DocType {
    fn from(arg: DocTypeArg) -> Self {
        match arg {
            DocTypeArg::Readme => Self::Readme,
            DocTypeArg::Jsdoc => Self::Jsdoc,
            DocTypeArg::Api => Self::Api,
            DocTypeArg::Architecture => Self::Architecture,
        }
    }
}

/// docstream CLI - generate documentation from source files
#[derive(Parser, Debug)]
#[command(name = "docstream")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Source files to document
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Documentation flavor to produce
    #[arg(short = 't', long, value_enum, default_value_t = DocTypeArg::Readme)]
    doc_type: DocTypeArg,

    /// Override the language detected from the file extension
    #[arg(short, long)]
    language: Option<String>,

    /// Service endpoint
    #[arg(long, env = "DOCSTREAM_BASE_URL", default_value = docstream::DEFAULT_BASE_URL)]
    base_url: String,

    /// Bearer token for authenticated requests
    #[arg(long, env = "DOCSTREAM_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Write documents here instead of printing to stdout
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("docstream=debug,docstream_cli=debug")
    } else {
        EnvFilter::new("docstream=warn,docstream_cli=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut builder = Client::builder().base_url(args.base_url);
    if let Some(token) = args.token {
        builder = builder.token(token);
    }
    let generator = builder.build().generator();

    let config = BatchConfig {
        doc_type: args.doc_type.into(),
        language: args.language,
        out_dir: args.out_dir,
    };

    let report = BatchRunner::new(generator, config).run(&args.inputs).await;
    if report.failed > 0 {
        anyhow::bail!("{} of {} files failed", report.failed, report.total());
    }

    Ok(())
}
