//! Standalone mock registry for exercising the harness
//!
//! Binds an MLLP listener and applies the OHIE identifier-domain
//! rules against an in-memory patient store.

use clap::Parser;

use cr_harness::common::logging;
use cr_harness::mock::MockRegistry;

#[derive(Parser)]
#[command(name = "mock-registry", about = "In-memory Client Registry simulator")]
#[command(version, long_about = None)]
struct Cli {
    /// host:port to listen on
    #[arg(long, default_value = "127.0.0.1:2100")]
    listen: String,
}

#[tokio::main]
async fn main() {
    logging::init_cli();

    let cli = Cli::parse();

    let registry = match MockRegistry::bind(&cli.listen).await {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    match registry.local_addr() {
        Ok(addr) => println!("mock registry listening on {addr}"),
        Err(_) => println!("mock registry listening on {}", cli.listen),
    }

    if let Err(e) = registry.run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
