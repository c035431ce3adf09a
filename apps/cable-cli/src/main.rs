// The actual setup is in lib.rs for better testability

use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = cable_cli::Cli::parse();
    std::process::exit(cable_cli::run(cli).await);
}
