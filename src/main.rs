use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = hopper::cli::Cli::parse();
    if let Err(e) = hopper::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
