use clap::Parser;
use log::info;
use server::network::Server;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "3000")]
    port: u16,

    /// Seconds without qualifying movement before a player is evicted
    #[arg(short, long, default_value_t = shared::INACTIVITY_TIMEOUT_SECS)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    info!("Starting relay server on {}", addr);
    info!("Inactivity timeout: {}s", args.timeout);

    let server = Server::new(&addr, Duration::from_secs(args.timeout)).await?;
    server.run().await?;

    Ok(())
}
