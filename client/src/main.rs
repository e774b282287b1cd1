mod cache;
mod input;
mod network;
mod rendering;
mod sentinel;

use clap::Parser;
use log::info;
use macroquad::rand::gen_range;
use shared::FIELD_HALF_DEPTH;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Window width
    #[arg(short = 'w', long, default_value = "1050")]
    width: usize,

    /// Window height (no short flag to avoid conflict with --help)
    #[arg(long, default_value = "300")]
    height: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    info!("Controls: WASD to move, Escape to quit");

    let spawn_z = gen_range(-(FIELD_HALF_DEPTH - 10.0), FIELD_HALF_DEPTH - 10.0);

    let mut client =
        network::Client::new(&args.server, spawn_z, args.width, args.height).await?;

    client.run().await?;

    Ok(())
}
