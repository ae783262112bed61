mod emitter;
mod game;
mod input;
mod network;
mod reconciler;
mod scene;

use clap::Parser;
use log::{error, info};
use macroquad::prelude::{get_frame_time, next_frame, Conf};
use network::{Client, Connection};
use scene::WorldScene;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:3000")]
    server: String,
}

fn window_conf() -> Conf {
    Conf {
        window_title: String::from("worldsync"),
        window_width: 1280,
        window_height: 720,
        ..Default::default()
    }
}

// macroquad must own the main thread for its window context, so the tokio
// runtime is built by hand and only drives the socket tasks.
#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    let args = Args::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            return;
        }
    };

    info!("Connecting to {}", args.server);
    let connection = match runtime.block_on(Connection::connect(&args.server)) {
        Ok(connection) => connection,
        Err(e) => {
            error!("Failed to connect to {}: {}", args.server, e);
            return;
        }
    };

    info!("Controls: WASD to move, Shift to sprint, Space to jump");

    let mut client = Client::new(connection, WorldScene::new(), runtime.handle().clone());
    loop {
        if !client.frame(get_frame_time()) {
            break;
        }
        next_frame().await;
    }

    client.shutdown();
    // Give the writer task a moment to flush the goodbye.
    runtime.shutdown_timeout(Duration::from_millis(200));
}
