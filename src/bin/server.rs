use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use tracing::error;

use rawcap::device::V4l2Device;
use rawcap::net::Server;
use rawcap::{logging, Config, Direction, Session};

#[derive(Parser)]
#[command(name = "rawcap-server", version)]
#[command(about = "Serve raw sensor frames to a single TCP client")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Capture buffers to allocate
    #[arg(short, long)]
    buffers: Option<u32>,

    /// Buffers kept queued ahead of the one being read
    #[arg(short, long)]
    preload: Option<u32>,

    /// TCP port to listen on
    #[arg(long)]
    port: Option<u16>,

    /// Only use a device bound to this driver
    #[arg(short, long)]
    driver: Option<String>,

    /// Raise log verbosity, repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn run(args: Args) -> rawcap::Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(buffers) = args.buffers {
        config.capture.buffers = buffers;
    }
    if let Some(preload) = args.preload {
        config.capture.preload = preload;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.driver.is_some() {
        config.capture.driver = args.driver;
    }
    config.validate()?;

    let mut session = Session::open(
        V4l2Device::enumerate(),
        &config.capture.selector(),
        Direction::Capture,
    )?;
    session.set_buffering(config.capture.buffers, config.capture.preload)?;
    session.set_dequeue_timeout(config.capture.dequeue_timeout());

    let mut server = Server::bind((config.server.bind.as_str(), config.server.port), session)?
        .with_writer(config.transfer.writer());
    server.run()
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
