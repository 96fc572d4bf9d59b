use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use tracing::{error, info};

use rawcap::net::Client;
use rawcap::protocol::{FrameRequest, DEFAULT_PORT};
use rawcap::{logging, PixelFormat};

#[derive(Clone, Copy, ValueEnum)]
enum Action {
    /// Capture one frame and save it
    Request,
    /// Keep the server streaming at the given geometry
    StreamStart,
    /// Stop server side streaming
    StreamStop,
}

#[derive(Parser)]
#[command(name = "rawcap-client", version)]
#[command(about = "Request raw frames from a rawcap server")]
struct Args {
    #[arg(value_enum)]
    action: Action,

    #[arg(short, long, default_value_t = 2592)]
    width: u32,

    #[arg(short = 'H', long, default_value_t = 1944)]
    height: u32,

    /// 8, 10 or a pixel format name such as nv12
    #[arg(short, long, default_value = "8")]
    format: PixelFormat,

    /// Server address
    #[arg(short, long, default_value = "127.0.0.1")]
    remote: String,

    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Where to write the converted frame
    #[arg(short, long, default_value = "frame.png")]
    output: PathBuf,

    /// Also write the raw bytes as received
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Milliseconds of silence that end a frame
    #[arg(long, default_value_t = 2000)]
    idle_timeout: u64,

    /// Raise log verbosity, repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn run(args: Args) -> rawcap::Result<()> {
    let mut client = Client::connect(&args.remote, args.port)?
        .with_idle_timeout(Duration::from_millis(args.idle_timeout));
    let request = FrameRequest::new(args.width, args.height, args.format.fourcc());

    match args.action {
        Action::Request => {
            let frame = client.capture(request)?;
            info!("received {} bytes", frame.len());
            if let Some(path) = &args.dump {
                fs::write(path, &frame.bytes)?;
            }
            frame.convert()?.save_png(&args.output)?;
            info!("saved {}", args.output.display());
        }
        Action::StreamStart => client.stream_start(request)?,
        Action::StreamStop => client.stream_stop()?,
    }
    Ok(())
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
