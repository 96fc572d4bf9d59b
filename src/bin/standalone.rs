use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use tracing::{error, info};

use rawcap::device::{Selector, V4l2Device};
use rawcap::{logging, Direction, FormatSpec, PixelFormat, Session};

#[derive(Parser)]
#[command(name = "rawcap-standalone", version)]
#[command(about = "Capture and convert one frame from a local device")]
struct Args {
    #[arg(default_value_t = 2592)]
    width: u32,

    #[arg(default_value_t = 1944)]
    height: u32,

    /// 8, 10 or a pixel format name such as nv12
    #[arg(short, long, default_value = "8")]
    format: PixelFormat,

    /// Only use a device bound to this driver
    #[arg(short, long)]
    driver: Option<String>,

    #[arg(short, long, default_value_t = 3)]
    buffers: u32,

    #[arg(short, long, default_value = "frame.png")]
    output: PathBuf,

    /// Also write the raw bytes
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Raise log verbosity, repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn run(args: Args) -> rawcap::Result<()> {
    let selector = match args.driver {
        Some(driver) => Selector::driver(driver),
        None => Selector::any(),
    };
    let mut session = Session::open(V4l2Device::enumerate(), &selector, Direction::Capture)?;
    info!("using {}", session.capabilities().card);

    session.set_buffer_count(args.buffers)?;
    session.configure(FormatSpec::capture(
        args.width,
        args.height,
        args.format.fourcc(),
    ))?;
    session.setup()?;
    session.start()?;
    let frame = session.capture()?;
    session.stop()?;
    session.teardown()?;
    session.close()?;

    if let Some(path) = &args.dump {
        fs::write(path, &frame.bytes)?;
    }
    info!(
        "converting {}x{} {}",
        frame.width, frame.height, frame.fourcc
    );
    frame.convert()?.save_png(&args.output)?;
    info!("saved {}", args.output.display());
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
