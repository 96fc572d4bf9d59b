use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser};
use tracing::{error, info};

use rawcap::device::V4l2Device;
use rawcap::{logging, Config, Direction, FormatSpec, Modules, Session};

#[derive(Parser)]
#[command(name = "rawcap-isp-params", version)]
#[command(about = "Push one parameter block to the ISP")]
struct Args {
    /// TOML configuration file, its [params] section is used
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Turn on the Bayer noise filter
    #[arg(long)]
    enable_bdnf: bool,

    /// Raise log verbosity, repeat for more
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn run(args: Args) -> rawcap::Result<()> {
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let mut params = config.params;
    if args.enable_bdnf {
        params.block.modules |= Modules::BDNF;
    }

    let mut session = Session::open(
        V4l2Device::enumerate(),
        &params.selector(),
        Direction::ParamsOutput,
    )?;
    session.set_buffer_count(params.buffers)?;
    session.configure(FormatSpec::params(params.dataformat))?;
    session.setup()?;
    session.start()?;

    session.prepare_params(&params.block)?;
    session.cycle()?;
    session.advance()?;
    info!("applied modules {}", params.block.modules);

    session.stop()?;
    session.teardown()?;
    session.close()
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
