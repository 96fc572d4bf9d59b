//! Raw sensor capture over V4L2
//!
//! A [`Session`] drives one device node through format negotiation, buffer allocation and a
//! pipelined queue/dequeue cycle. Capture sessions hand out [`RawFrame`]s which [`convert`]
//! turns into packed BGRA. Output sessions feed ISP parameter blocks from [`params`].
//! The [`net`] module serves frames to remote clients over the fragment protocol in
//! [`protocol`].
//!
//! ```no_run
//! use rawcap::device::{Selector, V4l2Device};
//! use rawcap::format::{Direction, FormatSpec, FourCC};
//! use rawcap::Session;
//!
//! let mut session = Session::open(V4l2Device::enumerate(), &Selector::any(), Direction::Capture)?;
//! session.configure(FormatSpec::capture(640, 480, FourCC::YUYV))?;
//! session.setup()?;
//! session.start()?;
//! let rgb = session.capture()?.convert()?;
//! session.stop()?;
//! # Ok::<(), rawcap::Error>(())
//! ```

pub use v4l2_sys as v4l_sys;

pub mod v4l2;

pub mod buffer;
pub mod capability;
pub use capability::Capabilities;

pub mod device;

pub mod error;
pub use error::{Error, ErrorKind, Result};

pub mod format;
pub use format::{Direction, Format, FormatSpec, FourCC, PixelFormat};

pub mod io;
pub mod memory;
pub mod poll;
pub mod timestamp;

pub mod session;
pub use session::{Session, State};

mod capture;

pub mod frame;
pub use frame::{RawFrame, RgbFrame};

pub mod convert;

pub mod params;
pub use params::{Modules, ParamsConfig};

pub mod protocol;

pub mod net;

pub mod config;
pub use config::Config;

pub mod logging;
