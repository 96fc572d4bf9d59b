//! One-frame acquisition on a started capture session

use tracing::debug;

use crate::device::Device;
use crate::error::{Error, Result};
use crate::format::Direction;
use crate::frame::RawFrame;
use crate::session::Session;

impl<D: Device> Session<D> {
    /// Runs one cycle, copies the completed buffer out and releases it back into the rotation
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rawcap::device::{Selector, V4l2Device};
    /// use rawcap::format::{Direction, FormatSpec, FourCC};
    /// use rawcap::session::Session;
    ///
    /// let mut session =
    ///     Session::open(V4l2Device::enumerate(), &Selector::any(), Direction::Capture)?;
    /// session.configure(FormatSpec::capture(2592, 1944, FourCC::SBGGR8))?;
    /// session.setup()?;
    /// session.start()?;
    /// let frame = session.capture()?;
    /// session.stop()?;
    /// # Ok::<(), rawcap::Error>(())
    /// ```
    pub fn capture(&mut self) -> Result<RawFrame> {
        if self.direction() != Direction::Capture {
            return Err(Error::InvalidState {
                op: "capture",
                state: "params output",
            });
        }

        self.cycle()?;
        let format = self.format().ok_or(Error::InvalidState {
            op: "capture",
            state: "not negotiated",
        })?;
        let frame = RawFrame::from_slot(
            self.ready_slot()?,
            format.width,
            format.height,
            format.fourcc,
        );
        self.advance()?;

        debug!(
            "captured {} bytes of {}x{} {}",
            frame.len(),
            frame.width,
            frame.height,
            frame.fourcc
        );
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::fake::FakeDevice;
    use crate::device::Selector;
    use crate::format::{FormatSpec, FourCC};

    #[test]
    fn test_frames_come_from_consecutive_slots() {
        let devices = vec![FakeDevice::camera()];
        let mut session = Session::open(devices, &Selector::any(), Direction::Capture).unwrap();
        session
            .configure(FormatSpec::capture(4, 2, FourCC::SBGGR8))
            .unwrap();
        session.setup().unwrap();
        session.start().unwrap();

        for expected in [1u8, 2, 3, 1] {
            let frame = session.capture().unwrap();
            assert_eq!(frame.len(), 4 * 2 * 2);
            assert!(frame.bytes.iter().all(|&b| b == expected));
            assert_eq!((frame.width, frame.height), (4, 2));
        }
    }
}
