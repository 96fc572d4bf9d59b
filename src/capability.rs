use std::fmt;

use bitflags::bitflags;

use crate::v4l_sys::v4l2_capability;

bitflags! {
    /// Device capability flags, as reported by VIDIOC_QUERYCAP
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Flags: u32 {
        const VIDEO_CAPTURE         = 0x00000001;
        const VIDEO_OUTPUT          = 0x00000002;
        const VIDEO_CAPTURE_MPLANE  = 0x00001000;
        const VIDEO_OUTPUT_MPLANE   = 0x00002000;
        const VIDEO_M2M_MPLANE      = 0x00004000;
        const VIDEO_M2M             = 0x00008000;
        const META_CAPTURE          = 0x00800000;
        const READ_WRITE            = 0x01000000;
        const STREAMING             = 0x04000000;
        const META_OUTPUT           = 0x08000000;
        const DEVICE_CAPS           = 0x80000000;
    }
}

impl From<u32> for Flags {
    fn from(flags: u32) -> Self {
        Self::from_bits_retain(flags)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Device capabilities
pub struct Capabilities {
    /// Driver name, e.g. sun6i-csi for the Allwinner camera interface
    pub driver: String,
    /// Card name
    pub card: String,
    /// Bus name, e.g. platform:1cb0000.camera
    pub bus: String,
    /// Version number MAJOR.MINOR.PATCH
    pub version: (u8, u8, u8),

    /// Capabilities of the opened node
    pub flags: Flags,
}

impl Capabilities {
    pub fn can_capture(&self) -> bool {
        self.flags
            .intersects(Flags::VIDEO_CAPTURE | Flags::VIDEO_CAPTURE_MPLANE)
    }

    pub fn can_stream(&self) -> bool {
        self.flags.contains(Flags::STREAMING)
    }
}

fn c_string(raw: &[u8]) -> String {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

impl From<v4l2_capability> for Capabilities {
    fn from(cap: v4l2_capability) -> Self {
        // the device node may expose a subset of what the physical device can do
        let flags = if Flags::from(cap.capabilities).contains(Flags::DEVICE_CAPS) {
            Flags::from(cap.device_caps)
        } else {
            Flags::from(cap.capabilities)
        };

        Capabilities {
            driver: c_string(&cap.driver),
            card: c_string(&cap.card),
            bus: c_string(&cap.bus_info),
            version: (
                ((cap.version >> 16) & 0xff) as u8,
                ((cap.version >> 8) & 0xff) as u8,
                (cap.version & 0xff) as u8,
            ),
            flags,
        }
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Driver      : {}", self.driver)?;
        writeln!(f, "Card        : {}", self.card)?;
        writeln!(f, "Bus         : {}", self.bus)?;
        writeln!(
            f,
            "Version     : {}.{}.{}",
            self.version.0, self.version.1, self.version.2
        )?;
        writeln!(f, "Capabilites : {}", self.flags)?;
        Ok(())
    }
}
