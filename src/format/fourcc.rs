use std::{fmt, str};

use serde::{Deserialize, Deserializer};

use crate::error::Error;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
/// Four character code representing a pixelformat
pub struct FourCC {
    pub repr: [u8; 4],
}

impl FourCC {
    pub const SBGGR8: FourCC = FourCC::new(b"BA81");
    pub const SGBRG8: FourCC = FourCC::new(b"GBRG");
    pub const SGRBG8: FourCC = FourCC::new(b"GRBG");
    pub const SRGGB8: FourCC = FourCC::new(b"RGGB");
    pub const SBGGR10: FourCC = FourCC::new(b"BG10");
    pub const SRGGB10: FourCC = FourCC::new(b"RG10");
    pub const NV12: FourCC = FourCC::new(b"NV12");
    pub const NV21: FourCC = FourCC::new(b"NV21");
    pub const YUYV: FourCC = FourCC::new(b"YUYV");
    pub const UYVY: FourCC = FourCC::new(b"UYVY");
    /// ISP parameter block metadata
    pub const S6IP: FourCC = FourCC::new(b"S6IP");

    /// Returns a pixelformat as four character code
    ///
    /// # Arguments
    ///
    /// * `repr` - Four characters as raw bytes
    ///
    /// # Example
    ///
    /// ```
    /// use rawcap::format::FourCC;
    /// let fourcc = FourCC::new(b"NV12");
    /// assert_eq!(fourcc, FourCC::NV12);
    /// ```
    pub const fn new(repr: &[u8; 4]) -> FourCC {
        FourCC { repr: *repr }
    }

    /// Returns the string representation of a four character code
    pub fn str(&self) -> Result<&str, str::Utf8Error> {
        str::from_utf8(&self.repr)
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.str() {
            Ok(s) => write!(f, "{}", s),
            Err(_) => write!(f, "0x{:08x}", u32::from(*self)),
        }
    }
}

impl From<u32> for FourCC {
    fn from(code: u32) -> Self {
        FourCC::new(&code.to_le_bytes())
    }
}

impl From<FourCC> for u32 {
    fn from(fourcc: FourCC) -> Self {
        Self::from_le_bytes(fourcc.repr)
    }
}

impl str::FromStr for FourCC {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let repr: [u8; 4] = s
            .as_bytes()
            .try_into()
            .map_err(|_| Error::invalid(format!("fourcc {:?} is not four bytes long", s)))?;
        Ok(FourCC { repr })
    }
}

impl<'de> Deserialize<'de> for FourCC {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
