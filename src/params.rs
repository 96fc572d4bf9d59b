//! ISP parameter blocks for the metadata output channel

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::device::Device;
use crate::error::{Error, Result};
use crate::format::Direction;
use crate::session::Session;

bitflags! {
    /// Tuning modules the ISP applies
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Modules: u32 {
        const BAYER = 1 << 0;
        const BDNF  = 1 << 1;
    }
}

/// Parses `"BAYER | BDNF"` style lists
impl<'de> Deserialize<'de> for Modules {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        bitflags::parser::from_str::<Modules>(&s.to_ascii_uppercase())
            .map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Modules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        bitflags::parser::to_writer(self, f)
    }
}

/// Per-channel black level offsets and gains, gains in 1/256 steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Bayer {
    /// R, Gr, Gb, B
    pub offsets: [u16; 4],
    /// R, Gr, Gb, B
    pub gains: [u16; 4],
}

impl Default for Bayer {
    fn default() -> Self {
        Bayer {
            offsets: [32; 4],
            gains: [256; 4],
        }
    }
}

/// Bayer-domain noise filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Bdnf {
    pub in_dis_min: u8,
    pub in_dis_max: u8,
    pub coefficients_g: [u8; 7],
    pub coefficients_rb: [u8; 5],
}

impl Default for Bdnf {
    fn default() -> Self {
        Bdnf {
            in_dis_min: 8,
            in_dis_max: 16,
            coefficients_g: [15, 4, 1, 0, 0, 0, 0],
            coefficients_rb: [15, 4, 0, 0, 0],
        }
    }
}

/// Parameter block handed to the ISP
///
/// Encoded as the little-endian module mask followed by one fixed-size record per module, padded
/// to a multiple of four bytes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParamsConfig {
    pub modules: Modules,
    pub bayer: Bayer,
    pub bdnf: Bdnf,
}

impl Default for ParamsConfig {
    fn default() -> Self {
        ParamsConfig {
            modules: Modules::BAYER,
            bayer: Bayer::default(),
            bdnf: Bdnf::default(),
        }
    }
}

impl ParamsConfig {
    /// Size of the encoded block
    pub const SIZE: usize = 36;

    /// # Example
    ///
    /// ```
    /// use rawcap::params::{Modules, ParamsConfig};
    /// let mut config = ParamsConfig::default();
    /// config.modules |= Modules::BDNF;
    /// assert_eq!(&config.encode()[..4], &[3, 0, 0, 0]);
    /// ```
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        out.extend_from_slice(&self.modules.bits().to_le_bytes());
        for value in self.bayer.offsets.iter().chain(self.bayer.gains.iter()) {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out.push(self.bdnf.in_dis_min);
        out.push(self.bdnf.in_dis_max);
        out.extend_from_slice(&self.bdnf.coefficients_g);
        out.extend_from_slice(&self.bdnf.coefficients_rb);
        out.resize(Self::SIZE, 0);
        out
    }

    /// Writes the block into `buf`, zeroing the rest of it
    pub fn write_into(&self, buf: &mut [u8]) -> Result<()> {
        let encoded = self.encode();
        if encoded.len() > buf.len() {
            return Err(Error::invalid(format!(
                "parameter block of {} bytes does not fit a {} byte buffer",
                encoded.len(),
                buf.len()
            )));
        }
        let (head, tail) = buf.split_at_mut(encoded.len());
        head.copy_from_slice(&encoded);
        tail.fill(0);
        Ok(())
    }
}

impl<D: Device> Session<D> {
    /// Fills the buffer the next `cycle` hands to the ISP
    pub fn prepare_params(&mut self, config: &ParamsConfig) -> Result<()> {
        if self.direction() != Direction::ParamsOutput {
            return Err(Error::InvalidState {
                op: "prepare parameters",
                state: "capture",
            });
        }
        config.write_into(self.pending_mut()?)?;
        debug!("prepared parameter block with modules {}", config.modules);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::fake::FakeDevice;
    use crate::device::Selector;
    use crate::error::ErrorKind;

    #[test]
    fn test_default_block_layout() {
        let encoded = ParamsConfig::default().encode();
        assert_eq!(encoded.len(), ParamsConfig::SIZE);
        assert_eq!(&encoded[0..4], &[1, 0, 0, 0]);
        assert_eq!(&encoded[4..6], &32u16.to_le_bytes());
        assert_eq!(&encoded[12..14], &256u16.to_le_bytes());
        assert_eq!(&encoded[20..22], &[8, 16]);
        assert_eq!(&encoded[22..25], &[15, 4, 1]);
        assert_eq!(&encoded[29..31], &[15, 4]);
        assert_eq!(&encoded[34..], &[0, 0]);
    }

    #[test]
    fn test_write_into_rejects_small_buffers() {
        let mut small = [0u8; 8];
        let err = ParamsConfig::default().write_into(&mut small).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let mut large = [0xaa; 48];
        ParamsConfig::default().write_into(&mut large).unwrap();
        assert!(large[ParamsConfig::SIZE..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_modules_parse_from_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            modules: Modules,
        }
        let parsed: Wrapper = toml::from_str("modules = \"bayer | bdnf\"").unwrap();
        assert_eq!(parsed.modules, Modules::BAYER | Modules::BDNF);
    }

    #[test]
    fn test_prepare_fills_pending_buffer() {
        let mut session =
            Session::open(vec![FakeDevice::params()], &Selector::any(), Direction::ParamsOutput)
                .unwrap();
        session.configure_defaults().unwrap();
        session.setup().unwrap();
        session.start().unwrap();

        let mut config = ParamsConfig::default();
        config.modules |= Modules::BDNF;
        session.prepare_params(&config).unwrap();
        assert_eq!(&session.pending_mut().unwrap()[..4], &[3, 0, 0, 0]);

        session.cycle().unwrap();
        session.advance().unwrap();
        session.stop().unwrap();
        session.teardown().unwrap();
    }
}
