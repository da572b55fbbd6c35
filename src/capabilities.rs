//! Capability masks for geodesic queries.
//!
//! A mask says which coefficient series an engine must evaluate and which
//! output fields it must fill in. Every named output capability carries the
//! series bits it depends on, so composing masks with `|` never yields a
//! request whose outputs lack their prerequisites.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Mask: u32 {
        /// Series C1 (distance).
        const CAP_C1 = 1 << 0;
        /// Series C1' (distance as input).
        const CAP_C1P = 1 << 1;
        /// Series C2 (reduced length, geodesic scale).
        const CAP_C2 = 1 << 2;
        /// Series C3 (longitude).
        const CAP_C3 = 1 << 3;
        /// Series C4 (area).
        const CAP_C4 = 1 << 4;

        const NONE = 0;

        /// Latitude lat2.
        const LATITUDE = 1 << 7;
        /// Longitude lon2.
        const LONGITUDE = (1 << 8) | Self::CAP_C3.bits();
        /// Azimuths azi1 and azi2.
        const AZIMUTH = 1 << 9;
        /// Distance s12.
        const DISTANCE = (1 << 10) | Self::CAP_C1.bits();
        /// Allow s12 as the input of a direct problem or a line position query.
        const DISTANCE_IN = (1 << 11) | Self::CAP_C1.bits() | Self::CAP_C1P.bits();
        /// Reduced length m12.
        const REDUCED_LENGTH = (1 << 12) | Self::CAP_C1.bits() | Self::CAP_C2.bits();
        /// Geodesic scales M12 and M21.
        const GEODESIC_SCALE = (1 << 13) | Self::CAP_C1.bits() | Self::CAP_C2.bits();
        /// Area S12.
        const AREA = (1 << 14) | Self::CAP_C4.bits();
        /// Unroll lon2 instead of reducing it to [-180, 180].
        const LONG_UNROLL = 1 << 15;

        const STANDARD = Self::LATITUDE.bits()
            | Self::LONGITUDE.bits()
            | Self::AZIMUTH.bits()
            | Self::DISTANCE.bits();

        /// Every output and every series. `LONG_UNROLL` is not included.
        const ALL = Self::OUT_ALL_BITS | Self::SERIES_BITS;
    }
}

impl Mask {
    const SERIES_BITS: u32 = 0x1F;
    const OUT_ALL_BITS: u32 = 0x7F80;
    const OUT_MASK_BITS: u32 = 0xFF80;

    /// Output bits including the `LONG_UNROLL` modifier.
    pub const OUT_MASK: Mask = Mask::from_bits_retain(Self::OUT_MASK_BITS);

    /// Build a mask from a raw integer, dropping bits that name nothing.
    pub const fn from_raw(bits: u32) -> Mask {
        Mask::from_bits_truncate(bits)
    }

    /// The coefficient-series part of the mask.
    pub const fn series(self) -> Mask {
        Mask::from_bits_retain(self.bits() & Self::SERIES_BITS)
    }

    /// The output part of the mask, modifier included.
    pub const fn outputs(self) -> Mask {
        Mask::from_bits_retain(self.bits() & Self::OUT_MASK_BITS)
    }

    /// True when every output bit present also has its prerequisite series.
    pub fn is_consistent(self) -> bool {
        [
            Mask::LATITUDE,
            Mask::LONGITUDE,
            Mask::AZIMUTH,
            Mask::DISTANCE,
            Mask::DISTANCE_IN,
            Mask::REDUCED_LENGTH,
            Mask::GEODESIC_SCALE,
            Mask::AREA,
        ]
        .iter()
        .filter(|cap| self.intersects(cap.outputs()))
        .all(|cap| self.contains(cap.series()))
    }
}

impl Default for Mask {
    fn default() -> Self {
        Mask::STANDARD
    }
}
