//===========================================================================//

/// Color depths a DIB icon payload can use.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum BmpDepth {
    One,
    Four,
    Eight,
    Sixteen,
    TwentyFour,
    ThirtyTwo,
}

impl BmpDepth {
    pub(crate) fn from_bits_per_pixel(
        bits_per_pixel: u16,
    ) -> Option<BmpDepth> {
        match bits_per_pixel {
            1 => Some(BmpDepth::One),
            4 => Some(BmpDepth::Four),
            8 => Some(BmpDepth::Eight),
            16 => Some(BmpDepth::Sixteen),
            24 => Some(BmpDepth::TwentyFour),
            32 => Some(BmpDepth::ThirtyTwo),
            _ => None,
        }
    }

    pub(crate) fn bits_per_pixel(&self) -> u16 {
        match *self {
            BmpDepth::One => 1,
            BmpDepth::Four => 4,
            BmpDepth::Eight => 8,
            BmpDepth::Sixteen => 16,
            BmpDepth::TwentyFour => 24,
            BmpDepth::ThirtyTwo => 32,
        }
    }

    /// Maximum number of color-table entries; zero for direct-color depths.
    pub(crate) fn palette_len(&self) -> usize {
        if self.is_indexed() {
            1 << self.bits_per_pixel()
        } else {
            0
        }
    }

    pub(crate) fn is_indexed(&self) -> bool {
        matches!(*self, BmpDepth::One | BmpDepth::Four | BmpDepth::Eight)
    }

    /// Bytes per row at this depth, padded to a 4-byte boundary.
    pub(crate) fn row_stride(&self, width: u32) -> usize {
        row_stride(width, self.bits_per_pixel())
    }
}

/// Bytes per DIB row, padded to a 4-byte boundary.  With `bits_per_pixel ==
/// 1` this is the AND-mask row size, `((width + 31) / 32) * 4`.
pub(crate) fn row_stride(width: u32, bits_per_pixel: u16) -> usize {
    ((width as usize * bits_per_pixel as usize + 31) / 32) * 4
}

//===========================================================================//


//===========================================================================//
