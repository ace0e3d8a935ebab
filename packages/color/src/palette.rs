//! Colors, the `jet` ramp and the `tab20` palette.

use std::fmt;

use serde::{Serialize, Serializer};

/// An 8-bit sRGB color, displayed as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
}

impl Rgb {
    /// Creates a color from 8-bit channels.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Creates a color from `0xRRGGBB`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
        }
    }

    /// Creates a color from unit-interval channels, clamped and rounded.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_unit(r: f64, g: f64, b: f64) -> Self {
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(channel(r), channel(g), channel(b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Default color when no encoding is chosen.
pub const BLUE: Rgb = Rgb::from_hex(0x00_00_ff);

/// Color of labels missing from a categorical encoding.
pub const NEUTRAL_GRAY: Rgb = Rgb::from_hex(0x88_88_88);

/// The 20 qualitative colors of `tab20`, in order.
pub const TAB20: [Rgb; 20] = [
    Rgb::from_hex(0x1f_77_b4),
    Rgb::from_hex(0xae_c7_e8),
    Rgb::from_hex(0xff_7f_0e),
    Rgb::from_hex(0xff_bb_78),
    Rgb::from_hex(0x2c_a0_2c),
    Rgb::from_hex(0x98_df_8a),
    Rgb::from_hex(0xd6_27_28),
    Rgb::from_hex(0xff_98_96),
    Rgb::from_hex(0x94_67_bd),
    Rgb::from_hex(0xc5_b0_d5),
    Rgb::from_hex(0x8c_56_4b),
    Rgb::from_hex(0xc4_9c_94),
    Rgb::from_hex(0xe3_77_c2),
    Rgb::from_hex(0xf7_b6_d2),
    Rgb::from_hex(0x7f_7f_7f),
    Rgb::from_hex(0xc7_c7_c7),
    Rgb::from_hex(0xbc_bd_22),
    Rgb::from_hex(0xdb_db_8d),
    Rgb::from_hex(0x17_be_cf),
    Rgb::from_hex(0x9e_da_e5),
];

/// The `tab20` color at `index`; indices past the end get the last color.
#[must_use]
pub fn tab20(index: usize) -> Rgb {
    TAB20[index.min(TAB20.len() - 1)]
}

/// Number of entries of the sampled `jet` lookup table.
pub const JET_LUT_SIZE: usize = 256;

type Segments = &'static [(f64, f64)];

const JET_RED: Segments = &[(0.0, 0.0), (0.35, 0.0), (0.66, 1.0), (0.89, 1.0), (1.0, 0.5)];
const JET_GREEN: Segments = &[
    (0.0, 0.0),
    (0.125, 0.0),
    (0.375, 1.0),
    (0.64, 1.0),
    (0.91, 0.0),
    (1.0, 0.0),
];
const JET_BLUE: Segments = &[(0.0, 0.5), (0.11, 1.0), (0.34, 1.0), (0.65, 0.0), (1.0, 0.0)];

fn interpolate(segments: Segments, x: f64) -> f64 {
    segments
        .windows(2)
        .find(|w| x <= w[1].0)
        .map_or_else(
            || segments.last().map_or(0.0, |s| s.1),
            |w| {
                let (x0, y0) = w[0];
                let (x1, y1) = w[1];
                if x1 <= x0 {
                    y1
                } else {
                    (y1 - y0).mul_add((x - x0) / (x1 - x0), y0)
                }
            },
        )
}

/// The `jet` ramp at `x` in `[0, 1]` (clamped).
///
/// Sampled through a 256-entry lookup table so neighbouring values share a
/// color the way plotting libraries render them.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn jet(x: f64) -> Rgb {
    let x = if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) };
    let index = ((x * JET_LUT_SIZE as f64) as usize).min(JET_LUT_SIZE - 1);
    let t = index as f64 / (JET_LUT_SIZE - 1) as f64;

    Rgb::from_unit(
        interpolate(JET_RED, t),
        interpolate(JET_GREEN, t),
        interpolate(JET_BLUE, t),
    )
}
