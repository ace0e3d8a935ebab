#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Per-row colors and legends.
//!
//! A [`ColorEncoding`] is either a single color, a numeric attribute
//! normalized onto the `jet` ramp, or charted ship types mapped onto the
//! `tab20` palette.

pub mod encoding;
pub mod palette;

pub use encoding::{ColorEncoding, ColorError, Legend, PowerNorm};
pub use palette::Rgb;
