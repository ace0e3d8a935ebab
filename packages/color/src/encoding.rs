//! Color encodings and legends.

use std::collections::BTreeMap;

use ais_map_vessel_models::{EnrichedReport, NumericAttribute};
use serde::Serialize;

use crate::palette::{BLUE, NEUTRAL_GRAY, Rgb, jet, tab20};

/// Number of samples in a gradient legend.
pub const GRADIENT_SAMPLES: usize = 50;

/// Errors building a [`ColorEncoding`] from loose inputs.
#[derive(Debug, thiserror::Error)]
pub enum ColorError {
    /// Both a numeric attribute and a category list were given.
    #[error("Choose either a numeric attribute or ship type categories, not both")]
    Ambiguous,

    /// The attribute has no color ramp.
    #[error("No color ramp for attribute: {name}")]
    UnsupportedAttribute {
        /// The attribute as given.
        name: String,
    },
}

/// Power-law normalization onto `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PowerNorm {
    /// Exponent applied after linear scaling.
    pub gamma: f64,
    /// Value mapped to 0.
    pub vmin: f64,
    /// Value mapped to 1.
    pub vmax: f64,
}

impl PowerNorm {
    /// Creates a normalization.
    #[must_use]
    pub const fn new(gamma: f64, vmin: f64, vmax: f64) -> Self {
        Self { gamma, vmin, vmax }
    }

    /// Normalizes `value`; missing values count as 0 and results are
    /// clamped to `[0, 1]`.
    #[must_use]
    pub fn apply(&self, value: Option<f64>) -> f64 {
        let value = value.filter(|v| v.is_finite()).unwrap_or(0.0);
        let span = self.vmax - self.vmin;
        if span <= 0.0 {
            return 0.0;
        }
        ((value - self.vmin).max(0.0) / span)
            .powf(self.gamma)
            .clamp(0.0, 1.0)
    }
}

/// How rows are colored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColorEncoding {
    /// A single color.
    None {
        /// The color of every row.
        color: Rgb,
    },
    /// A numeric attribute through the `jet` ramp.
    Continuous {
        /// Attribute read from each row.
        attribute: NumericAttribute,
        /// Normalization applied before the ramp.
        norm: PowerNorm,
        /// Legend title.
        title: String,
        /// Lower legend bound.
        legend_min: f64,
        /// Upper legend bound.
        legend_max: f64,
    },
    /// Charted ship types through the `tab20` palette.
    Categorical {
        /// Labels in palette order.
        labels: Vec<String>,
    },
}

impl Default for ColorEncoding {
    fn default() -> Self {
        Self::None { color: BLUE }
    }
}

/// Legend content for a renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Legend {
    /// Nothing to explain.
    None,
    /// A color bar with numeric endpoints.
    Gradient {
        /// Title.
        title: String,
        /// Value at the left end.
        min: f64,
        /// Value at the right end.
        max: f64,
        /// Evenly spaced samples from `min` to `max`.
        colors: Vec<Rgb>,
    },
    /// One swatch per label.
    Swatches {
        /// Title.
        title: String,
        /// Label and color pairs in palette order.
        entries: Vec<(String, Rgb)>,
    },
}

impl ColorEncoding {
    /// Speed over ground, 0 to 25 knots.
    #[must_use]
    pub fn speed() -> Self {
        Self::Continuous {
            attribute: NumericAttribute::Sog,
            norm: PowerNorm::new(0.8, 0.0, 25.0),
            title: "Speed (kn)".to_string(),
            legend_min: 0.0,
            legend_max: 25.0,
        }
    }

    /// Draft, 0 to 26 metres (legend shows 0 to 25).
    #[must_use]
    pub fn draft() -> Self {
        Self::Continuous {
            attribute: NumericAttribute::Draft,
            norm: PowerNorm::new(0.6, 0.0, 26.0),
            title: "Draft (m)".to_string(),
            legend_min: 0.0,
            legend_max: 25.0,
        }
    }

    /// Charted ship types, colored in the order given.
    #[must_use]
    pub const fn by_type(labels: Vec<String>) -> Self {
        Self::Categorical { labels }
    }

    /// Builds an encoding from an optional attribute name and an optional
    /// category list. Neither gives the default single color.
    ///
    /// # Errors
    ///
    /// * [`ColorError::Ambiguous`] if both are given.
    /// * [`ColorError::UnsupportedAttribute`] if the attribute has no ramp.
    pub fn from_parts(
        attribute: Option<&str>,
        categories: Option<Vec<String>>,
    ) -> Result<Self, ColorError> {
        match (attribute, categories) {
            (Some(_), Some(_)) => Err(ColorError::Ambiguous),
            (None, Some(labels)) => Ok(Self::by_type(labels)),
            (None, None) => Ok(Self::default()),
            (Some(name), None) => {
                let unsupported = || ColorError::UnsupportedAttribute {
                    name: name.to_string(),
                };
                match name.parse::<NumericAttribute>().map_err(|_| unsupported())? {
                    NumericAttribute::Sog => Ok(Self::speed()),
                    NumericAttribute::Draft => Ok(Self::draft()),
                    NumericAttribute::Cog | NumericAttribute::Length | NumericAttribute::Width => {
                        Err(unsupported())
                    }
                }
            }
        }
    }

    /// The color of one row.
    ///
    /// Categorical encodings key on the charted type; a label outside the
    /// list is gray.
    #[must_use]
    pub fn color_of(&self, row: &EnrichedReport) -> Rgb {
        match self {
            Self::None { color } => *color,
            Self::Continuous {
                attribute, norm, ..
            } => jet(norm.apply(row.numeric(*attribute))),
            Self::Categorical { labels } => labels
                .iter()
                .position(|label| *label == row.chart_type)
                .map_or(NEUTRAL_GRAY, tab20),
        }
    }

    /// The legend of this encoding.
    #[must_use]
    pub fn legend(&self) -> Legend {
        match self {
            Self::None { .. } => Legend::None,
            Self::Continuous {
                norm,
                title,
                legend_min,
                legend_max,
                ..
            } => {
                #[allow(clippy::cast_precision_loss)]
                let step = (legend_max - legend_min) / (GRADIENT_SAMPLES - 1) as f64;
                let colors = (0..GRADIENT_SAMPLES)
                    .map(|i| {
                        #[allow(clippy::cast_precision_loss)]
                        let value = step.mul_add(i as f64, *legend_min);
                        jet(norm.apply(Some(value)))
                    })
                    .collect();
                Legend::Gradient {
                    title: title.clone(),
                    min: *legend_min,
                    max: *legend_max,
                    colors,
                }
            }
            Self::Categorical { labels } => Legend::Swatches {
                title: "Ship type".to_string(),
                entries: labels
                    .iter()
                    .enumerate()
                    .map(|(i, label)| (label.clone(), tab20(i)))
                    .collect(),
            },
        }
    }

    /// Colors every row and builds the legend.
    #[must_use]
    pub fn encode(&self, rows: &[EnrichedReport]) -> (Vec<Rgb>, Legend) {
        let colors: Vec<Rgb> = rows.iter().map(|row| self.color_of(row)).collect();

        if let Self::Categorical { labels } = self {
            let mut unlisted: BTreeMap<&str, usize> = BTreeMap::new();
            for row in rows {
                if !labels.contains(&row.chart_type) {
                    *unlisted.entry(row.chart_type.as_str()).or_default() += 1;
                }
            }
            if !unlisted.is_empty() {
                log::debug!("Rows with types outside the legend: {unlisted:?}");
            }
        }

        (colors, self.legend())
    }
}

#[cfg(test)]
mod tests {
    use ais_map_vessel_models::{Mmsi, Report};
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::palette::TAB20;

    fn row(sog: Option<f64>, chart_type: &str) -> EnrichedReport {
        let mut r = EnrichedReport::join(
            Report {
                mmsi: Mmsi::new(227_000_001),
                latitude: 43.5,
                longitude: 7.5,
                cog: None,
                sog,
                timestamp: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
            },
            None,
        );
        r.chart_type = chart_type.to_string();
        r
    }

    #[test]
    fn power_norm_clamps_and_defaults_missing_to_zero() {
        let norm = PowerNorm::new(0.8, 0.0, 25.0);
        assert!(norm.apply(None).abs() < f64::EPSILON);
        assert!((norm.apply(Some(25.0)) - 1.0).abs() < f64::EPSILON);
        assert!((norm.apply(Some(40.0)) - 1.0).abs() < f64::EPSILON);
        assert!(norm.apply(Some(-4.0)).abs() < f64::EPSILON);
        assert!((norm.apply(Some(12.5)) - 0.5f64.powf(0.8)).abs() < 1e-12);
    }

    #[test]
    fn speed_ramp_runs_blue_to_red() {
        let encoding = ColorEncoding::speed();
        let slow = encoding.color_of(&row(Some(0.0), "Cargo"));
        let fast = encoding.color_of(&row(Some(30.0), "Cargo"));
        let missing = encoding.color_of(&row(None, "Cargo"));
        assert_eq!(slow, jet(0.0));
        assert_eq!(fast, jet(1.0));
        assert_eq!(missing, slow);
    }

    #[test]
    fn gradient_legend_has_fifty_samples() {
        let Legend::Gradient {
            colors, min, max, ..
        } = ColorEncoding::draft().legend()
        else {
            panic!("expected a gradient legend");
        };
        assert_eq!(colors.len(), GRADIENT_SAMPLES);
        assert!(min.abs() < f64::EPSILON);
        assert!((max - 25.0).abs() < f64::EPSILON);
        assert_eq!(colors[0], jet(0.0));
    }

    #[test]
    fn categorical_colors_match_legend() {
        let encoding = ColorEncoding::by_type(vec!["Cargo".to_string(), "Other".to_string()]);
        let rows = vec![row(None, "Other"), row(None, "Cargo"), row(None, "Tanker")];
        let (colors, legend) = encoding.encode(&rows);

        assert_eq!(colors, vec![TAB20[1], TAB20[0], NEUTRAL_GRAY]);
        assert_eq!(
            legend,
            Legend::Swatches {
                title: "Ship type".to_string(),
                entries: vec![("Cargo".to_string(), TAB20[0]), ("Other".to_string(), TAB20[1])],
            }
        );
    }

    #[test]
    fn labels_past_palette_reuse_last_color() {
        let labels: Vec<String> = (0..25).map(|i| format!("T{i}")).collect();
        let encoding = ColorEncoding::by_type(labels);
        assert_eq!(encoding.color_of(&row(None, "T22")), TAB20[19]);
    }

    #[test]
    fn from_parts_rejects_both_inputs() {
        assert!(matches!(
            ColorEncoding::from_parts(Some("sog"), Some(vec!["Cargo".to_string()])),
            Err(ColorError::Ambiguous)
        ));
        assert_eq!(ColorEncoding::from_parts(None, None).unwrap(), ColorEncoding::default());
        assert_eq!(
            ColorEncoding::from_parts(Some("SOG"), None).unwrap(),
            ColorEncoding::speed()
        );
        assert!(matches!(
            ColorEncoding::from_parts(Some("cog"), None),
            Err(ColorError::UnsupportedAttribute { .. })
        ));
    }

    #[test]
    fn none_is_blue() {
        let (colors, legend) = ColorEncoding::default().encode(&[row(Some(3.0), "Cargo")]);
        assert_eq!(colors, vec![BLUE]);
        assert_eq!(legend, Legend::None);
    }
}
