//! Physical paper sizing for paginated export.
//!
//! Scripts describe paper either as explicit width/height in a physical unit
//! or as a named standard format plus orientation. Everything is normalized
//! to points before printing. Width and height round up to the next whole
//! point and the border rounds down, so content is never clipped by
//! sub-point rounding and margins never overestimate the content area.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::engine::Size;

/// Reference DPI for the pixel unit. 72 on the reference platform.
pub const EXPORT_DPI: u32 = 72;

/// A physical measure as scripts supply it: a number with an optional unit
/// suffix (`mm`, `cm`, `in`, `px`). Bare numbers are pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Measure(pub String);

impl Measure {
    pub fn pixels(value: u32) -> Self {
        Measure(format!("{value}px"))
    }

    /// Convert to points via the unit table. Unparseable values convert
    /// to zero rather than erroring, matching the silent-absorb policy for
    /// garbage in optional structured configuration.
    pub fn to_points(&self) -> f64 {
        let px_factor = 72.0 / EXPORT_DPI as f64 / 2.54;
        let units: [(&str, f64); 4] = [
            ("mm", 72.0 / 25.4),
            ("cm", 72.0 / 2.54),
            ("in", 72.0),
            ("px", px_factor),
        ];
        let text = self.0.trim();
        for (unit, factor) in units {
            if let Some(number) = text.strip_suffix(unit) {
                return number.trim().parse::<f64>().unwrap_or(0.0) * factor;
            }
        }
        text.parse::<f64>().unwrap_or(0.0) * px_factor
    }
}

impl Serialize for Measure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Measure {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MeasureVisitor;

        impl<'de> Visitor<'de> for MeasureVisitor {
            type Value = Measure;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a measure string or a bare number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Measure, E> {
                Ok(Measure(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Measure, E> {
                Ok(Measure(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Measure, E> {
                Ok(Measure(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Measure, E> {
                Ok(Measure(v.to_string()))
            }
        }

        deserializer.deserialize_any(MeasureVisitor)
    }
}

/// Paper configuration as set by script.
///
/// Either `width`+`height` or `format` must be present for paginated export;
/// a config carrying neither is self-contradictory and export fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperConfig {
    pub width: Option<Measure>,
    pub height: Option<Measure>,
    pub format: Option<String>,
    pub orientation: Option<String>,
    pub border: Option<Measure>,
}

/// Resolved page geometry in points, handed to the engine's print service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width_pt: f64,
    pub height_pt: f64,
    pub margin_pt: f64,
    pub dpi: u32,
}

/// Built-in sizes for the named standard formats, portrait, in points.
const NAMED_FORMATS: [(&str, f64, f64); 6] = [
    ("A3", 842.0, 1191.0),
    ("A4", 595.0, 842.0),
    ("A5", 420.0, 595.0),
    ("Legal", 612.0, 1008.0),
    ("Letter", 612.0, 792.0),
    ("Tabloid", 792.0, 1224.0),
];

/// Resolve a paper configuration against the current content size.
///
/// No configuration at all derives one from the content: width/height equal
/// to the content pixel dimensions, zero border. Returns `None` only for a
/// present-but-contradictory configuration.
pub fn resolve(config: Option<&PaperConfig>, content: Size) -> Option<PageGeometry> {
    let derived;
    let config = match config {
        Some(config) => config,
        None => {
            derived = PaperConfig {
                width: Some(Measure::pixels(content.width)),
                height: Some(Measure::pixels(content.height)),
                border: Some(Measure::pixels(0)),
                ..Default::default()
            };
            &derived
        }
    };

    let (width_pt, height_pt) = match (&config.width, &config.height, &config.format) {
        (Some(width), Some(height), _) => {
            (width.to_points().ceil(), height.to_points().ceil())
        }
        (_, _, Some(format)) => {
            let landscape = config
                .orientation
                .as_deref()
                .map(|o| o.eq_ignore_ascii_case("landscape"))
                .unwrap_or(false);
            // A4 when the name is unrecognized.
            let (_, mut w, mut h) = NAMED_FORMATS
                .iter()
                .find(|(name, _, _)| name.eq_ignore_ascii_case(format))
                .copied()
                .unwrap_or(NAMED_FORMATS[1]);
            if landscape {
                std::mem::swap(&mut w, &mut h);
            }
            (w, h)
        }
        _ => return None,
    };

    let margin_pt = config
        .border
        .as_ref()
        .map(|b| b.to_points().floor())
        .unwrap_or(0.0);

    Some(PageGeometry {
        width_pt,
        height_pt,
        margin_pt,
        dpi: EXPORT_DPI,
    })
}
