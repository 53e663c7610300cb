//! Color quantization and swatch extraction for album art.
//!
//! `quantize` reduces an image to at most `max_colors` representative colors
//! by weighted median cut over a 5-bit-per-channel histogram. `ColorSwatch`
//! then picks six variations by scoring each color's HSL saturation and
//! lightness against per-variation targets.

use std::collections::HashMap;
use std::fmt;

use serde::{Serialize, Serializer};

pub const DEFAULT_MAX_COLORS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn channel(self, i: usize) -> u8 {
        match i {
            0 => self.r,
            1 => self.g,
            _ => self.b,
        }
    }

    /// (saturation, lightness), both in `0.0..=1.0`.
    pub fn saturation_lightness(self) -> (f64, f64) {
        let r = f64::from(self.r) / 255.0;
        let g = f64::from(self.g) / 255.0;
        let b = f64::from(self.b) / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let lightness = (max + min) / 2.0;
        let chroma = max - min;
        let saturation = if chroma == 0.0 {
            0.0
        } else {
            chroma / (1.0 - (2.0 * lightness - 1.0).abs())
        };
        (saturation.clamp(0.0, 1.0), lightness)
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

struct Bucket {
    colors: Vec<(Rgb, u32)>,
}

impl Bucket {
    fn population(&self) -> u64 {
        self.colors.iter().map(|&(_, n)| u64::from(n)).sum()
    }

    /// Widest channel and its range.
    fn widest(&self) -> (usize, u8) {
        (0..3)
            .map(|ch| {
                let (lo, hi) = self.colors.iter().fold((u8::MAX, u8::MIN), |(lo, hi), (c, _)| {
                    (lo.min(c.channel(ch)), hi.max(c.channel(ch)))
                });
                (ch, hi.saturating_sub(lo))
            })
            .max_by_key(|&(_, range)| range)
            .unwrap_or((0, 0))
    }

    fn split(mut self) -> (Bucket, Bucket) {
        let (ch, _) = self.widest();
        self.colors.sort_unstable_by_key(|(c, _)| c.channel(ch));
        let half = self.population() / 2;
        let mut running = 0u64;
        let mut at = self.colors.len() / 2;
        for (i, &(_, n)) in self.colors.iter().enumerate() {
            running += u64::from(n);
            if running >= half {
                at = i + 1;
                break;
            }
        }
        let at = at.clamp(1, self.colors.len() - 1);
        let upper = self.colors.split_off(at);
        (self, Bucket { colors: upper })
    }

    fn average(&self) -> Rgb {
        let total = self.population().max(1);
        let mut sum = [0u64; 3];
        for &(c, n) in &self.colors {
            for (ch, s) in sum.iter_mut().enumerate() {
                *s += u64::from(c.channel(ch)) * u64::from(n);
            }
        }
        let avg = |s: u64| u8::try_from(s / total).unwrap_or(u8::MAX);
        Rgb::new(avg(sum[0]), avg(sum[1]), avg(sum[2]))
    }
}

/// Reduce `pixels` to at most `max_colors` colors, most populous first.
pub fn quantize(pixels: &[Rgb], max_colors: usize) -> Vec<Rgb> {
    if pixels.is_empty() || max_colors == 0 {
        return Vec::new();
    }

    let mut histogram: HashMap<Rgb, u32> = HashMap::new();
    for p in pixels {
        // 5 bits per channel, re-expanded to the bucket center.
        let key = Rgb::new((p.r & 0xf8) | 0x04, (p.g & 0xf8) | 0x04, (p.b & 0xf8) | 0x04);
        *histogram.entry(key).or_insert(0) += 1;
    }

    let mut buckets = vec![Bucket {
        colors: histogram.into_iter().collect(),
    }];
    while buckets.len() < max_colors {
        let candidate = buckets
            .iter()
            .enumerate()
            .filter(|(_, b)| b.colors.len() > 1)
            .max_by_key(|(_, b)| (b.widest().1, b.population()))
            .map(|(i, _)| i);
        let Some(i) = candidate else { break };
        let (lo, hi) = buckets.swap_remove(i).split();
        buckets.push(lo);
        buckets.push(hi);
    }

    buckets.sort_by_key(|b| std::cmp::Reverse(b.population()));
    buckets.iter().map(Bucket::average).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variation {
    Vibrant,
    LightVibrant,
    DarkVibrant,
    Muted,
    LightMuted,
    DarkMuted,
}

const WEIGHT_SATURATION: f64 = 3.0;
const WEIGHT_LIGHTNESS: f64 = 5.0;

struct Target {
    saturation: (f64, f64, f64),
    lightness: (f64, f64, f64),
}

impl Variation {
    pub const ALL: [Variation; 6] = [
        Self::Vibrant,
        Self::LightVibrant,
        Self::DarkVibrant,
        Self::Muted,
        Self::LightMuted,
        Self::DarkMuted,
    ];

    /// (min, target, max) for saturation and lightness.
    fn target(self) -> Target {
        let vibrant = (0.35, 1.0, 1.0);
        let muted = (0.0, 0.3, 0.4);
        let normal = (0.3, 0.5, 0.7);
        let light = (0.55, 0.74, 1.0);
        let dark = (0.0, 0.26, 0.45);
        let (saturation, lightness) = match self {
            Self::Vibrant => (vibrant, normal),
            Self::LightVibrant => (vibrant, light),
            Self::DarkVibrant => (vibrant, dark),
            Self::Muted => (muted, normal),
            Self::LightMuted => (muted, light),
            Self::DarkMuted => (muted, dark),
        };
        Target {
            saturation,
            lightness,
        }
    }

    fn score(self, color: Rgb, ignore_limits: bool) -> f64 {
        let (s, l) = color.saturation_lightness();
        let t = self.target();
        let within = |v: f64, (lo, _, hi): (f64, f64, f64)| v >= lo && v <= hi;
        if !ignore_limits && !(within(s, t.saturation) && within(l, t.lightness)) {
            return 0.0;
        }
        WEIGHT_SATURATION / ((s - t.saturation.1).abs() + 1e-4)
            + WEIGHT_LIGHTNESS / ((l - t.lightness.1).abs() + 1e-4)
    }

    /// Best-scoring color, if any color qualifies.
    pub fn pick(self, colors: &[Rgb], ignore_limits: bool) -> Option<Rgb> {
        colors
            .iter()
            .map(|&c| (c, self.score(c, ignore_limits)))
            .filter(|&(_, score)| score > 0.0)
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(c, _)| c)
    }
}

/// Six color variations extracted from one image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColorSwatch {
    pub vibrant: Option<Rgb>,
    pub light_vibrant: Option<Rgb>,
    pub dark_vibrant: Option<Rgb>,
    pub muted: Option<Rgb>,
    pub light_muted: Option<Rgb>,
    pub dark_muted: Option<Rgb>,
}

impl ColorSwatch {
    /// Pick every variation from `colors`. With `ignore_limits`, a variation
    /// that has no color within its saturation/lightness range falls back to
    /// the closest color overall, so every slot is filled whenever `colors`
    /// is non-empty.
    pub fn from_colors(colors: &[Rgb], ignore_limits: bool) -> Self {
        let pick = |v: Variation| {
            v.pick(colors, false).or_else(|| {
                if ignore_limits {
                    v.pick(colors, true)
                } else {
                    None
                }
            })
        };
        Self {
            vibrant: pick(Variation::Vibrant),
            light_vibrant: pick(Variation::LightVibrant),
            dark_vibrant: pick(Variation::DarkVibrant),
            muted: pick(Variation::Muted),
            light_muted: pick(Variation::LightMuted),
            dark_muted: pick(Variation::DarkMuted),
        }
    }

    pub fn get(&self, variation: Variation) -> Option<Rgb> {
        match variation {
            Variation::Vibrant => self.vibrant,
            Variation::LightVibrant => self.light_vibrant,
            Variation::DarkVibrant => self.dark_vibrant,
            Variation::Muted => self.muted,
            Variation::LightMuted => self.light_muted,
            Variation::DarkMuted => self.dark_muted,
        }
    }

    pub fn is_empty(&self) -> bool {
        Variation::ALL.iter().all(|&v| self.get(v).is_none())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn rgb() -> impl Strategy<Value = Rgb> {
        (any::<u8>(), any::<u8>(), any::<u8>()).prop_map(|(r, g, b)| Rgb::new(r, g, b))
    }

    proptest! {
        #[test]
        fn quantize_never_exceeds_limit(
            pixels in proptest::collection::vec(rgb(), 1..500),
            max in 1usize..64,
        ) {
            let colors = quantize(&pixels, max);
            prop_assert!(!colors.is_empty());
            prop_assert!(colors.len() <= max);
        }

        #[test]
        fn ignore_limits_never_leaves_gaps(colors in proptest::collection::vec(rgb(), 1..20)) {
            let swatch = ColorSwatch::from_colors(&colors, true);
            for v in Variation::ALL {
                prop_assert!(swatch.get(v).is_some());
            }
        }
    }
}
