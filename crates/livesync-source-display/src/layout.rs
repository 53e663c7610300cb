//! Display layout and its parser for `xrandr --query` output.

use std::hash::{DefaultHasher, Hash, Hasher};

use serde::Serialize;

use crate::error::DisplayError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// No active display.
    #[default]
    None,
    /// A single built-in panel.
    Internal,
    /// A single external display.
    External,
    /// Several displays mirroring one region.
    Clone,
    /// Several displays side by side.
    Extend,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    #[default]
    Normal,
    Left,
    Inverted,
    Right,
}

impl Rotation {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "normal" => Some(Self::Normal),
            "left" => Some(Self::Left),
            "inverted" => Some(Self::Inverted),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// One active display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct DisplayInfo {
    pub name: String,
    /// 1-based position in enumeration order.
    pub number: u32,
    pub adapter: String,
    pub is_primary: bool,
    /// Rounded to whole Hz; 0 when unknown.
    pub refresh_rate: u32,
    pub resolution: Size,
    pub position: Point,
    pub rotation: Rotation,
}

impl DisplayInfo {
    pub fn is_internal(&self) -> bool {
        let name = self.name.to_ascii_lowercase();
        ["edp", "lvds", "dsi"].iter().any(|p| name.starts_with(p))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct DisplayLayout {
    pub topology: Topology,
    pub displays: Vec<DisplayInfo>,
}

impl DisplayLayout {
    pub fn new(displays: Vec<DisplayInfo>) -> Self {
        Self {
            topology: classify(&displays),
            displays,
        }
    }

    /// Stable digest of the layout; equal layouts digest equally.
    pub fn digest(&self) -> String {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}

fn classify(displays: &[DisplayInfo]) -> Topology {
    match displays {
        [] => Topology::None,
        [only] if only.is_internal() => Topology::Internal,
        [_] => Topology::External,
        [first, rest @ ..] => {
            let mirrored = rest
                .iter()
                .all(|d| d.position == first.position && d.resolution == first.resolution);
            if mirrored {
                Topology::Clone
            } else {
                Topology::Extend
            }
        }
    }
}

/// Parse `xrandr --query`. Connected outputs without a geometry are off and
/// skipped.
pub fn parse_xrandr(output: &str) -> Result<DisplayLayout, DisplayError> {
    let mut displays: Vec<DisplayInfo> = Vec::new();
    let mut adapter = String::from("screen 0");
    // Whether mode lines currently belong to an active output.
    let mut in_active = false;

    for (i, line) in output.lines().enumerate() {
        let line_num = i + 1;
        if line.trim().is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("Screen ") {
            let number = rest.split(':').next().unwrap_or("0").trim();
            adapter = format!("screen {number}");
            in_active = false;
            continue;
        }
        if line.starts_with(char::is_whitespace) {
            if in_active {
                if let (Some(rate), Some(display)) = (current_rate(line), displays.last_mut()) {
                    display.refresh_rate = rate;
                }
            }
            continue;
        }

        in_active = false;
        let mut tokens = line.split_whitespace();
        let name = tokens.next().ok_or_else(|| DisplayError::Parse {
            line_num,
            detail: "empty output line".into(),
        })?;
        match tokens.next() {
            Some("connected") => {}
            Some("disconnected") | Some("unknown") => continue,
            other => {
                return Err(DisplayError::Parse {
                    line_num,
                    detail: format!("unexpected connection state {other:?} for {name}"),
                });
            }
        }

        let mut is_primary = false;
        let mut geometry = None;
        let mut rotation = Rotation::Normal;
        for token in tokens.take_while(|t| !t.starts_with('(')) {
            if token == "primary" {
                is_primary = true;
            } else if let Some(r) = Rotation::parse(token) {
                rotation = r;
            } else if geometry.is_none() {
                geometry = parse_geometry(token);
            }
        }
        let Some((resolution, position)) = geometry else {
            continue;
        };

        in_active = true;
        displays.push(DisplayInfo {
            name: name.to_string(),
            number: u32::try_from(displays.len() + 1).unwrap_or(u32::MAX),
            adapter: adapter.clone(),
            is_primary,
            refresh_rate: 0,
            resolution,
            position,
            rotation,
        });
    }

    Ok(DisplayLayout::new(displays))
}

/// `1920x1080+1920+0` → size and position.
fn parse_geometry(token: &str) -> Option<(Size, Point)> {
    let (size, offsets) = token.split_once('+')?;
    let (w, h) = size.split_once('x')?;
    let (x, y) = offsets.split_once('+')?;
    Some((
        Size {
            width: w.parse().ok()?,
            height: h.parse().ok()?,
        },
        Point {
            x: x.parse().ok()?,
            y: y.parse().ok()?,
        },
    ))
}

/// Rate marked `*` (current) on a mode line, rounded to whole Hz.
fn current_rate(line: &str) -> Option<u32> {
    line.split_whitespace()
        .skip(1)
        .find(|t| t.contains('*'))
        .and_then(|t| t.trim_end_matches(['*', '+']).parse::<f64>().ok())
        .map(|hz| hz.round() as u32)
}
