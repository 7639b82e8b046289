use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::EngineError;

/// One device pixel, laid out as three bytes so frames cast straight to byte slices
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const RED: Rgb = Rgb::new(255, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    pub fn from_channels(channels: [u8; 3]) -> Self {
        Self::new(channels[0], channels[1], channels[2])
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = EngineError;

    /// Parse `#rrggbb`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| EngineError::invalid(format!("color {s:?} must start with '#'")))?;
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(EngineError::invalid(format!(
                "color {s:?} must have exactly six hex digits"
            )));
        }

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|_| EngineError::invalid(format!("color {s:?} is not valid hex")))
        };

        Ok(Rgb::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Physical wiring order of the device's color channels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Grb,
    Rbg,
    Brg,
    Bgr,
}

impl ChannelOrder {
    pub const ALL: [ChannelOrder; 5] = [
        ChannelOrder::Rgb,
        ChannelOrder::Grb,
        ChannelOrder::Rbg,
        ChannelOrder::Brg,
        ChannelOrder::Bgr,
    ];

    /// Source channel index feeding each output position
    pub fn source_indices(self) -> [usize; 3] {
        match self {
            ChannelOrder::Rgb => [0, 1, 2],
            ChannelOrder::Grb => [1, 0, 2],
            ChannelOrder::Rbg => [0, 2, 1],
            ChannelOrder::Brg => [2, 0, 1],
            ChannelOrder::Bgr => [2, 1, 0],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelOrder::Rgb => "rgb",
            ChannelOrder::Grb => "grb",
            ChannelOrder::Rbg => "rbg",
            ChannelOrder::Brg => "brg",
            ChannelOrder::Bgr => "bgr",
        }
    }
}

impl FromStr for ChannelOrder {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            // "regular" is what older control panels send for the identity order
            "rgb" | "regular" => Ok(ChannelOrder::Rgb),
            "grb" => Ok(ChannelOrder::Grb),
            "rbg" => Ok(ChannelOrder::Rbg),
            "brg" => Ok(ChannelOrder::Brg),
            "bgr" => Ok(ChannelOrder::Bgr),
            other => Err(EngineError::invalid(format!("unknown channel order {other:?}"))),
        }
    }
}

impl fmt::Display for ChannelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Color correction shared by every render loop
///
/// Factors stay inside [0, 1]; every constructor and setter clamps them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorProfile {
    factors: [f32; 3],
    channel_order: ChannelOrder,
}

impl ColorProfile {
    pub fn new(factors: [f32; 3], channel_order: ChannelOrder) -> Self {
        Self {
            factors: factors.map(clamp_factor),
            channel_order,
        }
    }

    pub fn factors(&self) -> [f32; 3] {
        self.factors
    }

    pub fn channel_order(&self) -> ChannelOrder {
        self.channel_order
    }

    pub fn with_factors(self, factors: [f32; 3]) -> Self {
        Self::new(factors, self.channel_order)
    }

    pub fn with_channel_order(self, channel_order: ChannelOrder) -> Self {
        Self { channel_order, ..self }
    }

    /// True when the transform leaves every pixel unchanged
    pub fn is_identity(&self) -> bool {
        self.channel_order == ChannelOrder::Rgb && self.factors == [1.0; 3]
    }
}

impl Default for ColorProfile {
    fn default() -> Self {
        Self::new([1.0; 3], ChannelOrder::Rgb)
    }
}

fn clamp_factor(factor: f32) -> f32 {
    if factor.is_nan() {
        0.0
    } else {
        factor.clamp(0.0, 1.0)
    }
}

/// Which kind of content a renderer produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderKind {
    Text,
    Clock,
    Image,
    Video,
}

impl fmt::Display for RenderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderKind::Text => "text",
            RenderKind::Clock => "clock",
            RenderKind::Image => "image",
            RenderKind::Video => "video",
        };
        f.write_str(name)
    }
}

/// Parameters of the task a renderer was started with, as reported by status
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TaskParams {
    Text {
        content: String,
        color: Rgb,
        speed: f32,
        scroll: bool,
        font: String,
    },
    Clock {
        color: Rgb,
        format: String,
        use_network_time: bool,
        font: String,
    },
    Image {
        path: PathBuf,
    },
    Video {
        source: String,
    },
}

impl TaskParams {
    pub fn kind(&self) -> RenderKind {
        match self {
            TaskParams::Text { .. } => RenderKind::Text,
            TaskParams::Clock { .. } => RenderKind::Clock,
            TaskParams::Image { .. } => RenderKind::Image,
            TaskParams::Video { .. } => RenderKind::Video,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        let color: Rgb = "#ff8000".parse().unwrap();
        assert_eq!(color, Rgb::new(255, 128, 0));
        assert_eq!(color.to_hex(), "#ff8000");
    }

    #[test]
    fn test_parse_hex_color_uppercase() {
        let color: Rgb = "#00FF7f".parse().unwrap();
        assert_eq!(color, Rgb::new(0, 255, 127));
    }

    #[test]
    fn test_malformed_colors_rejected() {
        for bad in ["ff0000", "#ff00", "#ff00000", "#gg0000", "", "#", "#ffé000"] {
            let err = bad.parse::<Rgb>().unwrap_err();
            assert!(matches!(err, EngineError::InvalidInput(_)), "{bad:?}");
        }
    }

    #[test]
    fn test_rgb_serializes_as_hex() {
        let json = serde_json::to_string(&Rgb::new(1, 2, 255)).unwrap();
        assert_eq!(json, "\"#0102ff\"");
        let back: Rgb = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Rgb::new(1, 2, 255));
    }

    #[test]
    fn test_channel_order_parse() {
        assert_eq!("GRB".parse::<ChannelOrder>().unwrap(), ChannelOrder::Grb);
        assert_eq!("regular".parse::<ChannelOrder>().unwrap(), ChannelOrder::Rgb);
        assert!("rgbw".parse::<ChannelOrder>().is_err());
    }

    #[test]
    fn test_channel_order_display_round_trips() {
        for order in ChannelOrder::ALL {
            assert_eq!(order.to_string().parse::<ChannelOrder>().unwrap(), order);
        }
    }

    #[test]
    fn test_profile_clamps_factors() {
        let profile = ColorProfile::new([-1.0, 2.0, 0.5], ChannelOrder::Bgr);
        assert_eq!(profile.factors(), [0.0, 1.0, 0.5]);
        assert_eq!(profile.channel_order(), ChannelOrder::Bgr);
    }

    #[test]
    fn test_profile_nan_factor_is_zero() {
        let profile = ColorProfile::default().with_factors([f32::NAN, 1.0, 1.0]);
        assert_eq!(profile.factors(), [0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_default_profile_is_identity() {
        assert!(ColorProfile::default().is_identity());
        assert!(!ColorProfile::default().with_channel_order(ChannelOrder::Grb).is_identity());
    }

    #[test]
    fn test_task_params_serialize_with_kind_tag() {
        let params = TaskParams::Video {
            source: "rtsp://cam/1".into(),
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["kind"], "video");
        assert_eq!(json["source"], "rtsp://cam/1");
    }
}
