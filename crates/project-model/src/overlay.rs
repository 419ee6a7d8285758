//! Template, watermark, and subtitle presentation settings.
//!
//! `OverlaySettings` is a plain value: edits produce a new copy, and the
//! compositor only reads the fields it needs.

use serde::{Deserialize, Serialize};

/// Visual template applied around the media slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateId {
    /// Headline bar above the media.
    #[default]
    Headline,
    /// Red "breaking news" banner plus a ticker strip.
    BreakingNews,
    /// Media edge to edge with a thin accent line.
    Minimal,
}

impl TemplateId {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateId::Headline => "headline",
            TemplateId::BreakingNews => "breaking-news",
            TemplateId::Minimal => "minimal",
        }
    }
}

impl std::str::FromStr for TemplateId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "headline" => Ok(TemplateId::Headline),
            "breaking-news" | "breaking_news" | "breaking" => Ok(TemplateId::BreakingNews),
            "minimal" => Ok(TemplateId::Minimal),
            other => Err(format!(
                "Unknown template: {other}. Use: headline, breaking-news, minimal"
            )),
        }
    }
}

/// Corner placement for the watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Watermark layer, drawn above everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkSettings {
    pub visible: bool,

    /// Watermark label.
    pub text: String,

    pub corner: Corner,

    /// Layer opacity [0.0, 1.0].
    pub opacity: f64,
}

/// Vertical placement of burned-in captions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubtitlePosition {
    #[default]
    Bottom,
    Center,
}

/// Burned-in subtitle styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubtitleStyle {
    pub enabled: bool,

    /// Font size relative to the output's shorter side.
    /// Typical range: 0.04 - 0.09.
    pub font_size_ratio: f64,

    /// Text color as hex string (for example `#ffffff`).
    pub color: String,

    /// Color of the word currently being spoken.
    pub highlight_color: String,

    /// Caption plate color; alpha accepted as `#rrggbbaa`.
    pub plate_color: String,

    pub position: SubtitlePosition,

    /// Words shown together on one caption page (1 = single word captions).
    pub words_per_caption: usize,

    pub uppercase: bool,
}

/// Overlay configuration for one composition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    pub template: TemplateId,

    /// Headline shown by the headline and breaking-news templates.
    pub headline: String,

    /// Background color as hex string (for example `#101014`).
    pub background: String,

    /// Template accent color.
    pub accent: String,

    pub watermark: WatermarkSettings,

    pub subtitle: SubtitleStyle,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            visible: true,
            text: "NEWSCUT".to_string(),
            corner: Corner::TopRight,
            opacity: 0.7,
        }
    }
}

impl Default for SubtitleStyle {
    fn default() -> Self {
        Self {
            enabled: true,
            font_size_ratio: 0.06,
            color: "#ffffff".to_string(),
            highlight_color: "#ffd400".to_string(),
            plate_color: "#000000b4".to_string(),
            position: SubtitlePosition::Bottom,
            words_per_caption: 3,
            uppercase: false,
        }
    }
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            template: TemplateId::Headline,
            headline: String::new(),
            background: "#101014".to_string(),
            accent: "#d62828".to_string(),
            watermark: WatermarkSettings::default(),
            subtitle: SubtitleStyle::default(),
        }
    }
}

impl OverlaySettings {
    /// Copy with a different template.
    pub fn with_template(&self, template: TemplateId) -> Self {
        Self {
            template,
            ..self.clone()
        }
    }

    /// Copy with a different headline.
    pub fn with_headline(&self, headline: impl Into<String>) -> Self {
        Self {
            headline: headline.into(),
            ..self.clone()
        }
    }

    /// Copy with the watermark shown or hidden.
    pub fn with_watermark_visible(&self, visible: bool) -> Self {
        let mut next = self.clone();
        next.watermark.visible = visible;
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_on_change_leaves_original() {
        let base = OverlaySettings::default();
        let changed = base
            .with_template(TemplateId::BreakingNews)
            .with_headline("Storm hits coast");
        assert_eq!(base.template, TemplateId::Headline);
        assert!(base.headline.is_empty());
        assert_eq!(changed.template, TemplateId::BreakingNews);
        assert_eq!(changed.headline, "Storm hits coast");
        assert!(!base.with_watermark_visible(false).watermark.visible);
    }

    #[test]
    fn test_template_parsing() {
        assert_eq!(
            "breaking-news".parse::<TemplateId>().unwrap(),
            TemplateId::BreakingNews
        );
        assert_eq!("Minimal".parse::<TemplateId>().unwrap(), TemplateId::Minimal);
        assert!("glitter".parse::<TemplateId>().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed: OverlaySettings =
            serde_json::from_str(r#"{"template":"minimal","subtitle":{"uppercase":true}}"#)
                .unwrap();
        assert_eq!(parsed.template, TemplateId::Minimal);
        assert!(parsed.subtitle.uppercase);
        assert_eq!(parsed.subtitle.words_per_caption, 3);
        assert!(parsed.watermark.visible);
    }
}
