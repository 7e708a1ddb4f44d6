use framesheet_common::AddressStyle;
use framesheet_host::{BorderStyle, Color, ColorScale, FontStyle};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
#[cfg(feature = "serde")]
use thiserror::Error;

use crate::formula::{FormulaBuilder, HidePolicy};

/// Formatting and formula policy for frames and heat maps.
///
/// Passed by value into every constructor; nothing reads process-wide state.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct FrameConfig {
    pub hide_policy: HidePolicy,
    /// Template with one `{}` hole wrapped around every aggregate, e.g.
    /// `IFERROR({},"")`.
    pub error_wrap: Option<String>,
    /// Address style for references inside generated formulas.
    pub reference_style: AddressStyle,
    /// Merge runs of equal labels in upper header levels and outer index
    /// levels.
    pub merge_headers: bool,
    pub autofit: bool,
    pub header_font: Option<FontStyle>,
    pub header_border: Option<BorderStyle>,
    pub header_fill: Option<Color>,
    pub header_number_format: Option<String>,
    pub color_scale: ColorScale,
    /// Number of cells in a heat-map legend strip.
    pub legend_length: u32,
    /// Blank columns between a heat map and its legend.
    pub legend_gap: u32,
}

impl Default for FrameConfig {
    fn default() -> Self {
        FrameConfig {
            hide_policy: HidePolicy::ExcludeHiddenAndErrors,
            error_wrap: Some("IFERROR({},\"\")".to_string()),
            reference_style: AddressStyle::absolute(),
            merge_headers: true,
            autofit: true,
            header_font: Some(FontStyle::bold()),
            header_border: None,
            header_fill: None,
            header_number_format: None,
            color_scale: ColorScale::default(),
            legend_length: 10,
            legend_gap: 1,
        }
    }
}

#[cfg(feature = "serde")]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid frame config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("error_wrap template needs exactly one '{{}}' hole: {0}")]
    WrapTemplate(String),
}

impl FrameConfig {
    /// No wrapping, no exclusion, no styling.
    pub fn plain() -> Self {
        FrameConfig {
            hide_policy: HidePolicy::IncludeAll,
            error_wrap: None,
            merge_headers: false,
            autofit: false,
            header_font: None,
            ..FrameConfig::default()
        }
    }

    pub fn with_hide_policy(mut self, policy: HidePolicy) -> Self {
        self.hide_policy = policy;
        self
    }

    pub fn with_error_wrap(mut self, template: Option<&str>) -> Self {
        self.error_wrap = template.map(str::to_string);
        self
    }

    pub fn with_reference_style(mut self, style: AddressStyle) -> Self {
        self.reference_style = style;
        self
    }

    pub fn with_merge_headers(mut self, merge: bool) -> Self {
        self.merge_headers = merge;
        self
    }

    pub fn with_header_font(mut self, font: Option<FontStyle>) -> Self {
        self.header_font = font;
        self
    }

    pub fn with_legend(mut self, length: u32, gap: u32) -> Self {
        self.legend_length = length;
        self.legend_gap = gap;
        self
    }

    /// Parse a JSON document; missing fields take their defaults.
    #[cfg(feature = "serde")]
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: FrameConfig = serde_json::from_str(json)?;
        if let Some(template) = &config.error_wrap {
            if template.matches("{}").count() != 1 {
                return Err(ConfigError::WrapTemplate(template.clone()));
            }
        }
        Ok(config)
    }

    pub fn formula_builder(&self) -> FormulaBuilder {
        FormulaBuilder::new(self.hide_policy)
            .with_error_wrap(self.error_wrap.clone())
            .with_style(self.reference_style)
    }
}
