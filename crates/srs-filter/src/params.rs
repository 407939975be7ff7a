//! Filter parameters.
//!
//! [`FilterParams`] is the single configuration record of a run. It is
//! immutable once validated, and every loader validates before returning.
//!
//! With the default `params-config` feature, parameters load from TOML or
//! JSON:
//!
//! ```toml
//! filter_mode = "DEEPHULL"
//! output_type = "MODEL"
//! offset_first_shrinkwrap = 10.0
//! spacing_second_remesh = 0.5
//! ```
//!
//! Missing keys take their defaults. Unknown keys are rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FilterError, FilterResult};

/// Where the terminal mesh goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputType {
    /// A standalone model named and colored after the segment.
    #[default]
    Model,
    /// Replace the segment's closed surface.
    Segmentation,
}

/// How far the pipeline runs before producing output.
///
/// Variants are ordered by pipeline position.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterMode {
    /// Stop after the first shrinkwrap pass.
    ConvexHull,
    /// Stop after raycast refinement.
    Raycasts,
    /// Stop after the second shrinkwrap pass.
    DeepHull,
    /// Stop after cap removal; the surface is open.
    NonManifold,
    /// Run to the end and output a closed solid shell.
    #[default]
    Solidified,
}

/// The filter mode read as a pipeline stopping point.
pub type TerminalStage = FilterMode;

impl FilterMode {
    pub const ALL: [FilterMode; 5] = [
        FilterMode::ConvexHull,
        FilterMode::Raycasts,
        FilterMode::DeepHull,
        FilterMode::NonManifold,
        FilterMode::Solidified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::ConvexHull => "CONVEXHULL",
            FilterMode::Raycasts => "RAYCASTS",
            FilterMode::DeepHull => "DEEPHULL",
            FilterMode::NonManifold => "NONMANIFOLD",
            FilterMode::Solidified => "SOLIDIFIED",
        }
    }

    /// Whether the output of this mode is a closed surface.
    pub fn produces_closed_surface(&self) -> bool {
        !matches!(self, FilterMode::NonManifold)
    }
}

impl OutputType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputType::Model => "MODEL",
            OutputType::Segmentation => "SEGMENTATION",
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterMode {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['_', '-'], "").to_ascii_uppercase();
        FilterMode::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| FilterError::ConfigParse {
                details: format!("unknown filter mode '{s}'"),
            })
    }
}

impl FromStr for OutputType {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MODEL" => Ok(OutputType::Model),
            "SEGMENTATION" | "SEGMENT" => Ok(OutputType::Segmentation),
            _ => Err(FilterError::ConfigParse {
                details: format!("unknown output type '{s}'"),
            }),
        }
    }
}

/// Configuration record of a filter run.
///
/// Lengths are in world units (mm for medical images).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterParams {
    pub output_type: OutputType,
    pub filter_mode: FilterMode,

    /// Distance kept between the first shrinkwrap and the input surface.
    pub offset_first_shrinkwrap: f64,
    /// Remesh spacing during the first shrinkwrap pass.
    pub spacing_first_remesh: f64,
    /// Remesh spacing during the second shrinkwrap pass.
    pub spacing_second_remesh: f64,
    pub iterations_first_shrinkwrap: u32,
    pub iterations_second_shrinkwrap: u32,

    /// Faces with an edge longer than this are searched for missing detail.
    pub raycast_search_edge_length: f64,
    /// Target edge length after subdividing before raycasting.
    pub raycast_output_edge_length: f64,
    /// Hits of neighbouring vertices must be closer than this to corroborate.
    pub raycast_max_hit_distance: f64,
    pub raycast_max_length: f64,
    pub raycast_min_length: f64,

    /// Vertices farther than this from the input surface are cut away.
    pub max_model_distance: f64,
    /// Inward wall thickness of the solidified shell.
    pub solidification_thickness: f64,
    /// 0 keeps detail, 1 smooths hardest.
    pub smoothing_factor: f64,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            output_type: OutputType::Model,
            filter_mode: FilterMode::Solidified,
            offset_first_shrinkwrap: 15.0,
            spacing_first_remesh: 10.0,
            spacing_second_remesh: 1.0,
            iterations_first_shrinkwrap: 3,
            iterations_second_shrinkwrap: 5,
            raycast_search_edge_length: 20.0,
            raycast_output_edge_length: 2.0,
            raycast_max_hit_distance: 2.0,
            raycast_max_length: 100.0,
            raycast_min_length: 0.0,
            max_model_distance: 0.7,
            solidification_thickness: 1.5,
            smoothing_factor: 0.2,
        }
    }
}

impl FilterParams {
    /// Inclusive bounds per numeric field, as `(name, value, min, max)`.
    fn ranges(&self) -> [(&'static str, f64, f64, f64); 13] {
        [
            ("offset_first_shrinkwrap", self.offset_first_shrinkwrap, 0.0, 50.0),
            ("spacing_first_remesh", self.spacing_first_remesh, 0.1, 50.0),
            ("spacing_second_remesh", self.spacing_second_remesh, 0.1, 10.0),
            (
                "iterations_first_shrinkwrap",
                f64::from(self.iterations_first_shrinkwrap),
                1.0,
                10.0,
            ),
            (
                "iterations_second_shrinkwrap",
                f64::from(self.iterations_second_shrinkwrap),
                0.0,
                10.0,
            ),
            ("raycast_search_edge_length", self.raycast_search_edge_length, 0.1, 100.0),
            ("raycast_output_edge_length", self.raycast_output_edge_length, 0.1, 100.0),
            ("raycast_max_hit_distance", self.raycast_max_hit_distance, 0.1, 50.0),
            ("raycast_max_length", self.raycast_max_length, 0.1, 1000.0),
            ("raycast_min_length", self.raycast_min_length, 0.0, 1000.0),
            ("max_model_distance", self.max_model_distance, 0.01, 10.0),
            ("solidification_thickness", self.solidification_thickness, 0.1, 20.0),
            ("smoothing_factor", self.smoothing_factor, 0.0, 1.0),
        ]
    }

    /// Check every range and the mode/output compatibility rule.
    pub fn validate(&self) -> FilterResult<()> {
        for (name, value, min, max) in self.ranges() {
            // NaN fails both comparisons and lands here too.
            if !(value >= min && value <= max) {
                return Err(FilterError::InvalidParameter {
                    name,
                    value,
                    min,
                    max,
                });
            }
        }

        if !self.filter_mode.produces_closed_surface()
            && self.output_type == OutputType::Segmentation
        {
            return Err(FilterError::IncompatibleOutput {
                mode: self.filter_mode.to_string(),
                output: self.output_type.to_string(),
            });
        }
        Ok(())
    }

    pub fn with_filter_mode(mut self, mode: FilterMode) -> Self {
        self.filter_mode = mode;
        self
    }

    pub fn with_output_type(mut self, output: OutputType) -> Self {
        self.output_type = output;
        self
    }

    pub fn with_offset(mut self, offset: f64) -> Self {
        self.offset_first_shrinkwrap = offset;
        self
    }

    /// Set both remesh spacings.
    pub fn with_spacing(mut self, first: f64, second: f64) -> Self {
        self.spacing_first_remesh = first;
        self.spacing_second_remesh = second;
        self
    }

    pub fn with_iterations(mut self, first: u32, second: u32) -> Self {
        self.iterations_first_shrinkwrap = first;
        self.iterations_second_shrinkwrap = second;
        self
    }

    pub fn with_thickness(mut self, thickness: f64) -> Self {
        self.solidification_thickness = thickness;
        self
    }

    pub fn with_smoothing(mut self, factor: f64) -> Self {
        self.smoothing_factor = factor;
        self
    }

    pub fn with_max_model_distance(mut self, distance: f64) -> Self {
        self.max_model_distance = distance;
        self
    }
}

#[cfg(feature = "params-config")]
impl FilterParams {
    /// Parse and validate TOML.
    pub fn from_toml(text: &str) -> FilterResult<Self> {
        let params: Self = toml::from_str(text).map_err(|e| FilterError::ConfigParse {
            details: e.to_string(),
        })?;
        params.validate()?;
        Ok(params)
    }

    /// Parse and validate JSON.
    pub fn from_json(text: &str) -> FilterResult<Self> {
        let params: Self = serde_json::from_str(text).map_err(|e| FilterError::ConfigParse {
            details: e.to_string(),
        })?;
        params.validate()?;
        Ok(params)
    }

    /// Load from a file, choosing JSON for `.json` and TOML otherwise.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> FilterResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| FilterError::ConfigParse {
            details: format!("{}: {e}", path.display()),
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&text)
        } else {
            Self::from_toml(&text)
        }
    }

    pub fn to_toml(&self) -> FilterResult<String> {
        toml::to_string_pretty(self).map_err(|e| FilterError::ConfigParse {
            details: e.to_string(),
        })
    }

    pub fn to_json(&self) -> FilterResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| FilterError::ConfigParse {
            details: e.to_string(),
        })
    }
}
