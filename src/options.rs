//! User-facing knobs and their validation.

use crate::errors::{Result, SimplifyError};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimplificationOptions {
    pub preserve_border_edges: bool,
    pub preserve_uv_seam_edges: bool,
    pub preserve_uv_foldover_edges: bool,
    pub preserve_surface_curvature: bool,
    pub enable_smart_link: bool,
    pub vertex_link_distance: f64,
    pub max_iteration_count: u32,
    pub aggressiveness: f64,
    pub manual_uv_component_count: bool,
    pub uv_component_count: u8,
}

impl Default for SimplificationOptions {
    fn default() -> Self {
        SimplificationOptions {
            preserve_border_edges: false,
            preserve_uv_seam_edges: false,
            preserve_uv_foldover_edges: false,
            preserve_surface_curvature: false,
            enable_smart_link: true,
            vertex_link_distance: f64::EPSILON,
            max_iteration_count: 100,
            aggressiveness: 7.0,
            manual_uv_component_count: false,
            uv_component_count: 2,
        }
    }
}

impl SimplificationOptions {
    pub fn validate(&self) -> Result<()> {
        if self.max_iteration_count == 0 {
            return Err(SimplifyError::InvalidOptions {
                property: "max_iteration_count",
                message: "must be greater than zero".to_string(),
            });
        }
        if !(self.aggressiveness > 0.0) {
            return Err(SimplifyError::InvalidOptions {
                property: "aggressiveness",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.enable_smart_link && self.vertex_link_distance < 0.0 {
            return Err(SimplifyError::InvalidOptions {
                property: "vertex_link_distance",
                message: "must be non-negative when smart-linking is enabled".to_string(),
            });
        }
        if self.manual_uv_component_count && self.uv_component_count > 4 {
            return Err(SimplifyError::InvalidOptions {
                property: "uv_component_count",
                message: "must be in [0, 4] when manually specified".to_string(),
            });
        }
        Ok(())
    }
}
