//! Marker rendering for the colour cloud.
//!
//! A single mesh entity stands in for every unique colour. Its draw binds the animated Work
//! array as a per-instance vertex buffer and issues one indirect indexed draw.

/// Instanced, indirect draw of one sphere per unique colour.
///
/// Specialises Bevy's mesh pipeline with a ColourRecord instance layout and a scale uniform.
pub mod colour_marker_plugin;

/// Main world state mirrored into the render world.
pub mod extraction;
