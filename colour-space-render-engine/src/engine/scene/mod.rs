//! Scene furniture around the colour cloud.

/// RGB cube and HSV cylinder outlines, shown for the active colour space.
pub mod axes;
