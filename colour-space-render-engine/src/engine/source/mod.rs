//! Image source: turns a file or encoded bytes into a fixed-format RGBA8 pixel buffer.
//!
//! Decoding goes through the `image` crate. Everything past this module only ever sees
//! a validated [`image_source::SourceImage`].

/// Decoded, validated RGBA8 image plus the error type for everything that can go wrong getting one.
pub mod image_source;
