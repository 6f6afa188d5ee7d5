pub mod animation;
pub mod camera;
pub mod colour;
pub mod compute;
pub mod core;
pub mod loading;
pub mod pipeline;
pub mod render;
pub mod scene;
pub mod source;
pub mod systems;
