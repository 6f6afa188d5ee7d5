use clap::Parser;
use colour_space_render_engine::engine::core::app_setup::{
    BackendChoice, LaunchOptions, create_app,
};
use std::path::PathBuf;

/// Scatter the unique colours of an image in RGB and HSV space.
#[derive(Debug, Parser)]
struct Args {
    /// Image to load on startup. Overrides `initial_image` in viewer_settings.json.
    image: Option<PathBuf>,

    /// Run the pipeline on the CPU. Nothing is drawn; the overlay still reports results.
    #[clap(long)]
    cpu: bool,
}

fn main() {
    let args = Args::parse();

    let launch = LaunchOptions {
        image: args.image,
        backend: if args.cpu {
            BackendChoice::Cpu
        } else {
            BackendChoice::Gpu
        },
    };

    create_app(launch).run();
}
