//! Runs the overlay loop against the fixture models and saves the last overlay as a PNG.
//!
//! Usage: `perception-overlay [SECONDS] [OUTPUT.png]`

use std::{env, thread, time::Duration};

use anyhow::Context;
use perception_overlay::config::OverlayOptions;
use perception_overlay::fixture::{FixtureAttributes, FixtureMesh, FixturePose, FixtureVideo};
use perception_overlay::image::{Image, Resolution};
use perception_overlay::orchestrator::Orchestrator;
use perception_overlay::scheduler::{FrameScheduler, Host};
use perception_overlay::toggle::{Toggle, Toggles};

fn main() -> anyhow::Result<()> {
    perception_overlay::init_logger!();

    let options = OverlayOptions::from_env()?;

    let mut args = env::args().skip(1);
    let run_for = match args.next() {
        Some(arg) => {
            let secs: f64 = arg
                .parse()
                .with_context(|| format!("invalid run duration '{arg}'"))?;
            Duration::try_from_secs_f64(secs)
                .with_context(|| format!("invalid run duration '{arg}'"))?
        }
        None => Duration::from_secs(4),
    };
    let output = args.next().unwrap_or_else(|| "overlay.png".to_string());

    let toggles = Toggles::new(options.initial_toggles());
    let orchestrator = Orchestrator::new(
        FixtureMesh::new(),
        FixturePose::new(),
        FixtureAttributes::new(),
    );
    let video = FixtureVideo::new(Resolution::VGA).loading_for(1);
    let host = Host::new(toggles.clone());

    let mut handle =
        FrameScheduler::new(&options).spawn(orchestrator, video, Image::new(0, 0), host)?;

    // Flip the mesh overlay halfway through, like a user clicking its checkbox.
    thread::sleep(run_for / 2);
    toggles.toggle(Toggle::Mesh);
    thread::sleep(run_for / 2);

    log::debug!("stopping after {run_for:?} (state: {:?})", handle.state());
    handle.cancel();
    let surface = handle.join()?;

    surface.save(&output)?;
    log::info!("saved {} overlay to '{output}'", surface.resolution());
    Ok(())
}
