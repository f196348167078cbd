mod cli;

use anyhow::{Context, Result, anyhow, bail, ensure};
use clap::Parser;
use hh_hotspots::{
    HotspotError, HotspotViewer, choreographer::FlightStatus, scene::Layer,
    viewer::MeshSource,
};

use crate::cli::{
    Args, SessionSummary, load_config, load_stored_hotspots, write_stored_hotspots,
    write_summary,
};

const FRAME_SECONDS: f32 = 1.0 / 60.0;

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::init();

    ensure!(
        args.model_size.is_finite() && args.model_size > 0.0,
        "model_size must be positive (got {})",
        args.model_size
    );
    let draft_text = match (&args.place, &args.label, &args.content) {
        (Some(_), Some(label), Some(content)) => Some((label.as_str(), content.as_str())),
        (Some(_), _, _) => bail!("--place requires both --label and --content"),
        (None, _, _) => None,
    };

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => Default::default(),
    };

    let mut viewer = HotspotViewer::new(config, args.viewport);
    viewer
        .load_model(vec![MeshSource::primitive(
            args.primitive.into(),
            args.model_size,
        )])
        .context("loading stand-in model")?;
    println!(
        "Loaded {:?} model (scale {:.3})",
        args.primitive,
        viewer.model_scale()
    );
    if let Some(bounds) = viewer.model_bounds() {
        println!(
            "Model bounds {:?} to {:?}",
            bounds.min.to_array(),
            bounds.max.to_array()
        );
    }
    if let Some(viewport) = args.resize {
        viewer.resize(viewport);
        println!("Viewport resized to {}x{}", viewport.width, viewport.height);
    }

    if let Some(path) = &args.hotspots {
        let stored = load_stored_hotspots(path)?;
        let loaded = viewer
            .load_hotspots(&stored)
            .map_err(toast)
            .with_context(|| format!("loading hotspots from {}", path.display()))?;
        println!(
            "Loaded {loaded} hotspots (next id {})",
            viewer.store().next_id()
        );
    }

    for id in &args.delete {
        if viewer.delete_hotspot(*id).map_err(toast)? {
            println!("Deleted hotspot {id}");
        } else {
            println!("Hotspot {id} not found; nothing deleted");
        }
    }

    if let Some(degrees) = args.orbit {
        if viewer.orbit(degrees.x.to_radians(), degrees.y.to_radians()) {
            println!("Orbited camera to {:?}", viewer.camera().position.to_array());
        } else {
            log::warn!("orbit ignored; camera controls are suspended");
        }
    }
    if let Some(factor) = args.zoom {
        ensure!(
            factor.is_finite() && factor > 0.0,
            "zoom must be positive (got {factor})"
        );
        if viewer.zoom(factor) {
            println!("Zoomed camera to {:?}", viewer.camera().position.to_array());
        } else {
            log::warn!("zoom ignored; camera controls are suspended");
        }
    }

    if let (Some(pointer), Some((label, content))) = (args.place, draft_text) {
        viewer.enter_placement_mode().map_err(toast)?;
        match viewer.pointer_click(pointer).map_err(toast)? {
            Some(_) => {
                let id = viewer.commit_draft(label, content).map_err(toast)?;
                println!("Committed hotspot {id} '{label}'");
            }
            None => {
                viewer.exit_placement_mode().map_err(toast)?;
                println!(
                    "No surface under {},{}; nothing placed",
                    pointer.x, pointer.y
                );
            }
        }
    }

    if let Some(id) = args.open {
        let record = viewer.open_hotspot(id).map_err(toast)?;
        println!("Opened hotspot {id} '{}': {}", record.label, record.content);
    }

    if args.toggle_markers {
        let visible = viewer.toggle_marker_visibility();
        println!("Markers {}", if visible { "shown" } else { "hidden" });
    }

    let mut arrived = false;
    for _ in 0..args.frames {
        if viewer.tick(FRAME_SECONDS) == FlightStatus::Arrived {
            arrived = true;
        }
    }
    if viewer.is_flying() {
        log::warn!("camera still in flight after {} frames", args.frames);
    } else if arrived {
        println!("Camera arrived at {:?}", viewer.camera().position.to_array());
    }

    if args.close {
        if let Some(record) = viewer.selected_hotspot() {
            println!("Closed hotspot {}", record.id);
        }
        viewer.close_hotspot();
    }

    let stored = viewer.stored_hotspots(args.model_id.as_deref());
    if let Some(path) = &args.output {
        write_stored_hotspots(path, &stored)?;
        println!("Wrote {} hotspots to {}", stored.len(), path.display());
    }

    let summary = SessionSummary {
        phase: viewer.phase().to_string(),
        hotspots: viewer.store().len(),
        next_id: viewer.store().next_id(),
        selected: viewer.selected_hotspot().map(|record| record.id),
        model_bounds: viewer
            .model_bounds()
            .map(|bounds| [bounds.min.to_array(), bounds.max.to_array()]),
        markers_visible: viewer.camera().layers.is_enabled(Layer::Markers),
        camera_position: viewer.camera().position.to_array(),
        camera_target: viewer.controls().target.to_array(),
        live_gpu_resources: viewer.stage().gpu.live_count(),
    };
    println!(
        "Session: {} hotspots, phase {}, {} live GPU resources",
        summary.hotspots, summary.phase, summary.live_gpu_resources
    );
    if let Some(path) = &args.summary_json {
        write_summary(path, &summary)?;
    }

    viewer.teardown().context("tearing down viewer")?;
    println!("Viewer torn down cleanly");
    Ok(())
}

fn toast(err: HotspotError) -> anyhow::Error {
    anyhow!("{} ({err})", err.user_message())
}
