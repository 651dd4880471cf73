use std::path::PathBuf;

use anyhow::{Context, Result};
use bevy::log::LogPlugin;
use bevy::prelude::*;
use clap::Parser;

use dungeon_core::config::{DungeonConfig, DEFAULT_CONFIG_PATH};
use dungeon_core::floor::{FloorContext, FloorGeometry};
use dungeon_core::generation::floor_manager::FloorDagReceived;
use dungeon_core::generation::{DagDocument, GenerationPlugin};
use dungeon_core::logging::{init_tracing, LogLevel};
use dungeon_core::movement::MovementPlugin;
use dungeon_core::visualization::{render_ascii, VisualizationPlugin};

/// Place a dungeon DAG document and inspect the resulting floor
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// DAG document (JSON) as sent by the floor service
    dag: PathBuf,

    /// Config file; defaults apply if it does not exist
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Substitute the fallback floor when the document is rejected
    #[arg(long)]
    fallback: bool,

    /// Print the layout as JSON instead of the map
    #[arg(long)]
    json: bool,

    /// Open a window showing the floor
    #[arg(long)]
    view: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Document handed to the floor manager on startup in `--view` mode
#[derive(Resource)]
struct InitialDag(DagDocument);

fn main() -> Result<()> {
    let args = Args::parse();

    let config = DungeonConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    let mut logging = config.logging.clone();
    if args.verbose {
        logging.default_level = LogLevel::Debug;
    }
    init_tracing(&logging);

    let text = std::fs::read_to_string(&args.dag)
        .with_context(|| format!("reading {}", args.dag.display()))?;
    let doc = DagDocument::from_json(&text)
        .with_context(|| format!("parsing {}", args.dag.display()))?;

    let floor = if args.fallback {
        FloorContext::load_or_fallback(&doc, FloorGeometry::Derived, &config)
    } else {
        FloorContext::load(&doc, FloorGeometry::Derived, &config)
            .with_context(|| format!("placing floor '{}'", doc.root_hint))?
    };

    let layout = floor.layout();
    if args.json {
        println!("{}", serde_json::to_string_pretty(layout)?);
    } else {
        println!(
            "floor '{}': {} rooms, {} hallways, {}x{} cells, fingerprint {:016x}",
            layout.source_id,
            layout.rooms.len(),
            layout.hallways.len(),
            layout.bounds.width(),
            layout.bounds.height(),
            layout.fingerprint()
        );
        if let Some(err) = floor.degraded() {
            println!("degraded: {err}");
        }
        print!("{}", render_ascii(&floor));
    }

    if args.view {
        // The floor manager places the document again (with fallback) in-app
        let center = floor.spawn_point();
        run_viewer(config, doc, center);
    }
    Ok(())
}

fn run_viewer(config: DungeonConfig, doc: DagDocument, center: Vec3) {
    App::new()
        .add_plugins(DefaultPlugins.build().disable::<LogPlugin>())
        .insert_resource(config)
        .add_plugins((GenerationPlugin, MovementPlugin, VisualizationPlugin))
        .insert_resource(InitialDag(doc))
        .insert_resource(CameraTarget(center))
        .add_systems(Startup, (send_initial_dag, setup))
        .run();
}

#[derive(Resource)]
struct CameraTarget(Vec3);

fn send_initial_dag(dag: Res<InitialDag>, mut received: EventWriter<FloorDagReceived>) {
    received.send(FloorDagReceived {
        document: dag.0.clone(),
    });
}

fn setup(mut commands: Commands, target: Res<CameraTarget>) {
    let target = target.0;
    commands.spawn((
        Camera3d::default(),
        Transform::from_translation(target + Vec3::new(0.0, 30.0, -20.0)).looking_at(target, Vec3::Y),
    ));
    commands.spawn((
        DirectionalLight {
            illuminance: 10000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(EulerRot::XYZ, -0.5, 0.5, 0.0)),
    ));
    info!("dungeon viewer ready");
}
