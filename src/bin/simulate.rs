//! Runs a session profile against a simulated local mouse and keyboard

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use glam::Vec2;
use stream_multiplayer::build_info;
use stream_multiplayer::config::SessionConfig;
use stream_multiplayer::host::NullHost;
use stream_multiplayer::input::{
    DeviceId, DeviceKind, InputUsers, KeyCode, KeyboardState, MouseButtons, MouseState, RawEvent, Rect,
    UserIndexAllocator, ViewportLayout,
};
use stream_multiplayer::raycast::{
    Canvas, Graphic, GraphicRaycaster, GraphicRaycasterSettings, PointerEvent, SceneRaycaster,
    ScreenCamera,
};
use stream_multiplayer::session::Session;
use stream_multiplayer::validation::{self, print_report};
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing::info;
use tracing_subscriber::EnvFilter;

const VIEWPORT_WIDTH: f32 = 800.0;
const VIEWPORT_HEIGHT: f32 = 600.0;

#[derive(Parser, Debug)]
#[command(name = "simulate", version, about = "Simulate several streamed players on one machine")]
struct Cli {
    /// Profile to load (defaults to STREAM_PROFILE, then "release")
    #[arg(short, long)]
    profile: Option<String>,

    /// Drive the built-in "two players share one mouse" walkthrough
    #[arg(long)]
    walkthrough: bool,

    /// Only validate the profile and exit with the report's exit code
    #[arg(long)]
    validate: bool,

    /// Print build information and exit
    #[arg(long)]
    version_info: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.version_info {
        println!("{}", build_info::detailed_info());
        return Ok(());
    }

    let config = match &cli.profile {
        Some(profile) => SessionConfig::load(profile),
        None => SessionConfig::load_from_env(),
    }
    .context("failed to load session profile")?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();
    info!(profile = %config.profile, version = %build_info::version_string(), "Starting simulation");

    let mut users = InputUsers::new();
    let mouse = users.adopt_device(DeviceKind::Pointer, "Mouse");
    let keyboard = users.adopt_device(DeviceKind::Keyboard, "Keyboard");

    let mut allocator = UserIndexAllocator::new();
    let mut session = Session::start(config.clone(), users, &mut allocator, Box::new(NullHost));

    let mut layout = ViewportLayout::new();
    for player in session.players() {
        let x = f32::from(player.display) * VIEWPORT_WIDTH;
        layout.register_viewport(
            player.display,
            Rect::new(x, 0.0, VIEWPORT_WIDTH, VIEWPORT_HEIGHT),
            &player.name,
        );
    }

    let hierarchies = session
        .players()
        .iter()
        .filter_map(|player| session.hierarchy(&player.hierarchy).map(|h| (player.display, h)))
        .map(|(display, hierarchy)| {
            let canvas = Arc::new(
                Canvas::new(10.0).with_graphic(Graphic::new(
                    u32::from(display) + 100,
                    Rect::new(0.0, 0.0, VIEWPORT_WIDTH, VIEWPORT_HEIGHT),
                    0,
                )),
            );
            let raycaster = GraphicRaycaster::new(
                ScreenCamera::new(display),
                canvas,
                GraphicRaycasterSettings::default(),
            );
            hierarchy.with_raycaster(SceneRaycaster::Graphic(raycaster))
        })
        .collect();
    session.install_raycasters(hierarchies, Vec::new());

    let report = validation::validate_session(&config, session.report());
    print_report(&report);
    if cli.validate {
        std::process::exit(report.exit_code());
    }

    if cli.walkthrough {
        walkthrough(&mut session, &mut layout, mouse, keyboard);
    }

    for event in session.shutdown() {
        info!(?event, "Session event");
    }
    Ok(())
}

/// Presses on the first display, drags onto the second and releases
fn walkthrough(
    session: &mut Session,
    layout: &mut ViewportLayout,
    mouse: DeviceId,
    keyboard: DeviceId,
) {
    let mut table = Builder::default();
    table.push_record(["Frame", "Raw", "Delivered to", "Display", "Buttons", "Keys"]);

    let held = MouseButtons::LEFT;
    let frames: Vec<([f32; 2], RawEvent)> = vec![
        ([100.0, 100.0], RawEvent::mouse(mouse, 0.0, MouseState::at([100.0, 100.0]))),
        (
            [120.0, 100.0],
            RawEvent::mouse(mouse, 0.1, MouseState::at([120.0, 100.0]).with_buttons(held)),
        ),
        (
            [120.0, 100.0],
            RawEvent::keyboard(keyboard, 0.15, KeyboardState::with_keys([KeyCode::Letter('w')])),
        ),
        (
            [900.0, 100.0],
            RawEvent::mouse(
                mouse,
                0.2,
                MouseState::at([900.0, 100.0]).with_buttons(held).with_delta([780.0, 0.0]),
            ),
        ),
        ([910.0, 100.0], RawEvent::mouse(mouse, 0.3, MouseState::at([910.0, 100.0]))),
        (
            [910.0, 100.0],
            RawEvent::mouse(mouse, 0.4, MouseState::at([910.0, 100.0]).with_buttons(held)),
        ),
    ];

    for (frame, (pointer, raw)) in frames.into_iter().enumerate() {
        layout.set_pointer(Some(pointer));
        for event in session.tick(&*layout) {
            info!(frame, ?event, "Session event");
        }
        for delivered in session.handle_event(&raw) {
            let name = session
                .input()
                .devices()
                .get(delivered.device)
                .map(|device| device.name().to_string())
                .unwrap_or_else(|| delivered.device.to_string());
            let (display, buttons) = delivered
                .as_mouse()
                .map(|state| (state.display_index.to_string(), format!("{:?}", state.buttons)))
                .unwrap_or_default();
            let keys = delivered
                .as_keyboard()
                .map(|state| format!("{:?}", state.keys().collect::<Vec<_>>()))
                .unwrap_or_default();
            table.push_record([
                frame.to_string(),
                raw.device.to_string(),
                name,
                display,
                buttons,
                keys,
            ]);
        }
    }
    println!("{}", table.build().with(Style::rounded()));

    let Some(display) = session.focus() else {
        return;
    };
    let local = layout.to_local(display, [910.0, 100.0]).unwrap_or([0.0, 0.0]);
    for player in session.players() {
        let Some(device) = session
            .input()
            .paired_devices(player.user)
            .ok()
            .and_then(|devices| devices.first().copied())
        else {
            continue;
        };
        let hits = session.raycast(&PointerEvent::from_device(device, Vec2::from(local), display));
        println!(
            "{} pointer on display {display}: {} hit(s)",
            player.name,
            hits.len()
        );
    }
}
