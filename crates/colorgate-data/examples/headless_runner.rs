//! Headless runner: loads a level file and plays it with a greedy solver.
//!
//! Each round drags every active item straight at the first trigger of its
//! color, one simulated frame at a time, then releases it. Rounds repeat
//! until the level completes or a round retires nothing.
//!
//! Run with: `cargo run -p colorgate-data --example headless_runner -- [level file]`
//!
//! Defaults to `levels/crossroads.ron`. Set `RUST_LOG` to adjust logging
//! (default `colorgate=info,headless_runner=info`).

use colorgate_core::board::Board;
use colorgate_core::event::{Event, EventKind};
use colorgate_core::fixed::Fixed64;
use colorgate_core::geometry::{Ray, WorldPosition};
use colorgate_core::id::ItemId;
use colorgate_data::load_level;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const FRAMES_PER_DRAG: usize = 60;
const MAX_ROUNDS: usize = 8;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("colorgate=info,headless_runner=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("levels/crossroads.ron"));

    let loaded = load_level(&path)?;
    let mut board = loaded.board()?;

    board.events_mut().on(
        EventKind::ItemRetired,
        Box::new(|event| {
            if let Event::ItemRetired { item, step, .. } = event {
                info!(?item, step, "item left the board");
            }
        }),
    );
    board.events_mut().on(
        EventKind::LevelCompleted,
        Box::new(|event| info!(step = event.step(), "level complete")),
    );
    board.flush_events();

    let dt = Fixed64::from_num(1) / 30;
    for round in 1..=MAX_ROUNDS {
        if board.is_level_complete() {
            break;
        }
        let before = board.active_item_count();
        for (id, target) in plan(&board) {
            drag_toward(&mut board, id, target, dt)?;
        }
        let after = board.active_item_count();
        info!(round, remaining = after, "round finished");
        if after == before {
            warn!(round, remaining = after, "no item could leave; giving up");
            break;
        }
    }

    let left: Vec<&str> = board
        .items()
        .filter(|(_, item)| item.is_active())
        .filter_map(|(_, item)| loaded.color_name(item.color))
        .collect();
    println!(
        "{}: complete={} steps={} remaining={:?}",
        path.display(),
        board.is_level_complete(),
        board.step(),
        left
    );
    Ok(())
}

/// Every active item paired with the anchor of the first trigger matching
/// its color.
fn plan(board: &Board) -> Vec<(ItemId, WorldPosition)> {
    board
        .items()
        .filter(|(_, item)| item.is_active())
        .filter_map(|(id, item)| {
            board
                .triggers()
                .find(|(_, zone)| zone.color == item.color)
                .map(|(_, zone)| (id, board.spatial().grid_to_world(zone.anchor)))
        })
        .collect()
}

fn drag_toward(
    board: &mut Board,
    id: ItemId,
    target: WorldPosition,
    dt: Fixed64,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(item) = board.item(id) else {
        return Ok(());
    };
    if !item.is_active() {
        return Ok(());
    }
    let start = item.position;
    board.begin_drag(id, Ray::straight_down(start.x, start.z))?;
    for _ in 0..FRAMES_PER_DRAG {
        board.continue_drag(Ray::straight_down(target.x, target.z), dt)?;
        if board.selected() != Some(id) {
            break;
        }
    }
    board.end_drag();
    Ok(())
}
