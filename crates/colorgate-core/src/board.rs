//! The board: the single owner of every registry, and the drag lifecycle
//! that moves items, tracks trigger containment, and retires items.
//!
//! # Drag lifecycle
//!
//! 1. [`Board::begin_drag`] selects an item and records where on the item
//!    the pointer touched it.
//! 2. [`Board::continue_drag`] validates the move per axis, interpolates
//!    toward the allowed target, syncs containment against every trigger,
//!    and re-evaluates triggers whose containment changed.
//! 3. [`Board::end_drag`] snaps the item to the nearest cell, recomputes
//!    occupancy, and re-evaluates every trigger.
//!
//! Events emitted during an operation are delivered to listeners, in
//! emission order, when it returns.

use crate::collision::CollisionWorld;
use crate::config::{BoardConfig, ConfigError};
use crate::event::{Event, EventBus};
use crate::exit_path::{ExitPathChecker, PathStatus};
use crate::fixed::Fixed64;
use crate::geometry::{GridPosition, Ray, Rect, WorldPosition};
use crate::grid::{GridError, OccupancyGrid, RemoveOutcome};
use crate::id::{Color, ItemId, TriggerId};
use crate::item::{Item, ItemSize, ItemState};
use crate::level::{LevelData, LevelError};
use crate::movement::MovementValidator;
use crate::spatial::SpatialIndex;
use crate::trigger::{Containment, TriggerZone};
use slotmap::SlotMap;
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    #[error("level error: {0}")]
    Level(#[from] LevelError),
    #[error("grid error: {0}")]
    Grid(#[from] GridError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
    #[error("item not found: {0:?}")]
    ItemNotFound(ItemId),
    #[error("item {0:?} is not selectable")]
    ItemNotSelectable(ItemId),
    #[error("item {0:?} is retiring")]
    ItemRetiring(ItemId),
    #[error("cell ({x}, {y}) is already occupied")]
    CellOccupied { x: i32, y: i32 },
    #[error("pointer ray does not reach the drag plane")]
    RayMissesPlane,
}

/// The active drag gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Drag {
    item: ItemId,
    /// Item position minus the pointer hit point.
    offset: WorldPosition,
    plane_y: Fixed64,
}

#[derive(Debug)]
pub struct Board {
    config: BoardConfig,
    spatial: SpatialIndex,
    grid: OccupancyGrid,
    items: SlotMap<ItemId, Item>,
    triggers: SlotMap<TriggerId, TriggerZone>,
    /// Every cell covered by a trigger.
    trigger_cells: BTreeMap<GridPosition, TriggerId>,
    /// Ring cells not covered by a trigger.
    obstacles: Vec<GridPosition>,
    movement: MovementValidator,
    exit_paths: ExitPathChecker,
    events: EventBus,
    drag: Option<Drag>,
    step: u64,
    level_complete: bool,
}

impl Board {
    /// Build a board from level data.
    ///
    /// Items are spawned at every well-formed anchor, occupancy is computed,
    /// containment is synced, and every trigger is evaluated once. Events
    /// from loading stay buffered until the first operation (or
    /// [`Board::flush_events`]), so listeners registered right after loading
    /// still see them.
    pub fn load(level: &LevelData, config: BoardConfig) -> Result<Board, BoardError> {
        config.validate()?;
        level.validate()?;

        // Re-place every trigger on an empty level to validate placements
        // that did not come through `LevelData::place_trigger`.
        let mut checked = LevelData::new(level.width, level.height)?;
        for placement in level.triggers.values() {
            checked.place_trigger(*placement)?;
        }

        let spatial = SpatialIndex::new(level.width, level.height, config.spacing);
        let mut triggers = SlotMap::with_key();
        let mut trigger_cells = BTreeMap::new();
        for placement in checked.triggers.values() {
            let pos = placement.position;
            let color = placement
                .color
                .ok_or(LevelError::MissingTriggerColor { x: pos.x, y: pos.y })?;
            let exit = checked
                .exit_for(placement)
                .ok_or(LevelError::MissingExit { x: pos.x, y: pos.y })?;
            let zone = TriggerZone::new(
                pos,
                placement.kind,
                color,
                placement.max_size(),
                exit,
                &spatial,
            );
            let cells = zone.cells.clone();
            let id = triggers.insert(zone);
            for cell in cells {
                trigger_cells.insert(cell, id);
            }
        }

        let obstacles = spatial
            .ring()
            .filter(|c| !trigger_cells.contains_key(c))
            .collect();

        let mut board = Board {
            config,
            spatial,
            grid: OccupancyGrid::new(level.width, level.height),
            items: SlotMap::with_key(),
            triggers,
            trigger_cells,
            obstacles,
            movement: MovementValidator::new(config.movement()),
            exit_paths: ExitPathChecker::new(),
            events: EventBus::new(config.event_capacity),
            drag: None,
            step: 0,
            level_complete: false,
        };

        for anchor in level.item_anchors() {
            board.insert_item(anchor.anchor, anchor.size, anchor.color);
        }
        board.grid.recompute(&board.items, &board.spatial);

        let ids: Vec<ItemId> = board.items.keys().collect();
        for id in ids {
            board.sync_containment(id);
        }
        board.evaluate_all();

        info!(
            width = level.width,
            height = level.height,
            items = board.items.len(),
            triggers = board.triggers.len(),
            "level loaded"
        );
        Ok(board)
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    /// Spawn an item. Every footprint cell must be inside the grid and free;
    /// the board is unchanged otherwise.
    pub fn spawn_item(
        &mut self,
        anchor: GridPosition,
        size: ItemSize,
        color: Color,
    ) -> Result<ItemId, BoardError> {
        self.step += 1;
        self.grid.recompute(&self.items, &self.spatial);
        for pos in size.cells(anchor) {
            if self.grid.cell(pos)?.occupied {
                return Err(BoardError::CellOccupied { x: pos.x, y: pos.y });
            }
        }

        let id = self.insert_item(anchor, size, color);
        self.level_complete = false;
        self.grid.recompute(&self.items, &self.spatial);
        let affected = self.sync_containment(id);
        self.evaluate_triggers(affected);
        self.events.deliver();
        Ok(id)
    }

    fn insert_item(&mut self, anchor: GridPosition, size: ItemSize, color: Color) -> ItemId {
        let position = self
            .spatial
            .grid_to_world(anchor)
            .with_y(self.config.item_height);
        let id = self.items.insert(Item::new(color, size, position));
        self.grid.add_item(id);
        self.events.emit(Event::ItemSpawned {
            item: id,
            anchor,
            step: self.step,
        });
        debug!(?id, x = anchor.x, y = anchor.y, ?size, "item spawned");
        id
    }

    /// Remove a retiring item once its exit animation is done. Active and
    /// unknown items are left alone.
    pub fn despawn(&mut self, id: ItemId) -> Option<Item> {
        match self.items.get(id) {
            Some(item) if item.state == ItemState::Retiring => self.items.remove(id),
            Some(_) => {
                debug!(?id, "despawn ignored for active item");
                None
            }
            None => None,
        }
    }

    // -----------------------------------------------------------------------
    // Drag lifecycle
    // -----------------------------------------------------------------------

    fn check_selectable(&self, id: ItemId) -> Result<&Item, BoardError> {
        let item = self.items.get(id).ok_or(BoardError::ItemNotFound(id))?;
        if !item.is_active() {
            return Err(BoardError::ItemRetiring(id));
        }
        if !item.selectable {
            return Err(BoardError::ItemNotSelectable(id));
        }
        Ok(item)
    }

    /// Select `id` under the pointer `ray`. Any drag in progress is finished
    /// first.
    pub fn begin_drag(&mut self, id: ItemId, ray: Ray) -> Result<(), BoardError> {
        self.step += 1;
        self.check_selectable(id)?;

        if self.drag.is_some() {
            self.finish_drag();
        }

        let result = self.select(id, ray);
        self.events.deliver();
        result
    }

    fn select(&mut self, id: ItemId, ray: Ray) -> Result<(), BoardError> {
        // Finishing the previous drag may have retired this item.
        let position = self.check_selectable(id)?.position;
        let hit = ray
            .intersect_horizontal(position.y)
            .ok_or(BoardError::RayMissesPlane)?;
        self.drag = Some(Drag {
            item: id,
            offset: position - hit,
            plane_y: position.y,
        });
        self.events.emit(Event::ItemSelected {
            item: id,
            step: self.step,
        });
        Ok(())
    }

    /// Move the selected item toward the pointer. `dt` is the frame time in
    /// seconds. Does nothing when no item is selected.
    pub fn continue_drag(&mut self, ray: Ray, dt: Fixed64) -> Result<(), BoardError> {
        self.step += 1;
        let Some(drag) = self.drag else {
            debug!("continue_drag without a selected item");
            return Ok(());
        };
        let Some(item) = self.items.get(drag.item) else {
            debug!(id = ?drag.item, "dragged item no longer exists");
            self.drag = None;
            return Ok(());
        };
        let hit = ray
            .intersect_horizontal(drag.plane_y)
            .ok_or(BoardError::RayMissesPlane)?;

        let from = item.position;
        let intended = (hit + drag.offset).with_y(from.y);
        let world = self.collision_world();
        let resolution = self
            .movement
            .resolve(&world, drag.item, item, &self.spatial, intended);

        let t = self
            .config
            .move_speed
            .saturating_mul(dt)
            .clamp(Fixed64::ZERO, Fixed64::ONE);
        let to = from.lerp(resolution.target, t);

        if to != from {
            if let Some(item) = self.items.get_mut(drag.item) {
                item.position = to;
            }
            self.events.emit(Event::ItemMoved {
                item: drag.item,
                from,
                to,
                step: self.step,
            });
        }

        let affected = self.sync_containment(drag.item);
        self.evaluate_triggers(affected);
        self.events.deliver();
        Ok(())
    }

    /// Release the selected item. Returns the released item, if any.
    ///
    /// Every trigger is re-checked even when nothing is selected: the
    /// dragged item may have retired mid-drag and freed another item's exit.
    pub fn end_drag(&mut self) -> Option<ItemId> {
        self.step += 1;
        let released = self.finish_drag();
        if released.is_none() {
            self.evaluate_all();
        }
        self.events.deliver();
        released
    }

    fn finish_drag(&mut self) -> Option<ItemId> {
        let drag = self.drag.take()?;

        if let Some(item) = self.items.get_mut(drag.item)
            && item.is_active()
        {
            let nearest = self.spatial.world_to_grid(item.position);
            let cell = self.spatial.clamp_footprint(nearest, item.size.offsets());
            let from = item.position;
            let to = self.spatial.grid_to_world(cell).with_y(from.y);
            if to != from {
                item.position = to;
                self.events.emit(Event::ItemMoved {
                    item: drag.item,
                    from,
                    to,
                    step: self.step,
                });
            }
        }
        self.events.emit(Event::ItemDeselected {
            item: drag.item,
            step: self.step,
        });

        self.grid.recompute(&self.items, &self.spatial);
        self.sync_containment(drag.item);
        self.evaluate_all();
        Some(drag.item)
    }

    // -----------------------------------------------------------------------
    // Containment and retirement
    // -----------------------------------------------------------------------

    fn part_rects(&self, item: &Item) -> Vec<Rect> {
        if !item.colliders_enabled() {
            return Vec::new();
        }
        let half = self.config.part_half_extent_world();
        item.part_positions(&self.spatial)
            .map(|p| Rect::centered(p.x, p.z, half, half))
            .collect()
    }

    /// Bring every trigger's counters for `id` in line with the item's
    /// current part positions. Returns the triggers that asked for a
    /// re-evaluation, each at most once.
    fn sync_containment(&mut self, id: ItemId) -> Vec<TriggerId> {
        let (rects, parts) = match self.items.get(id) {
            Some(item) => (self.part_rects(item), item.part_count()),
            None => (Vec::new(), 0),
        };
        let footprint = rects.iter().copied().reduce(|a, b| a.union(&b));

        let mut affected = Vec::new();
        let mut changes = Vec::new();
        for (tid, zone) in self.triggers.iter_mut() {
            let inside = rects.iter().filter(|r| r.overlaps(&zone.bounds)).count();
            let present = footprint.is_some_and(|f| f.overlaps(&zone.bounds));

            let tracker = zone.tracker_mut();
            let before = tracker.state(id);
            let mut reevaluate = false;

            let count = tracker.count(id);
            for _ in count..inside {
                reevaluate |= tracker.part_entered(id, parts).reevaluate;
            }
            for _ in inside..count {
                reevaluate |= tracker.part_exited(id).reevaluate;
            }
            if present != tracker.is_present(id) {
                let update = if present {
                    tracker.item_entered(id)
                } else {
                    tracker.item_exited(id)
                };
                reevaluate |= update.reevaluate;
            }

            let after = tracker.state(id);
            if before != after {
                changes.push((tid, before, after));
            }
            if reevaluate {
                affected.push(tid);
            }
        }

        for (trigger, before, after) in changes {
            self.events.emit(Event::ContainmentChanged {
                trigger,
                item: id,
                before,
                after,
                step: self.step,
            });
        }
        affected
    }

    fn evaluate_triggers(&mut self, triggers: Vec<TriggerId>) {
        for tid in triggers {
            self.evaluate_trigger(tid);
        }
    }

    fn evaluate_all(&mut self) {
        let ids: Vec<TriggerId> = self.triggers.keys().collect();
        self.evaluate_triggers(ids);
    }

    /// Re-check every item tracked by `tid`.
    fn evaluate_trigger(&mut self, tid: TriggerId) {
        let Some(zone) = self.triggers.get(tid) else {
            return;
        };
        let tracked: Vec<ItemId> = zone.tracker().tracked().collect();
        for id in tracked {
            self.evaluate(tid, id);
        }
    }

    /// Retire `id` through `tid` if it is color matched, fits, is fully
    /// inside, and has a clear exit path.
    fn evaluate(&mut self, tid: TriggerId, id: ItemId) -> bool {
        let Some(zone) = self.triggers.get(tid) else {
            return false;
        };
        let Some(item) = self.items.get(id) else {
            debug!(?id, ?tid, "tracked item no longer exists; dropped");
            if let Some(zone) = self.triggers.get_mut(tid) {
                zone.tracker_mut().forget(id);
            }
            return false;
        };
        if !item.is_active()
            || zone.tracker().state(id) != Containment::Full
            || !zone.accepts(item)
        {
            return false;
        }

        let world = self.collision_world();
        let status = self
            .exit_paths
            .along(&world, id, item, &self.spatial, zone.exit);
        match status {
            PathStatus::Clear => {
                self.retire(id, tid);
                true
            }
            PathStatus::Blocked(by) => {
                debug!(?id, ?by, ?tid, "exit path blocked");
                false
            }
        }
    }

    fn retire(&mut self, id: ItemId, tid: TriggerId) {
        for zone in self.triggers.values_mut() {
            zone.tracker_mut().forget(id);
        }
        if self.drag.is_some_and(|d| d.item == id) {
            self.drag = None;
            self.events.emit(Event::ItemDeselected {
                item: id,
                step: self.step,
            });
        }
        if let Some(item) = self.items.get_mut(id) {
            item.state = ItemState::Retiring;
            item.selectable = false;
        }

        let outcome = self.grid.remove_item(id);
        self.grid.recompute(&self.items, &self.spatial);
        self.events.emit(Event::ItemRetired {
            item: id,
            trigger: tid,
            step: self.step,
        });
        info!(?id, ?tid, remaining = self.grid.active_count(), "item retired");

        if outcome == RemoveOutcome::LevelComplete && !self.level_complete {
            self.level_complete = true;
            self.events.emit(Event::LevelCompleted { step: self.step });
            info!(step = self.step, "level complete");
        }
    }

    /// Re-check every tracked item of every trigger.
    pub fn reevaluate_all(&mut self) {
        self.step += 1;
        self.evaluate_all();
        self.events.deliver();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// A snapshot of every active collider: triggers first, then border
    /// obstacles, then item parts.
    pub fn collision_world(&self) -> CollisionWorld {
        let half_cell = self.spatial.spacing() / 2;
        let mut world = CollisionWorld::with_capacity(
            self.triggers.len() + self.obstacles.len() + self.items.len(),
        );
        for (tid, zone) in &self.triggers {
            world.add_trigger(tid, zone.bounds);
        }
        for &pos in &self.obstacles {
            let w = self.spatial.grid_to_world(pos);
            world.add_obstacle(Rect::centered(w.x, w.z, half_cell, half_cell));
        }
        for (id, item) in &self.items {
            for (part, rect) in self.part_rects(item).into_iter().enumerate() {
                world.add_part(id, part, rect);
            }
        }
        world
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn spatial(&self) -> &SpatialIndex {
        &self.spatial
    }

    pub fn occupancy(&self) -> &OccupancyGrid {
        &self.grid
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn items(&self) -> impl Iterator<Item = (ItemId, &Item)> {
        self.items.iter()
    }

    pub fn trigger(&self, id: TriggerId) -> Option<&TriggerZone> {
        self.triggers.get(id)
    }

    pub fn triggers(&self) -> impl Iterator<Item = (TriggerId, &TriggerZone)> {
        self.triggers.iter()
    }

    /// Trigger covering `pos`, if any.
    pub fn trigger_at(&self, pos: GridPosition) -> Option<TriggerId> {
        self.trigger_cells.get(&pos).copied()
    }

    pub fn obstacles(&self) -> &[GridPosition] {
        &self.obstacles
    }

    pub fn containment(&self, trigger: TriggerId, item: ItemId) -> Containment {
        self.triggers
            .get(trigger)
            .map(|z| z.tracker().state(item))
            .unwrap_or_default()
    }

    pub fn active_item_count(&self) -> usize {
        self.grid.active_count()
    }

    pub fn selected(&self) -> Option<ItemId> {
        self.drag.map(|d| d.item)
    }

    pub fn is_level_complete(&self) -> bool {
        self.level_complete
    }

    /// Number of public operations performed so far.
    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Register listeners or suppress kinds here.
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    /// Deliver any buffered events now.
    pub fn flush_events(&mut self) {
        self.events.deliver();
    }
}
