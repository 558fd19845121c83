//! Dirty-region renderer.
//!
//! Painting runs in three passes:
//!
//! 1. **Static layer** - grid lines, generated as a cached tile keyed by
//!    `(scale, width, height)`. Panning only moves the tile.
//! 2. **Scene layer** - connections, then nodes in ascending z.
//! 3. **Overlay layer** - selection glow, alignment guides, marquee and the
//!    in-progress connection preview. Never cached.
//!
//! Between frames the renderer accumulates a scene-space dirty rectangle from
//! published [`ChangeBatch`]es and clips the next paint to it. Anything it
//! cannot account for (first frame, viewport change, non-finite damage)
//! degrades to a full repaint.

use slint::{Color, SharedString};
use tracing::{debug, trace, warn};

use crate::alignment::Guide;
use crate::config::CanvasConfig;
use crate::events::ChangeBatch;
use crate::geometry::{Point, Rect, Size};
use crate::graph::{Node, SceneGraph};
use crate::grid::{generate_grid_commands, grid_tile_offset};
use crate::path::{generate_line_path, ARROW_HEAD_LENGTH};
use crate::shape::ShapeKind;
use crate::viewport::Viewport;

/// Selection glow distance outside the node, in scene units. Kept below the
/// default dirty padding so a glow never outlives its damage rectangle.
const GLOW_OFFSET: f32 = 1.5;

const GRID_STROKE_WIDTH: f32 = 1.0;
const NODE_STROKE_WIDTH: f32 = 1.5;
const CONNECTION_STROKE_WIDTH: f32 = 2.0;
const GUIDE_STROKE_WIDTH: f32 = 1.0;

/// Fixed colours. The static layer takes no styling from outside.
mod palette {
    use slint::Color;

    pub fn grid() -> Color {
        Color::from_argb_u8(40, 255, 255, 255)
    }
    pub fn node_stroke() -> Color {
        Color::from_rgb_u8(90, 90, 110)
    }
    pub fn process() -> Color {
        Color::from_rgb_u8(58, 66, 84)
    }
    pub fn terminal() -> Color {
        Color::from_rgb_u8(52, 92, 74)
    }
    pub fn connector() -> Color {
        Color::from_rgb_u8(84, 76, 110)
    }
    pub fn merge() -> Color {
        Color::from_rgb_u8(104, 78, 62)
    }
    pub fn decision() -> Color {
        Color::from_rgb_u8(110, 92, 48)
    }
    pub fn preparation() -> Color {
        Color::from_rgb_u8(60, 88, 104)
    }
    pub fn text() -> Color {
        Color::from_rgb_u8(230, 230, 235)
    }
    pub fn connection() -> Color {
        Color::from_rgb_u8(160, 160, 175)
    }
    pub fn selection_glow() -> Color {
        Color::from_rgb_u8(255, 165, 0)
    }
    pub fn guide() -> Color {
        Color::from_rgb_u8(255, 64, 129)
    }
    pub fn marquee_fill() -> Color {
        Color::from_argb_u8(40, 100, 150, 255)
    }
    pub fn marquee_stroke() -> Color {
        Color::from_rgb_u8(100, 150, 255)
    }
    pub fn preview() -> Color {
        Color::from_rgb_u8(255, 165, 0)
    }
    pub fn transparent() -> Color {
        Color::from_argb_u8(0, 0, 0, 0)
    }
}

// ============================================================================
// Surface
// ============================================================================

/// Paint pass a command belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Static,
    Scene,
    Overlay,
}

/// Drawing backend. All coordinates are screen pixels.
pub trait Surface {
    /// Marks the start of a paint pass.
    fn begin_layer(&mut self, _layer: Layer) {}

    /// Restrict following draws to `clip`; `None` means the whole surface.
    fn set_clip(&mut self, clip: Option<Rect>);

    /// Draw the cached grid tile shifted by `offset`.
    fn draw_grid(&mut self, tile: &SharedString, offset: Point, color: Color, stroke_width: f32);

    fn fill_path(&mut self, commands: &str, fill: Color, stroke: Color, stroke_width: f32);

    fn stroke_path(&mut self, commands: &str, color: Color, width: f32, dashed: bool);

    fn draw_text(&mut self, text: &str, bounds: Rect, color: Color);
}

/// One recorded drawing operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Layer(Layer),
    Clip(Option<Rect>),
    Grid {
        commands: SharedString,
        offset: Point,
        color: Color,
        stroke_width: f32,
    },
    Fill {
        commands: SharedString,
        fill: Color,
        stroke: Color,
        stroke_width: f32,
    },
    Stroke {
        commands: SharedString,
        color: Color,
        width: f32,
        dashed: bool,
    },
    Text {
        text: SharedString,
        bounds: Rect,
        color: Color,
    },
}

/// A [`Surface`] that records commands, ready to be bound to Slint `Path`
/// and `Text` elements by the host.
#[derive(Debug, Default)]
pub struct FrameRecorder {
    commands: Vec<DrawCommand>,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Take the recorded commands, leaving the recorder empty.
    pub fn take(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Text strings drawn, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Commands recorded after the start of `layer`, up to the next layer.
    pub fn layer(&self, layer: Layer) -> &[DrawCommand] {
        let Some(start) = self
            .commands
            .iter()
            .position(|c| *c == DrawCommand::Layer(layer))
        else {
            return &[];
        };
        let rest = &self.commands[start + 1..];
        let end = rest
            .iter()
            .position(|c| matches!(c, DrawCommand::Layer(_)))
            .unwrap_or(rest.len());
        &rest[..end]
    }
}

impl Surface for FrameRecorder {
    fn begin_layer(&mut self, layer: Layer) {
        self.commands.push(DrawCommand::Layer(layer));
    }

    fn set_clip(&mut self, clip: Option<Rect>) {
        self.commands.push(DrawCommand::Clip(clip));
    }

    fn draw_grid(&mut self, tile: &SharedString, offset: Point, color: Color, stroke_width: f32) {
        self.commands.push(DrawCommand::Grid {
            commands: tile.clone(),
            offset,
            color,
            stroke_width,
        });
    }

    fn fill_path(&mut self, commands: &str, fill: Color, stroke: Color, stroke_width: f32) {
        self.commands.push(DrawCommand::Fill {
            commands: commands.into(),
            fill,
            stroke,
            stroke_width,
        });
    }

    fn stroke_path(&mut self, commands: &str, color: Color, width: f32, dashed: bool) {
        self.commands.push(DrawCommand::Stroke {
            commands: commands.into(),
            color,
            width,
            dashed,
        });
    }

    fn draw_text(&mut self, text: &str, bounds: Rect, color: Color) {
        self.commands.push(DrawCommand::Text {
            text: text.into(),
            bounds,
            color,
        });
    }
}

// ============================================================================
// Overlay
// ============================================================================

/// Transient items painted above the scene. Scene-space coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    pub marquee: Option<Rect>,
    pub connection_preview: Option<(Point, Point)>,
    pub guides: Vec<Guide>,
}

impl Overlay {
    pub fn is_empty(&self) -> bool {
        self.marquee.is_none() && self.connection_preview.is_none() && self.guides.is_empty()
    }

    /// Union of every overlay item, or `None` when there is nothing to draw.
    ///
    /// The preview rect grows by the arrow head drawn at its end.
    pub fn bounds(&self) -> Option<Rect> {
        let marquee = self.marquee;
        let preview = self
            .connection_preview
            .map(|(a, b)| Rect::from_points(a, b).inflate(ARROW_HEAD_LENGTH));
        let guides = self.guides.iter().map(Guide::bounds);
        marquee
            .into_iter()
            .chain(preview)
            .chain(guides)
            .reduce(|acc, r| acc.union(&r))
    }
}

// ============================================================================
// Renderer
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderState {
    #[default]
    Idle,
    Dirty,
    Painting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct GridKey {
    scale: f32,
    size: Size,
}

/// Cached static layer.
#[derive(Debug, Clone)]
struct GridLayer {
    key: GridKey,
    commands: SharedString,
}

/// What a call to [`Renderer::paint`] did.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PaintReport {
    /// False when there was nothing to repaint.
    pub painted: bool,
    pub full: bool,
    /// Screen-space clip, `None` for a full repaint.
    pub clip: Option<Rect>,
    /// The scene-space region that was repainted.
    pub scene_clip: Option<Rect>,
    pub nodes: usize,
    pub connections: usize,
    pub grid_regenerated: bool,
}

#[derive(Debug)]
pub struct Renderer {
    state: RenderState,
    dirty: Option<Rect>,
    full_repaint: bool,
    padding: f32,
    grid_spacing: f32,
    grid: Option<GridLayer>,
    grid_generations: u64,
    frames: u64,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(&CanvasConfig::default())
    }
}

impl Renderer {
    pub fn new(config: &CanvasConfig) -> Self {
        Self {
            state: RenderState::Idle,
            dirty: None,
            full_repaint: true,
            padding: config.dirty_padding,
            grid_spacing: config.grid_spacing,
            grid: None,
            grid_generations: 0,
            frames: 0,
        }
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    /// Pending scene-space dirty rectangle (padded).
    pub fn dirty_region(&self) -> Option<Rect> {
        self.dirty
    }

    pub fn needs_full_repaint(&self) -> bool {
        self.full_repaint
    }

    pub fn needs_paint(&self) -> bool {
        self.full_repaint || self.dirty.is_some()
    }

    /// Number of times the grid tile has been generated.
    pub fn grid_generations(&self) -> u64 {
        self.grid_generations
    }

    pub fn frames_painted(&self) -> u64 {
        self.frames
    }

    /// Union `rect`, padded, into the dirty region.
    pub fn invalidate(&mut self, rect: Rect) {
        if !rect.is_finite() {
            warn!(?rect, "non-finite damage, falling back to a full repaint");
            self.invalidate_all();
            return;
        }
        let padded = rect.inflate(self.padding);
        self.dirty = Some(match self.dirty {
            Some(d) => d.union(&padded),
            None => padded,
        });
        self.state = RenderState::Dirty;
    }

    /// Mark the whole surface dirty.
    pub fn invalidate_all(&mut self) {
        self.full_repaint = true;
        self.state = RenderState::Dirty;
    }

    /// Drop the cached grid tile; the next paint regenerates it.
    pub fn invalidate_static_layer(&mut self) {
        self.grid = None;
        self.invalidate_all();
    }

    /// Fold a published batch into the pending repaint.
    pub fn apply(&mut self, batch: &ChangeBatch) {
        if batch.static_layer {
            self.invalidate_static_layer();
        }
        if batch.viewport {
            self.invalidate_all();
        }
        for rect in &batch.damage {
            self.invalidate(*rect);
        }
        let flagged = batch.scene || batch.selection || batch.overlay;
        if flagged && batch.damage.is_empty() {
            debug!("change without damage, repainting everything");
            self.invalidate_all();
        }
    }

    /// Paint one frame onto `surface`.
    pub fn paint<S>(&mut self, graph: &SceneGraph, viewport: &Viewport, overlay: &Overlay, surface: &mut S) -> PaintReport
    where
        S: Surface + ?Sized,
    {
        let transform = viewport.transform();
        let key = GridKey { scale: transform.scale, size: viewport.size() };
        let grid_stale = self.grid.as_ref().map_or(true, |g| g.key != key);
        let full = self.full_repaint || self.frames == 0 || grid_stale;

        if !full && self.dirty.is_none() {
            trace!("nothing to paint");
            return PaintReport::default();
        }

        self.state = RenderState::Painting;
        let mut report = PaintReport { painted: true, full, ..PaintReport::default() };

        if grid_stale {
            let commands = generate_grid_commands(key.size, key.scale, self.grid_spacing);
            self.grid = Some(GridLayer { key, commands: commands.into() });
            self.grid_generations += 1;
            report.grid_regenerated = true;
            debug!(scale = key.scale, width = key.size.width, height = key.size.height, "grid layer regenerated");
        }

        let visible = viewport.visible_scene_rect();
        let scene_clip = if full {
            Some(visible)
        } else {
            self.dirty.and_then(|d| d.intersection(&visible))
        };

        if let Some(scene_clip) = scene_clip {
            let clip = (!full).then(|| transform.scene_rect_to_screen(scene_clip));
            report.clip = clip;
            report.scene_clip = Some(scene_clip);

            surface.begin_layer(Layer::Static);
            surface.set_clip(clip);
            if let Some(grid) = &self.grid {
                if !grid.commands.is_empty() {
                    let offset = grid_tile_offset(transform.screen_offset(), transform.scale, self.grid_spacing);
                    surface.draw_grid(&grid.commands, offset, palette::grid(), GRID_STROKE_WIDTH);
                }
            }

            surface.begin_layer(Layer::Scene);
            let (connections, nodes) = paint_scene(graph, viewport, scene_clip, surface);
            report.connections = connections;
            report.nodes = nodes;

            surface.begin_layer(Layer::Overlay);
            paint_overlay(graph, viewport, overlay, scene_clip, surface);
        } else {
            trace!("dirty region is off screen");
        }

        self.dirty = None;
        self.full_repaint = false;
        self.frames += 1;
        self.state = RenderState::Idle;
        trace!(full, nodes = report.nodes, connections = report.connections, "frame painted");
        report
    }
}

fn paint_scene<S>(graph: &SceneGraph, viewport: &Viewport, clip: Rect, surface: &mut S) -> (usize, usize)
where
    S: Surface + ?Sized,
{
    let transform = viewport.transform();

    let connection_ids = graph.connections_in_rect(clip);
    let mut connections = 0;
    for id in &connection_ids {
        let Some(geometry) = graph.connection_geometry(*id) else {
            continue;
        };
        let screen = geometry.map(|p| transform.scene_to_screen(p));
        surface.stroke_path(
            &screen.path_commands(),
            palette::connection(),
            CONNECTION_STROKE_WIDTH * transform.scale,
            screen.style.is_dashed(),
        );
        if let Some(head) = screen.arrow_head_commands(transform.scale) {
            surface.fill_path(&head, palette::connection(), palette::connection(), 0.0);
        }
        connections += 1;
    }

    let node_ids = graph.nodes_in_rect(clip);
    let mut nodes = 0;
    for id in &node_ids {
        if let Some(node) = graph.node(*id) {
            paint_node(node, transform.scene_rect_to_screen(node.rect()), transform.scale, surface);
            nodes += 1;
        }
    }
    (connections, nodes)
}

fn paint_node<S>(node: &Node, rect: Rect, scale: f32, surface: &mut S)
where
    S: Surface + ?Sized,
{
    let fill = match node.kind {
        ShapeKind::RoundedRect | ShapeKind::Rect => Some(palette::process()),
        ShapeKind::Pill => Some(palette::terminal()),
        ShapeKind::Circle => Some(palette::connector()),
        ShapeKind::Triangle => Some(palette::merge()),
        ShapeKind::Diamond => Some(palette::decision()),
        ShapeKind::Hexagon => Some(palette::preparation()),
        ShapeKind::Text => None,
    };
    if let Some(fill) = fill {
        surface.fill_path(
            &node.kind.outline_commands(rect, scale),
            fill,
            palette::node_stroke(),
            NODE_STROKE_WIDTH,
        );
    }
    if !node.content.is_empty() {
        surface.draw_text(&node.content, rect, palette::text());
    }
}

fn paint_overlay<S>(graph: &SceneGraph, viewport: &Viewport, overlay: &Overlay, clip: Rect, surface: &mut S)
where
    S: Surface + ?Sized,
{
    let transform = viewport.transform();

    for id in graph.selection() {
        let Some(node) = graph.node(*id) else {
            continue;
        };
        let glow = node.rect().inflate(GLOW_OFFSET);
        if !glow.intersects(&clip) {
            continue;
        }
        let commands = node
            .kind
            .outline_commands(transform.scene_rect_to_screen(glow), transform.scale);
        let commands = if commands.is_empty() {
            ShapeKind::Rect.outline_commands(transform.scene_rect_to_screen(glow), transform.scale)
        } else {
            commands
        };
        surface.stroke_path(&commands, palette::selection_glow(), 2.0, false);
    }

    for guide in &overlay.guides {
        let from = transform.scene_to_screen(guide.from);
        let to = transform.scene_to_screen(guide.to);
        surface.stroke_path(&generate_line_path(from, to), palette::guide(), GUIDE_STROKE_WIDTH, true);
    }

    if let Some(marquee) = overlay.marquee {
        let rect = transform.scene_rect_to_screen(marquee);
        surface.fill_path(
            &ShapeKind::Rect.outline_commands(rect, transform.scale),
            palette::marquee_fill(),
            palette::marquee_stroke(),
            1.0,
        );
    }

    if let Some((from, to)) = overlay.connection_preview {
        let from = transform.scene_to_screen(from);
        let to = transform.scene_to_screen(to);
        surface.stroke_path(&generate_line_path(from, to), palette::preview(), CONNECTION_STROKE_WIDTH, false);
        surface.fill_path(
            &crate::path::arrow_head_commands(from, to, transform.scale),
            palette::preview(),
            palette::transparent(),
            0.0,
        );
    }
}
