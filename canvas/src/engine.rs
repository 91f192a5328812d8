//! Viewer engine: owns the scene state and applies commands to it.
//!
//! DESIGN
//! ======
//! [`Viewer`] is the only mutator of [`ViewerState`], the picture list, and
//! the active view. It never touches a window directly; presentation,
//! visibility, title, DPI, and status messages go through the [`Shell`]
//! trait so the same engine runs headless, under a GUI host, or in tests.
//!
//! Recording lifecycle:
//!
//! ```text
//!   Idle ──beginView──▶ Recording ──endView──▶ Idle
//!                        │    ▲
//!                        └────┘ draw*, clipView, update
//! ```
//!
//! Clear and redraw are explicit snapshot → end → reset → reopen sequences,
//! so a view that was being recorded survives a scene reset.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use frames::{ErrorCode, Frame, Response};
use tiny_skia::Pixmap;
use tracing::{debug, info};

use crate::attrs::{Brush, Color, Pen};
use crate::command::{Command, CommandError, TextRequest};
use crate::consts::{DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH, MAX_DRAWS_PER_PICTURE, MIN_CANVAS_SIZE};
use crate::export::{ExportError, ExportHost, SaveRequest, Scene, export};
use crate::fonts::FontBook;
use crate::picture::{DrawError, Picture, PictureRecorder, ViewRequest};
use crate::raster::RasterSurface;
use crate::render::{Surface, paint};
use crate::symbol::Symbol;
use crate::view::{Point, Sides, ViewError, build_view};

// =============================================================================
// SHELL
// =============================================================================

/// Presentation host of a viewer.
pub trait Shell: ExportHost {
    fn set_title(&mut self, title: &str);
    fn show(&mut self);
    fn hide(&mut self);
    fn is_visible(&self) -> bool;
    /// Horizontal and vertical resolution of the display, in dots per inch.
    fn dpi(&self) -> (f64, f64);
    /// Display the composited buffer.
    fn present(&mut self, buffer: &Pixmap);
}

// =============================================================================
// ERRORS AND OUTCOMES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    View(#[from] ViewError),
    #[error(transparent)]
    Draw(#[from] DrawError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("scale factor must be a positive number, got {0}")]
    InvalidScale(f64),
    #[error("cannot allocate a {width}x{height} display buffer")]
    Buffer { width: u32, height: u32 },
}

impl ErrorCode for ViewerError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Command(e) => e.error_code(),
            Self::View(e) => e.error_code(),
            Self::Draw(e) => e.error_code(),
            Self::Export(e) => e.error_code(),
            Self::InvalidScale(_) => "E_INVALID_SCALE",
            Self::Buffer { .. } => "E_BUFFER",
        }
    }

    fn is_fatal(&self) -> bool {
        match self {
            Self::Export(e) => e.is_fatal(),
            _ => true,
        }
    }
}

/// What the run loop should do after a command.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Continue,
    Reply(Response),
    Exit,
}

// =============================================================================
// STATE
// =============================================================================

/// Scene bookkeeping, mutated only by [`Viewer`].
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerState {
    /// Canvas size in scaled device pixels.
    pub width: u32,
    pub height: u32,
    /// Canvas size at scale 1; absolute scale factors apply to this.
    pub base_width: f64,
    pub base_height: f64,
    pub scale: f64,
    pub min_size: u32,
    pub clear_color: Color,
    /// Pictures already composited into the display buffer.
    pub last_picture_drawn: usize,
    pub create_buffer: bool,
    pub clear_buffer: bool,
}

impl Default for ViewerState {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
            base_width: f64::from(DEFAULT_CANVAS_WIDTH),
            base_height: f64::from(DEFAULT_CANVAS_HEIGHT),
            scale: 1.0,
            min_size: MIN_CANVAS_SIZE,
            clear_color: Color::TRANSPARENT_WHITE,
            last_picture_drawn: 0,
            create_buffer: true,
            clear_buffer: false,
        }
    }
}

#[derive(Debug)]
struct ActiveView {
    request: ViewRequest,
    recorder: PictureRecorder,
}

// =============================================================================
// VIEWER
// =============================================================================

pub struct Viewer<S> {
    state: ViewerState,
    pictures: Vec<Picture>,
    active: Option<ActiveView>,
    buffer: Option<Pixmap>,
    fonts: FontBook,
    shell: S,
}

impl<S: Shell> Viewer<S> {
    #[must_use]
    pub fn new(shell: S, fonts: FontBook) -> Self {
        Self { state: ViewerState::default(), pictures: Vec::new(), active: None, buffer: None, fonts, shell }
    }

    // --- Queries ---

    #[must_use]
    pub fn state(&self) -> &ViewerState {
        &self.state
    }

    #[must_use]
    pub fn pictures(&self) -> &[Picture] {
        &self.pictures
    }

    /// Parameters of the active view, with its current clip flag.
    #[must_use]
    pub fn active_view(&self) -> Option<ViewRequest> {
        self.active.as_ref().map(|view| ViewRequest { clip: view.recorder.clipped(), ..view.request })
    }

    /// Primitive counter of the active view.
    #[must_use]
    pub fn active_count(&self) -> Option<usize> {
        self.active.as_ref().map(|view| view.recorder.count())
    }

    #[must_use]
    pub fn buffer(&self) -> Option<&Pixmap> {
        self.buffer.as_ref()
    }

    #[must_use]
    pub fn shell(&self) -> &S {
        &self.shell
    }

    pub fn shell_mut(&mut self) -> &mut S {
        &mut self.shell
    }

    // --- Dispatch ---

    /// Validate `frame` and apply it.
    ///
    /// # Errors
    ///
    /// Any [`ViewerError`]; check [`ErrorCode::is_fatal`] before continuing.
    pub fn dispatch(&mut self, frame: &Frame) -> Result<Outcome, ViewerError> {
        let command = Command::try_from(frame)?;
        debug!(action = command.action(), "dispatching command");
        self.execute(command)
    }

    /// Apply an already validated command.
    ///
    /// # Errors
    ///
    /// Any [`ViewerError`]; check [`ErrorCode::is_fatal`] before continuing.
    pub fn execute(&mut self, command: Command) -> Result<Outcome, ViewerError> {
        match command {
            Command::Clear { color } => self.clear(color)?,
            Command::Exit => return Ok(Outcome::Exit),
            Command::Hide => self.shell.hide(),
            Command::Show => {
                self.shell.show();
                self.refresh(true)?;
            }
            Command::Dpi => {
                let (x, y) = self.shell.dpi();
                return Ok(Outcome::Reply(Response::Dpi(x, y)));
            }
            Command::Update => self.update_scene()?,
            Command::Redraw => self.redraw()?,
            Command::Resize { width, height } => self.resize(width, height)?,
            Command::Scale { factor } => self.scale(factor)?,
            Command::Save(request) => self.save(&request)?,
            Command::SetTitle(title) => self.shell.set_title(&title),
            Command::BeginView(request) => self.begin_view(request)?,
            Command::ClipView(enabled) => self.clip_view(enabled)?,
            Command::EndView => self.end_view(true)?,
            Command::DrawMultiline { points, pen } => self.draw_multiline(&points, pen)?,
            Command::DrawPoints { points, symbol, size, color } => self.draw_points(&points, symbol, size, color)?,
            Command::DrawPolygon { points, fill, outline } => self.draw_polygon(&points, fill, outline)?,
            Command::DrawRectangle { sides, fill, outline } => self.draw_rectangle(&sides, fill, outline)?,
            Command::DrawMulticolorRectangle { sides, numrows, numcols, colors } => {
                self.draw_multicolor_rectangle(&sides, numrows, numcols, &colors)?;
            }
            Command::DrawText(request) => self.draw_text(request)?,
        }
        Ok(Outcome::Continue)
    }

    // --- View lifecycle ---

    /// Open a view, ending any active one first without a display update.
    ///
    /// # Errors
    ///
    /// [`ViewError`] when the fractions or user coordinates are invalid.
    pub fn begin_view(&mut self, request: ViewRequest) -> Result<(), ViewerError> {
        if self.active.is_some() {
            self.end_view(false)?;
        }
        let geometry = build_view(&request.frac, &request.user, self.state.width, self.state.height, self.state.scale)?;
        debug!(?request, "view opened");
        self.active = Some(ActiveView { request, recorder: PictureRecorder::new(geometry, request.clip) });
        Ok(())
    }

    /// # Errors
    ///
    /// [`DrawError::NoActiveView`] when no view is open.
    pub fn clip_view(&mut self, enabled: bool) -> Result<(), ViewerError> {
        self.recorder()?.set_clip(enabled);
        Ok(())
    }

    /// Close the active view, keeping its picture when anything was drawn.
    ///
    /// # Errors
    ///
    /// Only from the display refresh when `update` is set.
    pub fn end_view(&mut self, update: bool) -> Result<(), ViewerError> {
        let Some(view) = self.active.take() else {
            debug!("endView without an active view");
            return Ok(());
        };
        if let Some(picture) = view.recorder.finish() {
            self.pictures.push(picture);
            debug!(pictures = self.pictures.len(), "view closed");
            if update {
                self.refresh(false)?;
            }
        }
        Ok(())
    }

    /// Show everything drawn so far by cycling a non-empty active view.
    ///
    /// # Errors
    ///
    /// From the display refresh or from reopening the view.
    pub fn update_scene(&mut self) -> Result<(), ViewerError> {
        match self.active_view() {
            Some(request) if self.active_count().is_some_and(|count| count > 0) => {
                self.end_view(true)?;
                self.begin_view(request)
            }
            _ => Ok(()),
        }
    }

    // --- Scene resets ---

    /// Drop every picture and blank the display.
    ///
    /// An unusable or missing `color` keeps the previous clear colour.
    ///
    /// # Errors
    ///
    /// From the display refresh or from reopening the view.
    pub fn clear(&mut self, color: Option<Color>) -> Result<(), ViewerError> {
        let reopen = self.suspend_view()?;
        if let Some(color) = color {
            self.state.clear_color = color;
        }
        self.pictures.clear();
        self.state.clear_buffer = true;
        self.state.last_picture_drawn = 0;
        self.refresh(false)?;
        self.resume_view(reopen)
    }

    /// Recomposite every picture from the first.
    ///
    /// # Errors
    ///
    /// From the display refresh or from reopening the view.
    pub fn redraw(&mut self) -> Result<(), ViewerError> {
        let reopen = self.suspend_view()?;
        self.state.clear_buffer = true;
        self.state.last_picture_drawn = 0;
        self.refresh(false)?;
        self.resume_view(reopen)
    }

    fn suspend_view(&mut self) -> Result<Option<ViewRequest>, ViewerError> {
        let snapshot = self.active_view();
        if snapshot.is_some() {
            self.end_view(false)?;
        }
        Ok(snapshot)
    }

    fn resume_view(&mut self, snapshot: Option<ViewRequest>) -> Result<(), ViewerError> {
        match snapshot {
            Some(request) => self.begin_view(request),
            None => Ok(()),
        }
    }

    // --- Canvas size ---

    /// Resize the canvas to `width` × `height` thousandths of an inch.
    ///
    /// # Errors
    ///
    /// From the redraw that follows a size change.
    pub fn resize(&mut self, width: f64, height: f64) -> Result<(), ViewerError> {
        let (dpi_x, dpi_y) = self.shell.dpi();
        let new_width = to_pixels(width * 0.001 * dpi_x).max(self.state.min_size);
        let new_height = to_pixels(height * 0.001 * dpi_y).max(self.state.min_size);
        if (new_width, new_height) == (self.state.width, self.state.height) {
            return Ok(());
        }
        info!(width = new_width, height = new_height, "canvas resized");
        self.state.width = new_width;
        self.state.height = new_height;
        self.state.base_width = f64::from(new_width) / self.state.scale;
        self.state.base_height = f64::from(new_height) / self.state.scale;
        self.state.create_buffer = true;
        self.redraw()
    }

    /// Set the absolute scale factor of the canvas.
    ///
    /// A factor that would shrink either side below the minimum is replaced
    /// by the factor that makes the shorter side exactly the minimum.
    ///
    /// # Errors
    ///
    /// [`ViewerError::InvalidScale`] for a non-positive or non-finite factor,
    /// or from the redraw that follows a size change.
    pub fn scale(&mut self, factor: f64) -> Result<(), ViewerError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ViewerError::InvalidScale(factor));
        }
        let (base_width, base_height) = (self.state.base_width, self.state.base_height);
        let min_size = self.state.min_size;
        let mut factor = factor;
        let (mut new_width, mut new_height) = (to_pixels(factor * base_width), to_pixels(factor * base_height));
        if new_width < min_size || new_height < min_size {
            factor = f64::from(min_size) / base_width.min(base_height);
            (new_width, new_height) = (to_pixels(factor * base_width), to_pixels(factor * base_height));
        }
        if (new_width, new_height) == (self.state.width, self.state.height) {
            return Ok(());
        }
        info!(factor, width = new_width, height = new_height, "canvas scaled");
        self.state.scale = factor;
        self.state.width = new_width;
        self.state.height = new_height;
        self.state.create_buffer = true;
        self.redraw()
    }

    // --- Output ---

    /// Export the finalized pictures.
    ///
    /// # Errors
    ///
    /// [`ExportError`], which is not fatal to the viewer.
    pub fn save(&mut self, request: &SaveRequest) -> Result<(), ViewerError> {
        let scene = Scene {
            pictures: &self.pictures,
            width: self.state.width,
            height: self.state.height,
            scale: self.state.scale,
            clear_color: self.state.clear_color,
            dpi: self.shell.dpi(),
        };
        export(&scene, request, false, &self.fonts, &mut self.shell)?;
        Ok(())
    }

    /// Bring the display buffer up to date with the picture list.
    ///
    /// Skipped while the shell is hidden unless `force` is set.
    ///
    /// # Errors
    ///
    /// [`ViewerError::Buffer`] when the display buffer cannot be allocated.
    pub fn refresh(&mut self, force: bool) -> Result<(), ViewerError> {
        if !force && !self.shell.is_visible() {
            debug!("refresh skipped while hidden");
            return Ok(());
        }
        let mut first = self.state.last_picture_drawn;
        let buffer = match self.buffer.take() {
            Some(buffer) if !self.state.create_buffer => buffer,
            _ => {
                let (width, height) = (self.state.width, self.state.height);
                let buffer = Pixmap::new(width, height).ok_or(ViewerError::Buffer { width, height })?;
                debug!(width, height, "display buffer created");
                self.state.create_buffer = false;
                self.state.clear_buffer = true;
                first = 0;
                buffer
            }
        };
        let buffer = self.buffer.insert(buffer);
        let mut surface = RasterSurface::new(buffer, &self.fonts);
        if self.state.clear_buffer {
            surface.fill(self.state.clear_color);
            self.state.clear_buffer = false;
        } else if self.pictures.len() <= first {
            return Ok(());
        }
        if self.pictures.len() > first {
            paint(&mut surface, &self.pictures, first, 0.0, 0.0, self.state.scale, "Drawing", &mut self.shell);
        }
        self.state.last_picture_drawn = self.pictures.len();
        self.shell.present(buffer);
        Ok(())
    }

    // --- Drawing ---

    fn recorder(&mut self) -> Result<&mut PictureRecorder, DrawError> {
        self.active.as_mut().map(|view| &mut view.recorder).ok_or(DrawError::NoActiveView)
    }

    fn after_draw(&mut self) -> Result<(), ViewerError> {
        if self.active_count().is_some_and(|count| count >= MAX_DRAWS_PER_PICTURE) {
            debug!("primitive ceiling reached, updating scene");
            self.update_scene()?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// [`DrawError`] when no view is open or fewer than two points are given.
    pub fn draw_multiline(&mut self, points: &[Point], pen: Pen) -> Result<(), ViewerError> {
        self.recorder()?.draw_multiline(points, pen)?;
        self.after_draw()
    }

    /// # Errors
    ///
    /// [`DrawError::NoActiveView`] when no view is open.
    pub fn draw_points(&mut self, points: &[Point], symbol: Symbol, size: f64, color: Color) -> Result<(), ViewerError> {
        self.recorder()?.draw_points(points, symbol, size, color);
        self.after_draw()
    }

    /// # Errors
    ///
    /// [`DrawError`] when no view is open or neither fill nor outline is given.
    pub fn draw_polygon(&mut self, points: &[Point], fill: Option<Brush>, outline: Option<Pen>) -> Result<(), ViewerError> {
        self.recorder()?.draw_polygon(points, fill, outline)?;
        self.after_draw()
    }

    /// # Errors
    ///
    /// [`DrawError`] when no view is open or the sides are inverted.
    pub fn draw_rectangle(&mut self, sides: &Sides, fill: Option<Brush>, outline: Option<Pen>) -> Result<(), ViewerError> {
        self.recorder()?.draw_rectangle(sides, fill, outline)?;
        self.after_draw()
    }

    /// # Errors
    ///
    /// [`DrawError`] for a missing view, bad sides, bad grid, or too few
    /// colours; nothing is drawn on error.
    pub fn draw_multicolor_rectangle(
        &mut self,
        sides: &Sides,
        numrows: f64,
        numcols: f64,
        colors: &[Color],
    ) -> Result<(), ViewerError> {
        self.recorder()?.draw_multicolor_rectangle(sides, numrows, numcols, colors)?;
        self.after_draw()
    }

    /// # Errors
    ///
    /// [`DrawError::NoActiveView`] when no view is open.
    pub fn draw_text(&mut self, request: TextRequest) -> Result<(), ViewerError> {
        let TextRequest { text, font, pen, rotate, location } = request;
        self.recorder()?.draw_text(&text, font, pen, rotate, location);
        self.after_draw()
    }
}

/// Round a non-negative pixel count the way the canvas size is rounded.
fn to_pixels(value: f64) -> u32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let pixels = (value + 0.5).floor().clamp(0.0, f64::from(u32::MAX)) as u32;
    pixels
}
