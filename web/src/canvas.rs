use scratchy_core::{CoverSurface, CoverageTracker, Stroke, SurfaceGeometry, SurfaceSize};
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

const COVER_RGBA: [u8; 4] = [0xb8, 0xb8, 0xc0, 0xff];
const COVER_CSS: &str = "rgb(184, 184, 192)";
const MIN_CSS_HEIGHT: f64 = 160.;
const ASPECT_RATIO: f64 = 2. / 3.;

/// The opaque cover drawn over the prize grid.
#[derive(Debug)]
pub(crate) struct CanvasCover {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl CanvasCover {
    pub(crate) fn new(canvas: HtmlCanvasElement) -> Option<Self> {
        let context = canvas
            .get_context("2d")
            .ok()
            .flatten()?
            .dyn_into::<CanvasRenderingContext2d>()
            .ok()?;
        Some(Self { canvas, context })
    }

    pub(crate) fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    pub(crate) fn backing_size(&self) -> SurfaceSize {
        (self.canvas.width(), self.canvas.height())
    }

    /// Fit the canvas to its container, the backing store follows the device pixel ratio.
    pub(crate) fn fit_to_container(&self) -> SurfaceSize {
        let css_width = self
            .canvas
            .parent_element()
            .map_or(0, |parent| parent.client_width()) as f64;
        let css_height = (css_width * ASPECT_RATIO).round().max(MIN_CSS_HEIGHT);
        let dpr = gloo::utils::window().device_pixel_ratio().max(1.);

        let style = self.canvas.style();
        for (name, value) in [("width", css_width), ("height", css_height)] {
            if let Err(err) = style.set_property(name, &format!("{}px", value)) {
                log::error!("failed to size canvas: {:?}", err);
            }
        }
        self.canvas.set_width((css_width * dpr).round() as u32);
        self.canvas.set_height((css_height * dpr).round() as u32);
        self.backing_size()
    }

    pub(crate) fn geometry(&self) -> SurfaceGeometry {
        let rect = self.canvas.get_bounding_client_rect();
        SurfaceGeometry::new(
            rect.left(),
            rect.top(),
            rect.width(),
            rect.height(),
            self.backing_size(),
        )
    }

    /// Redraw the cover so it matches the erased pixels of `tracker`.
    pub(crate) fn paint_from(&mut self, tracker: &CoverageTracker) {
        let (width, height) = tracker.size();
        if width == 0 || height == 0 {
            return;
        }

        let mut data = vec![0u8; width as usize * height as usize * 4];
        for (i, pixel) in data.chunks_exact_mut(4).enumerate() {
            let x = (i % width as usize) as u32;
            let y = (i / width as usize) as u32;
            if !tracker.is_erased((x, y)) {
                pixel.copy_from_slice(&COVER_RGBA);
            }
        }

        let image = ImageData::new_with_u8_clamped_array_and_sh(Clamped(data.as_slice()), width, height);
        match image {
            Ok(image) => {
                if let Err(err) = self.context.put_image_data(&image, 0., 0.) {
                    log::error!("failed to paint cover: {:?}", err);
                }
            }
            Err(err) => log::error!("failed to build cover image: {:?}", err),
        }
    }

    fn full_rect(&self) -> (f64, f64, f64, f64) {
        (
            0.,
            0.,
            self.canvas.width() as f64,
            self.canvas.height() as f64,
        )
    }
}

impl CoverSurface for CanvasCover {
    fn erase(&mut self, stroke: Stroke) {
        let ctx = &self.context;
        if let Err(err) = ctx.set_global_composite_operation("destination-out") {
            log::error!("failed to set composite operation: {:?}", err);
            return;
        }
        ctx.begin_path();
        match ctx.arc(stroke.x, stroke.y, stroke.radius, 0., std::f64::consts::TAU) {
            Ok(()) => ctx.fill(),
            Err(err) => log::error!("failed to erase {:?}: {:?}", stroke, err),
        }
    }

    fn clear_all(&mut self) {
        let (x, y, w, h) = self.full_rect();
        self.context.clear_rect(x, y, w, h);
    }

    fn restore(&mut self) {
        let (x, y, w, h) = self.full_rect();
        if let Err(err) = self.context.set_global_composite_operation("source-over") {
            log::error!("failed to set composite operation: {:?}", err);
        }
        self.context.set_fill_style_str(COVER_CSS);
        self.context.fill_rect(x, y, w, h);
    }
}
