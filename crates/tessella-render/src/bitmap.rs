//! Bitmap surface
//!
//! A clonable handle over a tiny-skia pixel surface with a load lifecycle.
//! The tile compositor and sprites draw through this type; the caches see
//! it through the `ImageResource` trait. Draw calls are counted so callers
//! can verify repaint suppression.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tessella_cache::{ImageResource, WeakCacheEntry};
use tiny_skia::{
    BlendMode, FillRule, IntRect, Paint, PathBuilder, Pixmap, PixmapPaint,
    Transform,
};

use crate::{Color, Rect};

/// Load lifecycle of a bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Constructed surface, immediately usable
    Blank,
    /// Deferred request; no load has started (weak, always purgeable)
    Requested,
    /// Load in flight
    Loading,
    /// Loaded and usable
    Ready,
    /// Load failed permanently
    Error,
}

type LoadListener = Box<dyn FnOnce(&Bitmap)>;

pub(crate) struct BitmapData {
    pixmap: Option<Pixmap>,
    state: LoadState,
    url: String,
    smooth: bool,
    load_listeners: Vec<LoadListener>,
    cache_entry: Option<WeakCacheEntry<Bitmap>>,
    blits: u64,
    fills: u64,
}

/// Non-owning bitmap handle used by the loader's stale-completion guard
pub(crate) type WeakBitmap = Weak<RefCell<BitmapData>>;

/// Shared pixel surface handle. Clones alias the same surface.
pub struct Bitmap {
    data: Rc<RefCell<BitmapData>>,
}

impl Clone for Bitmap {
    fn clone(&self) -> Self {
        Self { data: Rc::clone(&self.data) }
    }
}

impl Bitmap {
    fn with_state(pixmap: Option<Pixmap>, state: LoadState, url: &str) -> Self {
        Self {
            data: Rc::new(RefCell::new(BitmapData {
                pixmap,
                state,
                url: url.to_string(),
                smooth: false,
                load_listeners: Vec::new(),
                cache_entry: None,
                blits: 0,
                fills: 0,
            })),
        }
    }

    /// Blank transparent surface, ready to draw on
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_state(Pixmap::new(width, height), LoadState::Blank, "")
    }

    /// Placeholder for a deferred request; carries no pixels until some
    /// later load promotes it
    pub fn request(url: &str) -> Self {
        Self::with_state(None, LoadState::Requested, url)
    }

    /// Placeholder for a load already in flight
    pub fn loading(url: &str) -> Self {
        Self::with_state(None, LoadState::Loading, url)
    }

    pub fn state(&self) -> LoadState {
        self.data.borrow().state
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state(), LoadState::Blank | LoadState::Ready)
    }

    pub fn is_error(&self) -> bool {
        self.state() == LoadState::Error
    }

    pub fn is_request_only(&self) -> bool {
        self.state() == LoadState::Requested
    }

    pub fn url(&self) -> String {
        self.data.borrow().url.clone()
    }

    pub fn width(&self) -> u32 {
        self.data
            .borrow()
            .pixmap
            .as_ref()
            .map_or(0, |p| p.width())
    }

    pub fn height(&self) -> u32 {
        self.data
            .borrow()
            .pixmap
            .as_ref()
            .map_or(0, |p| p.height())
    }

    pub fn smooth(&self) -> bool {
        self.data.borrow().smooth
    }

    pub fn set_smooth(&self, smooth: bool) {
        self.data.borrow_mut().smooth = smooth;
    }

    /// Promote a deferred request to an in-flight load
    pub fn start_loading(&self) {
        let mut data = self.data.borrow_mut();
        if data.state == LoadState::Requested {
            data.state = LoadState::Loading;
        }
    }

    /// Complete a load with decoded pixels and drain the listener queue
    pub fn finish_load(&self, pixmap: Pixmap) {
        let listeners = {
            let mut data = self.data.borrow_mut();
            data.pixmap = Some(pixmap);
            data.state = LoadState::Ready;
            std::mem::take(&mut data.load_listeners)
        };
        for listener in listeners {
            listener(self);
        }
    }

    /// Mark the load as permanently failed
    pub fn fail_load(&self) {
        let mut data = self.data.borrow_mut();
        data.state = LoadState::Error;
        data.load_listeners.clear();
    }

    /// Register a one-shot callback for load completion. Fires immediately
    /// if the bitmap is already usable; otherwise queued FIFO.
    pub fn add_load_listener(&self, listener: impl FnOnce(&Bitmap) + 'static) {
        if self.is_ready() {
            listener(self);
        } else {
            self.data.borrow_mut().load_listeners.push(Box::new(listener));
        }
    }

    /// Tie this bitmap to its cache entry so `touch` refreshes TTL
    pub fn attach_cache_entry(&self, entry: WeakCacheEntry<Bitmap>) {
        self.data.borrow_mut().cache_entry = Some(entry);
    }

    /// Liveness ping forwarded to the attached cache entry, if any
    pub fn touch(&self) {
        let entry = self.data.borrow().cache_entry.clone();
        if let Some(entry) = entry.and_then(|e| e.upgrade()) {
            entry.touch();
        }
    }

    pub(crate) fn downgrade(&self) -> WeakBitmap {
        Rc::downgrade(&self.data)
    }

    pub(crate) fn upgrade(weak: &WeakBitmap) -> Option<Bitmap> {
        weak.upgrade().map(|data| Bitmap { data })
    }

    pub fn ptr_eq(&self, other: &Bitmap) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }

    // --- draw primitives ---

    /// 1:1 blit of a source rectangle onto this surface. Out-of-bounds
    /// source rects and unloaded sources are skipped silently. Self-blits
    /// are safe (the source region is copied out first).
    pub fn blt(
        &self,
        source: &Bitmap,
        sx: i32,
        sy: i32,
        sw: u32,
        sh: u32,
        dx: i32,
        dy: i32,
    ) {
        self.draw_with_opacity(source, sx, sy, sw, sh, dx, dy, 1.0);
    }

    /// Blit with an opacity multiplier (0.0 ..= 1.0)
    #[allow(clippy::too_many_arguments)]
    pub fn draw_with_opacity(
        &self,
        source: &Bitmap,
        sx: i32,
        sy: i32,
        sw: u32,
        sh: u32,
        dx: i32,
        dy: i32,
        opacity: f32,
    ) {
        if sw == 0 || sh == 0 || !source.is_ready() {
            return;
        }
        let Some(rect) = IntRect::from_xywh(sx, sy, sw, sh) else {
            return;
        };
        // Copy out first so blitting a bitmap onto itself stays sound
        let region = {
            let src = source.data.borrow();
            src.pixmap.as_ref().and_then(|p| p.as_ref().clone_rect(rect))
        };
        let Some(region) = region else {
            return;
        };
        let mut data = self.data.borrow_mut();
        let Some(pixmap) = data.pixmap.as_mut() else {
            return;
        };
        let paint = PixmapPaint {
            opacity,
            ..PixmapPaint::default()
        };
        pixmap.draw_pixmap(dx, dy, region.as_ref(), &paint, Transform::identity(), None);
        data.blits += 1;
    }

    /// Fill a rectangle with a solid color, source-over
    pub fn fill_rect(&self, x: i32, y: i32, w: u32, h: u32, color: Color) {
        self.fill_rect_blend(x, y, w, h, color, BlendMode::SourceOver);
    }

    /// Reset a rectangle to fully transparent
    pub fn clear_rect(&self, x: i32, y: i32, w: u32, h: u32) {
        self.fill_rect_blend(x, y, w, h, Color::TRANSPARENT, BlendMode::Clear);
    }

    /// Reset the whole surface to fully transparent
    pub fn clear(&self) {
        let mut data = self.data.borrow_mut();
        if let Some(pixmap) = data.pixmap.as_mut() {
            pixmap.fill(tiny_skia::Color::TRANSPARENT);
            data.fills += 1;
        }
    }

    /// Flood the whole surface with a color
    pub fn fill_all(&self, color: Color) {
        let mut data = self.data.borrow_mut();
        if let Some(pixmap) = data.pixmap.as_mut() {
            pixmap.fill(
                tiny_skia::Color::from_rgba8(color.r, color.g, color.b, color.a),
            );
            data.fills += 1;
        }
    }

    fn fill_rect_blend(
        &self,
        x: i32,
        y: i32,
        w: u32,
        h: u32,
        color: Color,
        blend_mode: BlendMode,
    ) {
        if w == 0 || h == 0 {
            return;
        }
        let Some(rect) =
            tiny_skia::Rect::from_xywh(x as f32, y as f32, w as f32, h as f32)
        else {
            return;
        };
        let mut data = self.data.borrow_mut();
        let Some(pixmap) = data.pixmap.as_mut() else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);
        paint.blend_mode = blend_mode;
        paint.anti_alias = false;
        pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        data.fills += 1;
    }

    /// Fill a circle; used for procedural particle bitmaps
    pub fn draw_circle(&self, cx: f32, cy: f32, radius: f32, color: Color) {
        let mut builder = PathBuilder::new();
        builder.push_circle(cx, cy, radius);
        let Some(path) = builder.finish() else {
            return;
        };
        let mut data = self.data.borrow_mut();
        let Some(pixmap) = data.pixmap.as_mut() else {
            return;
        };
        let mut paint = Paint::default();
        paint.set_color_rgba8(color.r, color.g, color.b, color.a);
        paint.anti_alias = true;
        pixmap.fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
        data.fills += 1;
    }

    /// Read back a pixel, straight alpha. Transparent for out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        let data = self.data.borrow();
        let Some(pixmap) = data.pixmap.as_ref() else {
            return Color::TRANSPARENT;
        };
        match pixmap.pixel(x, y) {
            Some(p) => {
                let c = p.demultiply();
                Color::rgba(c.red(), c.green(), c.blue(), c.alpha())
            }
            None => Color::TRANSPARENT,
        }
    }

    pub(crate) fn with_pixmap_mut<R>(
        &self,
        f: impl FnOnce(&mut Pixmap) -> R,
    ) -> Option<R> {
        let mut data = self.data.borrow_mut();
        data.pixmap.as_mut().map(f)
    }

    /// Number of blit draw calls issued against this surface
    pub fn blit_count(&self) -> u64 {
        self.data.borrow().blits
    }

    /// Number of fill draw calls issued against this surface
    pub fn fill_count(&self) -> u64 {
        self.data.borrow().fills
    }

    /// Extract the current frame rectangle as a standalone bitmap
    pub fn clone_region(&self, frame: Rect) -> Option<Bitmap> {
        let rect = IntRect::from_xywh(frame.x, frame.y, frame.width, frame.height)?;
        let data = self.data.borrow();
        let region = data.pixmap.as_ref()?.as_ref().clone_rect(rect)?;
        Some(Bitmap::with_state(Some(region), LoadState::Blank, ""))
    }
}

impl ImageResource for Bitmap {
    fn is_ready(&self) -> bool {
        Bitmap::is_ready(self)
    }

    fn is_error(&self) -> bool {
        Bitmap::is_error(self)
    }

    fn is_request_only(&self) -> bool {
        Bitmap::is_request_only(self)
    }

    fn width(&self) -> u32 {
        Bitmap::width(self)
    }

    fn height(&self) -> u32 {
        Bitmap::height(self)
    }

    fn touch(&self) {
        Bitmap::touch(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_blank_bitmap_is_ready() {
        let bitmap = Bitmap::new(4, 4);
        assert!(bitmap.is_ready());
        assert_eq!(bitmap.width(), 4);
        assert_eq!(bitmap.height(), 4);
    }

    #[test]
    fn test_request_only_lifecycle() {
        let bitmap = Bitmap::request("img/tileset.png");
        assert!(bitmap.is_request_only());
        assert!(!bitmap.is_ready());
        assert_eq!(bitmap.width(), 0);

        bitmap.start_loading();
        assert_eq!(bitmap.state(), LoadState::Loading);
        assert!(!bitmap.is_request_only());
    }

    #[test]
    fn test_load_listeners_fifo() {
        let bitmap = Bitmap::loading("img/a.png");
        let order = Rc::new(RefCell::new(Vec::new()));

        let o1 = Rc::clone(&order);
        bitmap.add_load_listener(move |_| o1.borrow_mut().push(1));
        let o2 = Rc::clone(&order);
        bitmap.add_load_listener(move |_| o2.borrow_mut().push(2));
        assert!(order.borrow().is_empty());

        bitmap.finish_load(Pixmap::new(2, 2).unwrap());
        assert_eq!(*order.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_listener_fires_immediately_when_ready() {
        let bitmap = Bitmap::new(2, 2);
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        bitmap.add_load_listener(move |_| f.set(true));
        assert!(fired.get());
    }

    #[test]
    fn test_fill_and_pixel_readback() {
        let bitmap = Bitmap::new(8, 8);
        bitmap.fill_rect(2, 2, 4, 4, Color::rgb(255, 0, 0));

        assert_eq!(bitmap.pixel(3, 3), Color::rgb(255, 0, 0));
        assert_eq!(bitmap.pixel(0, 0), Color::TRANSPARENT);
    }

    #[test]
    fn test_blt_copies_region() {
        let src = Bitmap::new(4, 4);
        src.fill_all(Color::rgb(0, 255, 0));
        let dst = Bitmap::new(8, 8);

        dst.blt(&src, 0, 0, 4, 4, 2, 2);
        assert_eq!(dst.pixel(2, 2), Color::rgb(0, 255, 0));
        assert_eq!(dst.pixel(1, 1), Color::TRANSPARENT);
        assert_eq!(dst.blit_count(), 1);
    }

    #[test]
    fn test_self_blt_is_safe() {
        let bitmap = Bitmap::new(8, 8);
        bitmap.fill_rect(0, 0, 2, 2, Color::rgb(0, 0, 255));

        bitmap.blt(&bitmap.clone(), 0, 0, 2, 2, 4, 4);
        assert_eq!(bitmap.pixel(5, 5), Color::rgb(0, 0, 255));
        assert_eq!(bitmap.pixel(0, 0), Color::rgb(0, 0, 255));
    }

    #[test]
    fn test_blt_from_unloaded_source_is_noop() {
        let src = Bitmap::request("img/missing.png");
        let dst = Bitmap::new(4, 4);

        dst.blt(&src, 0, 0, 4, 4, 0, 0);
        assert_eq!(dst.blit_count(), 0);
    }

    #[test]
    fn test_clear_rect() {
        let bitmap = Bitmap::new(4, 4);
        bitmap.fill_all(Color::WHITE);
        bitmap.clear_rect(0, 0, 2, 2);

        assert_eq!(bitmap.pixel(0, 0), Color::TRANSPARENT);
        assert_eq!(bitmap.pixel(3, 3), Color::WHITE);
    }

    #[test]
    fn test_fail_load_drops_listeners() {
        let bitmap = Bitmap::loading("img/a.png");
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        bitmap.add_load_listener(move |_| f.set(true));

        bitmap.fail_load();
        assert!(bitmap.is_error());
        assert!(!fired.get());
    }
}
