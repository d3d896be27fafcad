//! Trait seams between the cache layer and the render layer
//!
//! The caches never name a concrete bitmap type; they see resources through
//! these capabilities only.

/// A cached image resource as the cache layer sees it.
pub trait ImageResource {
    /// Finished loading and usable for drawing
    fn is_ready(&self) -> bool;

    /// Loading ended in failure
    fn is_error(&self) -> bool;

    /// A deferred request that was never started (weak, always purgeable)
    fn is_request_only(&self) -> bool;

    /// Width in pixels (0 until loaded)
    fn width(&self) -> u32;

    /// Height in pixels (0 until loaded)
    fn height(&self) -> u32;

    /// Liveness ping; keeps TTL-managed resources alive
    fn touch(&self);

    /// Pixel area used for cache budget accounting
    fn pixel_area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
}

/// An outstanding resource load that a `RequestQueue` can pump.
pub trait LoadRequest {
    /// The request has completed (successfully or not)
    fn is_request_ready(&self) -> bool;

    /// Begin (or re-confirm) the load; called once per tick while at the
    /// queue head, so it must be idempotent on an in-flight request
    fn start_request(&mut self);
}
