//! Async image loader
//!
//! File reads and decoding run on background tasks; completions come back
//! over a channel and are applied on the caller's frame tick via `poll`.
//! Each load is keyed by a token mapped to a weak bitmap handle, so a
//! completion that outlives its bitmap (evicted, cancelled) is dropped
//! instead of resurrecting stale state.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use smol::channel::{Receiver, Sender};
use tiny_skia::Pixmap;

use crate::bitmap::{Bitmap, WeakBitmap};

/// Default backoff schedule before a load fails permanently
pub const RETRY_DELAYS_MS: [u64; 3] = [500, 1000, 3000];

/// Identifies one outstanding load
pub type LoadToken = u64;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {path}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
}

/// Decoded pixels in straight-alpha RGBA, handed back from the task
struct DecodedImage {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

type Completion = (LoadToken, Result<DecodedImage, LoadError>);

/// Clonable loader handle; lives on the frame-tick thread.
pub struct ImageLoader {
    inner: Rc<RefCell<Inner>>,
}

struct Inner {
    pending: HashMap<LoadToken, WeakBitmap>,
    next_token: LoadToken,
    retry_delays_ms: Vec<u64>,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
}

impl Clone for ImageLoader {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader {
    pub fn new() -> Self {
        let (tx, rx) = smol::channel::unbounded();
        Self {
            inner: Rc::new(RefCell::new(Inner {
                pending: HashMap::new(),
                next_token: 1,
                retry_delays_ms: RETRY_DELAYS_MS.to_vec(),
                tx,
                rx,
            })),
        }
    }

    /// Replace the retry backoff schedule for loads started after this call
    pub fn set_retry_schedule(&self, delays_ms: Vec<u64>) {
        self.inner.borrow_mut().retry_delays_ms = delays_ms;
    }

    /// Kick off a background load for a bitmap. The bitmap transitions to
    /// the loading state immediately; pixels or failure arrive via `poll`.
    pub fn start_load(&self, bitmap: &Bitmap, path: &str) -> LoadToken {
        bitmap.start_loading();
        let token = {
            let mut inner = self.inner.borrow_mut();
            let token = inner.next_token;
            inner.next_token += 1;
            inner.pending.insert(token, bitmap.downgrade());
            token
        };
        let (tx, delays) = {
            let inner = self.inner.borrow();
            (inner.tx.clone(), inner.retry_delays_ms.clone())
        };
        let path = path.to_string();
        tracing::debug!(token, path = path.as_str(), "starting image load");
        smol::spawn(async move {
            let result = load_with_retry(&path, &delays).await;
            let _ = tx.send((token, result)).await;
        })
        .detach();
        token
    }

    /// Forget an outstanding load; its completion will be dropped
    pub fn cancel(&self, token: LoadToken) {
        self.inner.borrow_mut().pending.remove(&token);
    }

    /// Drain finished loads and apply them to their bitmaps. Completions
    /// whose token was cancelled or whose bitmap is gone are discarded.
    pub fn poll(&self) {
        loop {
            let completion = self.inner.borrow().rx.try_recv();
            let Ok((token, result)) = completion else {
                break;
            };
            let target = self.inner.borrow_mut().pending.remove(&token);
            let Some(bitmap) = target.as_ref().and_then(Bitmap::upgrade) else {
                tracing::debug!(token, "dropping stale load completion");
                continue;
            };
            match result {
                Ok(image) => match pixmap_from(&image) {
                    Some(pixmap) => bitmap.finish_load(pixmap),
                    None => bitmap.fail_load(),
                },
                Err(err) => {
                    tracing::error!(token, error = %err, "image load failed");
                    bitmap.fail_load();
                }
            }
        }
    }

    /// Loads still outstanding
    pub fn pending_count(&self) -> usize {
        self.inner.borrow().pending.len()
    }
}

async fn load_with_retry(path: &str, delays_ms: &[u64]) -> Result<DecodedImage, LoadError> {
    let mut attempt = 0;
    loop {
        match load_once(path).await {
            Ok(image) => return Ok(image),
            Err(err) => {
                let Some(&delay) = delays_ms.get(attempt) else {
                    return Err(err);
                };
                tracing::warn!(
                    path,
                    attempt,
                    error = %err,
                    "image load failed, retrying"
                );
                smol::Timer::after(Duration::from_millis(delay)).await;
                attempt += 1;
            }
        }
    }
}

async fn load_once(path: &str) -> Result<DecodedImage, LoadError> {
    let bytes = smol::fs::read(path).await.map_err(|source| LoadError::Io {
        path: path.to_string(),
        source,
    })?;
    let path = path.to_string();
    smol::unblock(move || {
        let decoded =
            image::load_from_memory(&bytes).map_err(|source| LoadError::Decode {
                path: path.clone(),
                source,
            })?;
        let rgba = decoded.to_rgba8();
        Ok(DecodedImage {
            width: rgba.width(),
            height: rgba.height(),
            rgba: rgba.into_raw(),
        })
    })
    .await
}

/// Straight-alpha RGBA into a premultiplied tiny-skia surface
fn pixmap_from(image: &DecodedImage) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(image.width, image.height)?;
    for (dst, src) in pixmap
        .pixels_mut()
        .iter_mut()
        .zip(image.rgba.chunks_exact(4))
    {
        let color = tiny_skia::ColorU8::from_rgba(src[0], src[1], src[2], src[3]);
        *dst = color.premultiply();
    }
    Some(pixmap)
}
