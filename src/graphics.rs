//! Host graphics seam.
//!
//! Textures can only be created or destroyed while the host's graphics context
//! is held. [`Graphics::scoped`] models one acquisition of that context; the
//! decoders take exactly one for a whole decode pass and one for teardown.

use image::RgbaImage;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Creates and destroys textures while the graphics context is held
pub trait TextureAllocator<T> {
    /// Upload `rgba` (`width * height * 4` bytes) as a new texture
    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> Option<T>;

    fn destroy_texture(&mut self, texture: T);
}

/// A host graphics context
pub trait Graphics {
    type Texture;

    /// Run `f` inside a single acquisition of the graphics context
    fn scoped<R>(&self, f: impl FnOnce(&mut dyn TextureAllocator<Self::Texture>) -> R) -> R;
}

/// Index of a texture inside a [`TextureArena`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureKey(usize);

/// Decoder-owned textures, released together.
///
/// Only [`TextureArena::release_all`] gives textures back to the allocator;
/// callers get shared references and never own a texture themselves.
#[derive(Debug)]
pub struct TextureArena<T> {
    textures: Vec<T>,
}

impl<T> Default for TextureArena<T> {
    fn default() -> Self {
        Self { textures: Vec::new() }
    }
}

impl<T> TextureArena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, texture: T) -> TextureKey {
        self.textures.push(texture);
        TextureKey(self.textures.len() - 1)
    }

    pub fn get(&self, key: TextureKey) -> Option<&T> {
        self.textures.get(key.0)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Destroy every texture. Must run inside [`Graphics::scoped`].
    pub fn release_all(&mut self, allocator: &mut dyn TextureAllocator<T>) {
        for texture in self.textures.drain(..) {
            allocator.destroy_texture(texture);
        }
    }
}

impl<T> Drop for TextureArena<T> {
    fn drop(&mut self) {
        if !self.textures.is_empty() {
            log::warn!("Dropping {} textures that were never released", self.textures.len());
        }
    }
}

/// Handle of a texture held by [`SoftwareGraphics`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(u64);

#[derive(Debug, Default)]
struct SoftwareDevice {
    textures: HashMap<TextureId, RgbaImage>,
    next_id: u64,
    texture_limit: Option<usize>,
    /// Zero-based creation attempt that is refused
    failing_creation: Option<usize>,
    creation_attempts: usize,
    acquisitions: usize,
}

impl TextureAllocator<TextureId> for SoftwareDevice {
    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> Option<TextureId> {
        let attempt = self.creation_attempts;
        self.creation_attempts += 1;
        if self.failing_creation == Some(attempt) {
            log::debug!("Refusing texture creation #{}", attempt);
            return None;
        }
        if self.texture_limit.is_some_and(|limit| self.textures.len() >= limit) {
            log::debug!("Texture limit reached, refusing {}x{} texture", width, height);
            return None;
        }
        let image = RgbaImage::from_raw(width, height, rgba.to_vec())?;
        let id = TextureId(self.next_id);
        self.next_id += 1;
        self.textures.insert(id, image);
        Some(id)
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        if self.textures.remove(&texture).is_none() {
            log::warn!("Destroying unknown texture {:?}", texture);
        }
    }
}

/// In-memory graphics context: textures are plain RGBA images behind a lock.
///
/// Clones share the same device.
#[derive(Clone, Debug, Default)]
pub struct SoftwareGraphics {
    device: Arc<Mutex<SoftwareDevice>>,
}

impl SoftwareGraphics {
    pub fn new() -> Self {
        Self::default()
    }

    /// A device that refuses to create more than `limit` live textures
    pub fn with_texture_limit(limit: usize) -> Self {
        let graphics = Self::default();
        graphics.device.lock().texture_limit = Some(limit);
        graphics
    }

    /// A device that refuses only the `attempt`-th texture creation (zero-based)
    pub fn with_failing_texture(attempt: usize) -> Self {
        let graphics = Self::default();
        graphics.device.lock().failing_creation = Some(attempt);
        graphics
    }

    /// Pixels of a live texture
    pub fn texture_pixels(&self, texture: TextureId) -> Option<RgbaImage> {
        self.device.lock().textures.get(&texture).cloned()
    }

    pub fn live_textures(&self) -> usize {
        self.device.lock().textures.len()
    }

    /// Number of times the context has been acquired
    pub fn acquisitions(&self) -> usize {
        self.device.lock().acquisitions
    }
}

impl Graphics for SoftwareGraphics {
    type Texture = TextureId;

    fn scoped<R>(&self, f: impl FnOnce(&mut dyn TextureAllocator<TextureId>) -> R) -> R {
        let mut device = self.device.lock();
        device.acquisitions += 1;
        f(&mut *device)
    }
}
