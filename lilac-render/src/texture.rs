//! Textures and bump maps: decoded images, the host-supplied loader, and the cache.

use std::fmt;
use std::sync::Arc;

use hashbrown::{HashMap, HashSet};

use lilac::Anchor;
use lilac::TextureRef;
use lilac::math::{ImageSize, Rgba8, area_usize};

/// A decoded RGBA image.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct Texture {
    size: ImageSize,
    data: Box<[Rgba8]>,
}

impl Texture {
    /// Constructs a texture from pixels in row-major order from the top left.
    pub fn new(size: ImageSize, data: impl Into<Box<[Rgba8]>>) -> Result<Self, TextureError> {
        let data = data.into();
        if size.is_empty() || area_usize(size) != Some(data.len()) {
            return Err(TextureError::WrongSize {
                width: size.width,
                height: size.height,
                len: data.len(),
            });
        }
        Ok(Self { size, data })
    }

    /// Constructs a texture from single-channel samples, promoting each to opaque gray.
    pub fn from_luma(size: ImageSize, luma: &[u8]) -> Result<Self, TextureError> {
        let data: Vec<Rgba8> = luma.iter().map(|&l| Rgba8::new(l, l, l, 255)).collect();
        Self::new(size, data)
    }

    #[allow(missing_docs)]
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Samples the texel nearest to an anchor coordinate. Anchors range over 0 to 255 on
    /// both axes regardless of the texture's size; values outside that range are clamped.
    pub fn sample(&self, anchor: Anchor) -> Rgba8 {
        fn texel(coordinate: f64, extent: u32) -> usize {
            let max = f64::from(extent - 1);
            let scaled = (coordinate / 255.0 * max).round();
            if scaled.is_nan() {
                0
            } else {
                scaled.clamp(0.0, max) as usize
            }
        }
        let x = texel(anchor[0], self.size.width);
        let y = texel(anchor[1], self.size.height);
        self.data[y * self.size.width as usize + x]
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

/// Error loading a [`Texture`].
///
/// Texture errors never abort a frame: the affected shapes are drawn untextured and the
/// rendering is marked with [`Flaws::MISSING_TEXTURES`](crate::Flaws::MISSING_TEXTURES).
#[derive(Clone, Debug, Eq, PartialEq, displaydoc::Display)]
#[non_exhaustive]
pub enum TextureError {
    /// no texture named {0:?}
    NotFound(TextureRef),
    /// texture {id:?} could not be decoded: {message}
    Decode {
        #[allow(missing_docs)]
        id: TextureRef,
        #[allow(missing_docs)]
        message: String,
    },
    /// {len} pixels do not make a {width}×{height} texture
    WrongSize {
        #[allow(missing_docs)]
        width: u32,
        #[allow(missing_docs)]
        height: u32,
        #[allow(missing_docs)]
        len: usize,
    },
}

impl std::error::Error for TextureError {}

/// Loads and decodes textures named by [`TextureRef`]s, such as from image files.
pub trait TextureSource {
    /// Loads the texture named by `id`.
    fn load(&self, id: &TextureRef) -> Result<Texture, TextureError>;
}

/// A [`TextureSource`] holding already decoded textures.
#[derive(Clone, Debug, Default)]
pub struct MemoryTextureSource {
    textures: HashMap<TextureRef, Texture>,
}

impl MemoryTextureSource {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the texture named `id`.
    pub fn insert(&mut self, id: TextureRef, texture: Texture) {
        self.textures.insert(id, texture);
    }
}

impl TextureSource for MemoryTextureSource {
    fn load(&self, id: &TextureRef) -> Result<Texture, TextureError> {
        self.textures
            .get(id)
            .cloned()
            .ok_or_else(|| TextureError::NotFound(id.clone()))
    }
}

/// Memoizes textures loaded from a [`TextureSource`].
///
/// Each identifier is loaded at most once, including unsuccessfully. Textures with
/// identical contents share one allocation even when they have different identifiers.
pub struct TextureCache {
    source: Box<dyn TextureSource + Send + Sync>,
    by_id: HashMap<TextureRef, Option<Arc<Texture>>>,
    by_content: HashSet<Arc<Texture>>,
}

impl TextureCache {
    #[allow(missing_docs)]
    pub fn new(source: impl TextureSource + Send + Sync + 'static) -> Self {
        Self {
            source: Box::new(source),
            by_id: HashMap::new(),
            by_content: HashSet::new(),
        }
    }

    /// Returns the texture named `id`, loading it if this is the first request.
    ///
    /// Returns [`None`] if it could not be loaded; the failure is logged once.
    pub fn get(&mut self, id: &TextureRef) -> Option<Arc<Texture>> {
        if let Some(entry) = self.by_id.get(id) {
            return entry.clone();
        }
        let entry = match self.source.load(id) {
            Ok(texture) => {
                let shared = match self.by_content.get(&texture) {
                    Some(existing) => existing.clone(),
                    None => {
                        let shared = Arc::new(texture);
                        self.by_content.insert(shared.clone());
                        shared
                    }
                };
                log::debug!("loaded texture {id} ({:?})", shared.size());
                Some(shared)
            }
            Err(error) => {
                log::warn!("texture {id} is unavailable: {error}");
                None
            }
        };
        self.by_id.insert(id.clone(), entry.clone());
        entry
    }

    /// Forgets all loaded textures and failures, so that they are loaded again when next
    /// requested.
    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_content.clear();
    }

    /// Number of distinct texture contents held.
    pub fn len(&self) -> usize {
        self.by_content.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.by_content.is_empty()
    }
}

impl Default for TextureCache {
    /// A cache with an empty [`MemoryTextureSource`].
    fn default() -> Self {
        Self::new(MemoryTextureSource::new())
    }
}

impl fmt::Debug for TextureCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureCache")
            .field("ids", &self.by_id.len())
            .field("textures", &self.by_content.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn checker() -> Texture {
        Texture::new(
            ImageSize::new(2, 2),
            vec![Rgba8::BLACK, Rgba8::WHITE, Rgba8::WHITE, Rgba8::BLACK],
        )
        .unwrap()
    }

    #[test]
    fn sample_scales_anchors() {
        let t = checker();
        assert_eq!(t.sample([0.0, 0.0]), Rgba8::BLACK);
        assert_eq!(t.sample([255.0, 0.0]), Rgba8::WHITE);
        assert_eq!(t.sample([255.0, 255.0]), Rgba8::BLACK);
        assert_eq!(t.sample([1000.0, -5.0]), Rgba8::WHITE);
    }

    #[test]
    fn wrong_size() {
        assert_eq!(
            Texture::new(ImageSize::new(2, 2), vec![Rgba8::BLACK]),
            Err(TextureError::WrongSize {
                width: 2,
                height: 2,
                len: 1
            })
        );
    }

    #[test]
    fn luma_promoted() {
        let t = Texture::from_luma(ImageSize::new(1, 1), &[7]).unwrap();
        assert_eq!(t.sample([0.0, 0.0]), Rgba8::new(7, 7, 7, 255));
    }

    struct CountingSource(MemoryTextureSource, Arc<AtomicUsize>);
    impl TextureSource for CountingSource {
        fn load(&self, id: &TextureRef) -> Result<Texture, TextureError> {
            self.1.fetch_add(1, Ordering::Relaxed);
            self.0.load(id)
        }
    }

    #[test]
    fn cache_memoizes_and_dedupes() {
        let mut source = MemoryTextureSource::new();
        source.insert(TextureRef::new("a"), checker());
        source.insert(TextureRef::new("b"), checker());
        let loads = Arc::new(AtomicUsize::new(0));
        let mut cache = TextureCache::new(CountingSource(source, loads.clone()));

        let a = cache.get(&TextureRef::new("a")).unwrap();
        let b = cache.get(&TextureRef::new("b")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);

        assert_eq!(cache.get(&TextureRef::new("missing")), None);
        assert_eq!(cache.get(&TextureRef::new("missing")), None);
        cache.get(&TextureRef::new("a")).unwrap();
        assert_eq!(loads.load(Ordering::Relaxed), 3);
    }
}
