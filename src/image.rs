// Inline image resolution.
// The compose core never decodes images itself; it hands each <img> element
// to an ImageResolver and stores whatever comes back.

use std::sync::Arc;

/// The attributes of an `<img>` element that survived sanitizing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageElement {
    pub src: String,
    pub alt: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// What a resolver produced for an image element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageHandle {
    Bitmap {
        width: u32,
        height: u32,
        data: Arc<[u8]>,
    },
    /// Resolution failed or was deferred; rendered as a generic image glyph.
    Placeholder,
}

impl ImageHandle {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, ImageHandle::Placeholder)
    }
}

/// Resolves image elements during HTML conversion.
///
/// Called on the conversion worker, once per image element. Implementations
/// must not panic; failures degrade to [`ImageHandle::Placeholder`].
pub trait ImageResolver: Send + Sync {
    fn resolve(&self, element: &ImageElement) -> ImageHandle;
}

/// Resolver that never loads anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderResolver;

impl ImageResolver for PlaceholderResolver {
    fn resolve(&self, _element: &ImageElement) -> ImageHandle {
        ImageHandle::Placeholder
    }
}
