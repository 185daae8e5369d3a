use lilac::math::ImageSize;

use crate::Flaws;

/// Image produced by a [`Renderer`](crate::Renderer).
#[derive(Clone, Debug, Eq, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct Rendering {
    /// Width and height of the image.
    pub size: ImageSize,
    /// Image data, RGBA, 8 bits per component, in row-major order from the top left.
    pub data: Vec<[u8; 4]>,
    /// Deficiencies of the rendering; ways in which it fails to accurately represent the
    /// scene or apply the renderer’s configuration.
    pub flaws: Flaws,
}

impl Rendering {
    /// Returns the pixel at `(x, y)`, or [`None`] if out of bounds.
    pub fn get(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        self.data
            .get(y as usize * self.size.width as usize + x as usize)
            .copied()
    }
}

impl From<Rendering> for imgref::ImgVec<[u8; 4]> {
    fn from(value: Rendering) -> Self {
        imgref::Img::new(
            value.data,
            value.size.width as usize,
            value.size.height as usize,
        )
    }
}
impl<'a> From<&'a Rendering> for imgref::ImgRef<'a, [u8; 4]> {
    fn from(value: &'a Rendering) -> Self {
        imgref::Img::new(
            value.data.as_slice(),
            value.size.width as usize,
            value.size.height as usize,
        )
    }
}

/// A destination that finished frames can be shown on, such as a window.
///
/// The renderer never retains the surface; the host passes it in each time it wants the
/// visible frame shown.
pub trait DisplaySurface {
    /// Error reported by the surface when it cannot show the frame.
    type Error;

    /// Shows `image`, whose pixels are RGBA in row-major order from the top left.
    fn present(&mut self, image: imgref::ImgRef<'_, [u8; 4]>) -> Result<(), Self::Error>;
}

/// Copies the frame, resizing the image to match.
impl DisplaySurface for imgref::ImgVec<[u8; 4]> {
    type Error = core::convert::Infallible;

    fn present(&mut self, image: imgref::ImgRef<'_, [u8; 4]>) -> Result<(), Self::Error> {
        let data: Vec<[u8; 4]> = image.pixels().collect();
        *self = imgref::Img::new(data, image.width(), image.height());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Rendering {
        Rendering {
            size: ImageSize::new(2, 2),
            data: vec![[1, 0, 0, 255], [2, 0, 0, 255], [3, 0, 0, 255], [4, 0, 0, 255]],
            flaws: Flaws::empty(),
        }
    }

    #[test]
    fn get_is_row_major() {
        let r = sample();
        assert_eq!(r.get(1, 0), Some([2, 0, 0, 255]));
        assert_eq!(r.get(0, 1), Some([3, 0, 0, 255]));
        assert_eq!(r.get(2, 0), None);
    }

    #[test]
    fn present_to_image() {
        let r = sample();
        let mut surface = imgref::ImgVec::new(vec![[0; 4]], 1, 1);
        surface.present((&r).into()).unwrap();
        assert_eq!(surface.width(), 2);
        assert_eq!(surface.buf().as_slice(), r.data.as_slice());
    }
}
