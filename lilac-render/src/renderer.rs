//! The [`Renderer`] and its traversal of the scene graph.

use core::fmt;

use lilac::camera::{Camera, to_screen};
use lilac::math::{Matrix, Rgb, Rgba8, Vector};
use lilac::{DrawState, ElementKind, Light, LightKind, ModuleId, Polygon, Scene, Shape, Transform};

use crate::frame::{Fragment, FrameBuffer, SurfaceId};
use crate::post::{self, ScreenLight};
use crate::raster::{self, ScreenVertex};
use crate::texture::Texture;
use crate::{
    DisplaySurface, Flaws, RenderError, RenderOptions, Rendering, ShadeInput, TextureCache, fog,
    shade,
};

/// Modules nested deeper than this abort the frame.
const MAX_NESTING: usize = 256;

/// Offset along the normal used to find its direction in screen space.
const NORMAL_PROBE: f64 = 1e-3;

/// Bump map samples are scaled by this before perturbing the normal.
const BUMP_SCALE: f64 = 1.0 / 1000.0;

// Layout of the values interpolated across polygons.
const COLOR: usize = 0;
const NORMAL: usize = 3;
const WORLD: usize = 6;
const UV: usize = 9;
const SCREEN_NORMAL: usize = 11;
const VARYINGS: usize = 14;

/// Draws a [`Scene`] as seen by a [`Camera`].
///
/// Each frame is drawn into a back buffer that replaces the visible frame only once the
/// frame is complete, so a frame that fails leaves the previous one visible.
pub struct Renderer {
    camera: Camera,
    options: RenderOptions,
    textures: TextureCache,
    /// Last completed frame.
    front: FrameBuffer,
    /// Frame being drawn.
    back: FrameBuffer,
    flaws: Flaws,
    /// Whether anything other than the scene changed since the last frame.
    dirty: bool,
}

/// Statistics about a drawn frame.
///
/// The [`Default`] value is the zero value.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct RenderInfo {
    /// Shapes handed to the rasterizer, counting each polygon of a batch once.
    pub shapes_drawn: usize,
    /// Pixel writes that passed the depth test.
    pub pixels_written: usize,
    /// Pixels darkened by the shadow pass.
    pub pixels_shadowed: usize,
    /// Pixels changed by the reflection pass.
    pub pixels_reflected: usize,
    /// Traversals of the scene; 2 when selective shadows are on.
    pub passes: usize,
    /// Deficiencies of the frame.
    pub flaws: Flaws,
}

impl core::ops::AddAssign for RenderInfo {
    fn add_assign(&mut self, other: Self) {
        self.shapes_drawn += other.shapes_drawn;
        self.pixels_written += other.pixels_written;
        self.pixels_shadowed += other.pixels_shadowed;
        self.pixels_reflected += other.pixels_reflected;
        self.passes += other.passes;
        self.flaws |= other.flaws;
    }
}

impl Renderer {
    /// Creates a renderer whose visible frame is blank until the first
    /// [`Renderer::draw()`].
    pub fn new(camera: Camera, textures: TextureCache) -> Self {
        let options = RenderOptions::default();
        let size = camera.size();
        Self {
            front: FrameBuffer::new(size, options.background),
            back: FrameBuffer::new(size, options.background),
            camera,
            options,
            textures,
            flaws: Flaws::empty(),
            dirty: true,
        }
    }

    #[allow(missing_docs)]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Replaces the camera. The next frame is drawn at the camera's screen size.
    pub fn set_camera(&mut self, camera: Camera) {
        if camera.size() != self.camera.size() {
            self.front = FrameBuffer::new(camera.size(), self.options.background);
            self.back = FrameBuffer::new(camera.size(), self.options.background);
        }
        self.camera = camera;
        self.dirty = true;
    }

    #[allow(missing_docs)]
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Replaces the options, after constraining them with [`RenderOptions::repair()`].
    pub fn set_options(&mut self, options: RenderOptions) {
        let repaired = options.clone().repair();
        if repaired != options {
            log::warn!("render options out of range were repaired: {repaired:?}");
        }
        self.options = repaired;
        self.dirty = true;
    }

    /// Access to the texture cache, for example to clear it after the host's images
    /// changed. The next [`Renderer::update()`] redraws.
    pub fn textures_mut(&mut self) -> &mut TextureCache {
        self.dirty = true;
        &mut self.textures
    }

    /// Draws `scene` if it or the renderer's configuration changed since the last frame.
    ///
    /// Returns whether a frame was drawn.
    pub fn update(&mut self, scene: &mut Scene) -> Result<bool, RenderError> {
        if !(self.dirty || scene.is_dirty()) {
            return Ok(false);
        }
        self.draw(scene)?;
        Ok(true)
    }

    /// Draws a frame of `scene` and makes it the visible frame, then marks the scene
    /// clean.
    ///
    /// The scene is mutable only so that selective shadows can flip and restore module
    /// visibility. The flags are restored even if drawing fails.
    ///
    /// On error, the visible frame and the scene's dirty flags are left as they were.
    pub fn draw(&mut self, scene: &mut Scene) -> Result<RenderInfo, RenderError> {
        self.back.clear(self.options.background);

        let mut info = self.pass(scene, true)?;
        if self.options.selective_shadows {
            let root = scene.root();
            scene
                .toggle_visibility(root)
                .map_err(|_| RenderError::UnknownModule(root))?;
            let flipped = scopeguard::guard(&mut *scene, |scene| {
                if let Err(error) = scene.toggle_visibility(root) {
                    log::error!("could not restore module visibility: {error}");
                }
            });
            info += self.pass(&flipped, false)?;
        }

        core::mem::swap(&mut self.front, &mut self.back);
        self.flaws = info.flaws;
        self.dirty = false;
        scene.clean();
        log::trace!("{info:?}");
        Ok(info)
    }

    /// Traverses the scene once into the back buffer, optionally followed by the shadow
    /// and reflection passes.
    fn pass(&mut self, scene: &Scene, post_process: bool) -> Result<RenderInfo, RenderError> {
        let lights = scene.lighting().lights();
        let mut traversal = Traversal {
            scene,
            camera: &self.camera,
            options: &self.options,
            textures: &mut self.textures,
            frame: &mut self.back,
            lights,
            info: RenderInfo::default(),
            next_surface: 0,
        };
        traversal.module(scene.root(), &Matrix::IDENTITY, DrawState::DEFAULT, 0)?;
        let mut info = traversal.info;
        info.passes = 1;
        self.back.composite();

        if post_process {
            let screen_lights = self.screen_lights(lights, &mut info.flaws);
            let seed = self.options.seed;
            if self.options.shadows.enabled {
                info.pixels_shadowed =
                    post::shadow_pass(&mut self.back, &screen_lights, &self.options.shadows, seed);
            }
            if self.options.reflections.enabled {
                info.pixels_reflected = post::reflection_pass(
                    &mut self.back,
                    &screen_lights,
                    &self.options.reflections,
                    seed,
                );
            }
        }
        Ok(info)
    }

    /// Projects the point lights to the screen, skipping those that cannot be projected.
    fn screen_lights(&self, lights: &[Light], flaws: &mut Flaws) -> Vec<ScreenLight> {
        lights
            .iter()
            .filter(|light| light.kind == LightKind::Point)
            .filter_map(|light| {
                match to_screen(*self.camera.view_matrix() * light.position) {
                    Some(p) => Some(ScreenLight {
                        x: p.x,
                        y: p.y,
                        depth: p.z,
                    }),
                    None => {
                        log::debug!("light at {:?} is behind the camera", light.position);
                        *flaws |= Flaws::SKIPPED_SHADOWS;
                        None
                    }
                }
            })
            .collect()
    }

    /// Returns a copy of the visible frame.
    pub fn rendering(&self) -> Rendering {
        Rendering {
            size: self.front.size(),
            data: self.rgba_data(),
            flaws: self.flaws,
        }
    }

    /// Shows the visible frame on `surface`.
    pub fn present<S: DisplaySurface>(&self, surface: &mut S) -> Result<(), S::Error> {
        let data = self.rgba_data();
        let size = self.front.size();
        surface.present(imgref::Img::new(
            data.as_slice(),
            size.width as usize,
            size.height as usize,
        ))
    }

    fn rgba_data(&self) -> Vec<[u8; 4]> {
        self.front.colors().iter().map(|c| c.to_array()).collect()
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("camera", &self.camera)
            .field("options", &self.options)
            .field("textures", &self.textures)
            .field("flaws", &self.flaws)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

// -------------------------------------------------------------------------------------------------

/// State of one traversal of the scene graph.
struct Traversal<'a> {
    scene: &'a Scene,
    camera: &'a Camera,
    options: &'a RenderOptions,
    textures: &'a mut TextureCache,
    frame: &'a mut FrameBuffer,
    lights: &'a [Light],
    info: RenderInfo,
    next_surface: u32,
}

/// Per-shape values that do not vary across the shape's pixels.
#[derive(Clone, Copy)]
struct Flat {
    alpha: f64,
    beta: f64,
    fog: bool,
    surface: SurfaceId,
}

impl Traversal<'_> {
    fn module(
        &mut self,
        id: ModuleId,
        global: &Matrix,
        mut state: DrawState,
        depth: usize,
    ) -> Result<(), RenderError> {
        if depth > MAX_NESTING {
            return Err(RenderError::TooDeep { limit: MAX_NESTING });
        }
        let scene = self.scene;
        let module = scene
            .module(id)
            .map_err(|_| RenderError::UnknownModule(id))?;
        self.next_surface += 1;
        let surface = SurfaceId(self.next_surface);

        let mut local = Matrix::IDENTITY;
        for element in module.elements() {
            match element.kind() {
                ElementKind::Transform(Transform::Compose(m)) => local.multiply(m),
                ElementKind::Transform(Transform::ResetLocal) => local = Matrix::IDENTITY,
                ElementKind::DrawState(change) => state = change.apply(&state),
                ElementKind::Shape(shape) => self.shape(shape, &(*global * local), &state, surface),
                ElementKind::Module(child) => {
                    let skip = scene
                        .module(*child)
                        .map_err(|_| RenderError::UnknownModule(*child))?
                        .is_ignored();
                    if !skip {
                        self.module(*child, &(*global * local), state.clone(), depth + 1)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn shape(&mut self, shape: &Shape, model: &Matrix, state: &DrawState, surface: SurfaceId) {
        let flat = Flat {
            alpha: state.alpha,
            beta: 0.0,
            fog: state.fog,
            surface,
        };
        let line_color = |color: Rgba8| state.body_color.unwrap_or(color).to_rgb();
        match shape {
            Shape::Point(p) => {
                self.point(*model * p.position(), p.radius(), line_color(p.color()), flat);
            }
            Shape::PointCloud(cloud) => {
                for (&position, &color) in cloud.positions().iter().zip(cloud.colors()) {
                    self.point(*model * position, cloud.radius(), line_color(color), flat);
                }
            }
            Shape::Line(line) => {
                let [a, b] = line.endpoints();
                self.line(*model * a, *model * b, line_color(line.color()), flat);
            }
            Shape::PolyLine(lines) => {
                for (a, b, color) in lines.segments() {
                    self.line(*model * a, *model * b, line_color(color), flat);
                }
            }
            Shape::Polygon(polygon) => self.polygon(polygon, model, state, surface),
            Shape::PolygonBatch(batch) => {
                for polygon in batch.polygons() {
                    self.polygon(polygon, model, state, surface);
                }
            }
            _ => {}
        }
    }

    fn project(&mut self, world: Vector) -> Option<Vector> {
        let screen = to_screen(*self.camera.view_matrix() * world);
        if screen.is_none() {
            log::debug!("skipping shape with unprojectable point {world:?}");
            self.info.flaws |= Flaws::DEGENERATE_GEOMETRY;
        }
        screen
    }

    fn point(&mut self, world: Vector, radius: i32, color: Rgb, flat: Flat) {
        if radius <= 0 {
            return;
        }
        let Some(s) = self.project(world) else {
            return;
        };
        self.info.shapes_drawn += 1;
        raster::disc([s.x, s.y], radius, |x, y| {
            self.plot(x, y, s.z, color, Vector::ZERO, flat);
        });
    }

    fn line(&mut self, a: Vector, b: Vector, color: Rgb, flat: Flat) {
        let (Some(a), Some(b)) = (self.project(a), self.project(b)) else {
            return;
        };
        self.info.shapes_drawn += 1;
        raster::line([a.x, a.y, a.z], [b.x, b.y, b.z], |x, y, depth| {
            self.plot(x, y, depth, color, Vector::ZERO, flat);
        });
    }

    /// Applies the near plane, fog and depth test, and writes one pixel.
    fn plot(&mut self, x: i64, y: i64, depth: f64, color: Rgb, normal: Vector, flat: Flat) {
        let Some(index) = self.frame.index(x, y) else {
            return;
        };
        if self.camera.near_depth().is_some_and(|near| depth < near) {
            return;
        }
        let color = if flat.fog {
            fog(color, depth, &self.options.fog)
        } else {
            color
        };
        let written = self.frame.write(
            index,
            color.to_rgba8(255),
            Fragment {
                depth,
                alpha: flat.alpha,
                beta: flat.beta,
                normal,
                surface: flat.surface,
            },
        );
        if written {
            self.info.pixels_written += 1;
        }
    }

    fn texture(&mut self, id: Option<&lilac::TextureRef>) -> Option<std::sync::Arc<Texture>> {
        let texture = self.textures.get(id?);
        if texture.is_none() {
            self.info.flaws |= Flaws::MISSING_TEXTURES;
        }
        texture
    }

    fn polygon(&mut self, polygon: &Polygon, model: &Matrix, state: &DrawState, surface: SurfaceId) {
        let anchors = polygon.anchors();
        let (texture, bump_map) = if anchors.is_empty() {
            (None, None)
        } else {
            (
                self.texture(state.texture.as_ref()),
                self.texture(state.bump_map.as_ref()),
            )
        };
        let per_pixel = texture.is_some() || bump_map.is_some();

        let view = *self.camera.view_matrix();
        let eye = self.camera.eye();
        let surface_color = state.surface_color.to_rgb();
        let mut vertices: Vec<ScreenVertex<VARYINGS>> = Vec::with_capacity(polygon.vertices().len());
        for (i, &vertex) in polygon.vertices().iter().enumerate() {
            let world = *model * vertex;
            let normal = (*model * polygon.normals().at(i))
                .normalize()
                .unwrap_or(Vector::ZERO);
            let Some(screen) = self.project(world) else {
                return;
            };
            let screen_normal = to_screen(view * (world + normal * NORMAL_PROBE))
                .and_then(|probe| (probe - screen).normalize())
                .unwrap_or(Vector::ZERO);

            let body = state.body_color.unwrap_or(polygon.vertex_color(i)).to_rgb();
            let color = if per_pixel {
                body
            } else {
                shade(
                    &ShadeInput {
                        position: world,
                        normal,
                        body,
                        surface: surface_color,
                    },
                    self.lights,
                    eye,
                    self.options,
                    &mut self.info.flaws,
                )
            };
            let world = world.homogenize().unwrap_or(world);
            let [u, v] = anchors.get(i).copied().unwrap_or([0.0, 0.0]);

            let mut varyings = [0.0; VARYINGS];
            varyings[COLOR..COLOR + 3].copy_from_slice(&[color.red(), color.green(), color.blue()]);
            varyings[NORMAL..NORMAL + 3].copy_from_slice(&[normal.x, normal.y, normal.z]);
            varyings[WORLD..WORLD + 3].copy_from_slice(&[world.x, world.y, world.z]);
            varyings[UV..UV + 2].copy_from_slice(&[u, v]);
            varyings[SCREEN_NORMAL..SCREEN_NORMAL + 3].copy_from_slice(&[
                screen_normal.x,
                screen_normal.y,
                screen_normal.z,
            ]);
            vertices.push(ScreenVertex {
                x: screen.x,
                y: screen.y,
                depth: screen.z,
                varyings,
            });
        }

        let size = self.frame.size();
        if raster::outside(&vertices, size.width, size.height) {
            return;
        }
        self.info.shapes_drawn += 1;

        let flat = Flat {
            alpha: state.alpha,
            beta: state.beta,
            fog: state.fog,
            surface,
        };
        raster::fill_polygon(&vertices, size.width, size.height, |x, y, point| {
            let at = |offset: usize| {
                [
                    point.varyings[offset],
                    point.varyings[offset + 1],
                    point.varyings[offset + 2],
                ]
            };
            let [r, g, b] = at(COLOR);
            let mut color = Rgb::new(r, g, b);
            if per_pixel {
                let anchor = [point.varyings[UV], point.varyings[UV + 1]];
                if let Some(texture) = &texture {
                    color = texture.sample(anchor).to_rgb();
                }
                let [nx, ny, nz] = at(NORMAL);
                let mut normal = Vector::direction(nx, ny, nz);
                if let Some(bump) = &bump_map {
                    let sample = bump.sample(anchor);
                    normal = normal
                        + Vector::direction(
                            f64::from(sample.red()),
                            f64::from(sample.green()),
                            f64::from(sample.blue()),
                        ) * BUMP_SCALE;
                }
                let [wx, wy, wz] = at(WORLD);
                color = shade(
                    &ShadeInput {
                        position: Vector::point(wx, wy, wz),
                        normal,
                        body: color,
                        surface: surface_color,
                    },
                    self.lights,
                    eye,
                    self.options,
                    &mut self.info.flaws,
                );
            }
            let [sx, sy, sz] = at(SCREEN_NORMAL);
            self.plot(x, y, point.depth, color, Vector::direction(sx, sy, sz), flat);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lilac::DrawStateChange;
    use lilac::camera::View2D;
    use lilac::math::ImageSize;
    use pretty_assertions::assert_eq;

    fn renderer(size: u32) -> Renderer {
        let camera = Camera::new(View2D::new(
            Vector::point(0.0, 0.0, 0.0),
            2.0,
            ImageSize::new(size, size),
        ))
        .unwrap();
        Renderer::new(camera, TextureCache::default())
    }

    fn square(scene: &mut Scene, parent: ModuleId, color: Rgba8) {
        scene
            .create_polygon(
                parent,
                vec![
                    Vector::point(-0.5, -0.5, 0.0),
                    Vector::point(0.5, -0.5, 0.0),
                    Vector::point(0.5, 0.5, 0.0),
                    Vector::point(-0.5, 0.5, 0.0),
                ],
                color,
            )
            .unwrap();
    }

    #[test]
    fn unlit_polygon_is_body_color() {
        let mut scene = Scene::new();
        let red = Rgba8::new(255, 0, 0, 255);
        let root = scene.root();
        square(&mut scene, root, red);
        let mut r = renderer(10);
        let info = r.draw(&mut scene).unwrap();
        let image = r.rendering();
        assert_eq!(image.get(5, 5), Some(red.to_array()));
        assert_eq!(image.get(0, 0), Some(Rgba8::BLACK.to_array()));
        assert_eq!(info.shapes_drawn, 1);
        assert_eq!(info.pixels_written, 25);
        assert_eq!(info.passes, 1);
    }

    #[test]
    fn body_color_override_applies_to_nested_modules_only() {
        let mut scene = Scene::new();
        let root = scene.root();
        let child = scene.create_module(root).unwrap();
        let green = Rgba8::new(0, 255, 0, 255);
        scene
            .add_draw_state(child, DrawStateChange::NONE.with_body_color(green))
            .unwrap();
        square(&mut scene, child, Rgba8::WHITE);
        scene
            .create_point(root, Vector::point(-0.8, 0.8, 1.0), 1, Rgba8::WHITE)
            .unwrap();

        let mut r = renderer(10);
        r.draw(&mut scene).unwrap();
        let image = r.rendering();
        assert_eq!(image.get(5, 5), Some(green.to_array()));
        assert_eq!(image.get(1, 1), Some(Rgba8::WHITE.to_array()));
        assert_eq!(image.get(0, 0), Some(Rgba8::BLACK.to_array()));
    }

    #[test]
    fn translation_moves_shapes() {
        let mut scene = Scene::new();
        let root = scene.root();
        scene.add_translate(root, 0.5, 0.0, 0.0).unwrap();
        square(&mut scene, root, Rgba8::WHITE);
        let mut r = renderer(10);
        r.draw(&mut scene).unwrap();
        let image = r.rendering();
        assert_eq!(image.get(2, 5), Some(Rgba8::BLACK.to_array()));
        assert_eq!(image.get(7, 5), Some(Rgba8::WHITE.to_array()));
    }

    #[test]
    fn failed_frame_keeps_previous() {
        let mut scene = Scene::new();
        let root = scene.root();
        square(&mut scene, root, Rgba8::WHITE);
        let mut r = renderer(10);
        r.draw(&mut scene).unwrap();
        let before = r.rendering();

        // nest modules past the limit
        let mut parent = scene.root();
        for _ in 0..=MAX_NESTING {
            parent = scene.create_module(parent).unwrap();
        }
        assert_eq!(
            r.draw(&mut scene),
            Err(RenderError::TooDeep { limit: MAX_NESTING })
        );
        assert_eq!(r.rendering(), before);
        assert!(scene.is_dirty());
    }

    #[test]
    fn translucent_shape_blends() {
        let mut scene = Scene::new();
        let root = scene.root();
        scene
            .add_draw_state(root, DrawStateChange::NONE.with_alpha(0.5))
            .unwrap();
        square(&mut scene, root, Rgba8::WHITE);
        let mut r = renderer(10);
        r.draw(&mut scene).unwrap();
        assert_eq!(r.rendering().get(5, 5), Some([128, 128, 128, 255]));
    }

    #[test]
    fn set_options_repairs() {
        let mut options = RenderOptions::default();
        options.shadows.diffusion = 70_000;
        options.shadows.area = [u32::MAX, 0];
        options.reflections.diffusion = u32::MAX;
        let mut r = renderer(4);
        r.set_options(options.clone());
        assert_eq!(r.options(), &options.repair());
        assert_eq!(r.options().shadows.diffusion, 16);
    }

    #[test]
    fn zero_radius_point_draws_nothing() {
        let mut scene = Scene::new();
        scene
            .create_point(scene.root(), Vector::ORIGIN, 0, Rgba8::WHITE)
            .unwrap();
        let mut r = renderer(10);
        let info = r.draw(&mut scene).unwrap();
        assert_eq!(info.pixels_written, 0);
    }
}
