//! Whole-frame tests of [`Renderer`] against scenes built through the public API.

use pretty_assertions::assert_eq;

use lilac::camera::{Camera, View2D, View3D};
use lilac::math::{ImageSize, Rgba8, Vector};
use lilac::{DrawStateChange, Light, Polygon, Scene, TextureRef};
use lilac_render::{
    Flaws, MemoryTextureSource, RenderError, RenderOptions, Renderer, Texture, TextureCache,
};

const RED: Rgba8 = Rgba8::new(255, 0, 0, 255);

/// A 20×20 view of world X from 0 to 20, one pixel per unit, with the X axis on row 10.
fn line_renderer() -> Renderer {
    let camera = Camera::new(View2D::new(
        Vector::point(10.0, 0.0, 0.0),
        20.0,
        ImageSize::new(20, 20),
    ))
    .unwrap();
    Renderer::new(camera, TextureCache::default())
}

/// A 10×10 view of the square from -1 to 1.
fn unit_renderer() -> Renderer {
    let camera = Camera::new(View2D::new(Vector::ORIGIN, 2.0, ImageSize::new(10, 10))).unwrap();
    Renderer::new(camera, TextureCache::default())
}

fn perspective_renderer() -> Renderer {
    let camera = Camera::new(
        View3D::new(
            Vector::point(0.0, 0.0, -5.0),
            Vector::direction(0.0, 0.0, 1.0),
            Vector::direction(0.0, 1.0, 0.0),
            ImageSize::new(40, 30),
        )
        .with_distances(2.0, 0.0, 15.0)
        .with_width(4.0),
    )
    .unwrap();
    Renderer::new(camera, TextureCache::default())
}

#[test]
fn nearer_line_wins_regardless_of_order() {
    let mut scene = Scene::new();
    let root = scene.root();
    scene
        .create_line(
            root,
            Vector::point(0.0, 0.0, 0.0),
            Vector::point(10.0, 0.0, 0.0),
            Rgba8::WHITE,
        )
        .unwrap();
    scene
        .create_line(
            root,
            Vector::point(0.0, 0.0, -5.0),
            Vector::point(10.0, 0.0, -5.0),
            RED,
        )
        .unwrap();

    let mut renderer = line_renderer();
    let info = renderer.draw(&mut scene).unwrap();
    let image = renderer.rendering();

    for x in 0..=10 {
        assert_eq!(image.get(x, 10), Some(Rgba8::WHITE.to_array()), "x = {x}");
    }
    assert_eq!(image.get(11, 10), Some(Rgba8::BLACK.to_array()));
    assert_eq!(image.get(5, 9), Some(Rgba8::BLACK.to_array()));
    assert_eq!(info.pixels_written, 11);
    assert_eq!(info.shapes_drawn, 2);
}

#[test]
fn offscreen_polygon_writes_nothing() {
    let mut scene = Scene::new();
    scene
        .create_polygon(
            scene.root(),
            vec![
                Vector::point(5.0, 5.0, 0.0),
                Vector::point(6.0, 5.0, 0.0),
                Vector::point(6.0, 6.0, 0.0),
            ],
            Rgba8::WHITE,
        )
        .unwrap();
    let mut renderer = unit_renderer();
    let info = renderer.draw(&mut scene).unwrap();
    assert_eq!(info.pixels_written, 0);
    assert_eq!(info.shapes_drawn, 0);
}

#[test]
fn empty_scene_is_background() {
    let background = Rgba8::new(10, 20, 30, 255);
    let mut options = RenderOptions::default();
    options.background = background;
    let mut renderer = unit_renderer();
    renderer.set_options(options);

    let mut scene = Scene::new();
    renderer.draw(&mut scene).unwrap();
    let image = renderer.rendering();
    assert_eq!(image.size, ImageSize::new(10, 10));
    assert!(image.data.iter().all(|&p| p == background.to_array()));
    assert_eq!(image.flaws, Flaws::empty());
}

#[test]
fn ambient_light_never_brightens() {
    let mut scene = Scene::new();
    scene
        .create_rectangle(scene.root(), 0.5, 0.5, [0.0, 0.0], Rgba8::WHITE)
        .unwrap();
    scene
        .lighting_mut()
        .add_light(Light::ambient(Rgba8::new(100, 100, 100, 255)))
        .unwrap();
    let mut renderer = unit_renderer();
    renderer.draw(&mut scene).unwrap();
    assert_eq!(renderer.rendering().get(5, 5), Some([100, 100, 100, 255]));
}

#[test]
fn selective_shadows_restore_visibility() {
    let mut scene = Scene::new();
    let root = scene.root();
    let shown = scene.create_module(root).unwrap();
    let hidden = scene.create_module(root).unwrap();
    scene.module_mut(hidden).unwrap().set_ignore(true);
    scene
        .create_rectangle(shown, 0.5, 0.5, [0.0, 0.0], Rgba8::WHITE)
        .unwrap();
    scene.add_translate(hidden, 0.0, 0.0, 1.0).unwrap();
    scene
        .create_rectangle(hidden, 0.25, 0.25, [0.0, 0.0], RED)
        .unwrap();

    let mut options = RenderOptions::default();
    options.selective_shadows = true;
    let mut renderer = unit_renderer();
    renderer.set_options(options);
    let info = renderer.draw(&mut scene).unwrap();

    assert_eq!(info.passes, 2);
    assert!(!scene.module(shown).unwrap().is_ignored());
    assert!(scene.module(hidden).unwrap().is_ignored());
    assert!(!scene.is_dirty());
    // the hidden module is drawn by the second pass, in front of the first
    assert_eq!(renderer.rendering().get(5, 5), Some(RED.to_array()));
}

#[test]
fn selective_shadows_restore_visibility_on_error() {
    let mut scene = Scene::new();
    let root = scene.root();
    let shown = scene.create_module(root).unwrap();
    let hidden = scene.create_module(root).unwrap();
    scene.module_mut(hidden).unwrap().set_ignore(true);
    let mut parent = hidden;
    for _ in 0..300 {
        parent = scene.create_module(parent).unwrap();
    }

    let mut options = RenderOptions::default();
    options.selective_shadows = true;
    let mut renderer = unit_renderer();
    renderer.set_options(options);

    let result = renderer.draw(&mut scene);
    assert!(matches!(result, Err(RenderError::TooDeep { .. })), "{result:?}");
    assert!(!scene.module(shown).unwrap().is_ignored());
    assert!(scene.module(hidden).unwrap().is_ignored());
}

#[test]
fn batch_matches_separate_polygons() {
    let mut scene = Scene::new();
    let root = scene.root();
    for (i, color) in [RED, Rgba8::WHITE, Rgba8::new(0, 0, 255, 255)]
        .into_iter()
        .enumerate()
    {
        let x = i as f64 * 0.6 - 0.6;
        scene
            .create_polygon(
                root,
                vec![
                    Vector::point(x - 0.3, -0.5, 0.0),
                    Vector::point(x + 0.3, -0.5, 0.0),
                    Vector::point(x, 0.5, 0.1),
                ],
                color,
            )
            .unwrap();
    }
    scene
        .lighting_mut()
        .add_light(Light::point(Rgba8::WHITE, Vector::point(0.0, 0.0, 3.0), 8))
        .unwrap();

    let mut batched = scene.clone();
    assert_eq!(batched.module_mut(root).unwrap().optimize(), 1);

    let mut renderer = unit_renderer();
    renderer.draw(&mut scene).unwrap();
    let separate = renderer.rendering();
    renderer.draw(&mut batched).unwrap();
    assert_eq!(renderer.rendering(), separate);
}

#[test]
fn update_draws_only_when_dirty() {
    let mut scene = Scene::new();
    let mut renderer = unit_renderer();
    assert_eq!(renderer.update(&mut scene), Ok(true));
    assert_eq!(renderer.update(&mut scene), Ok(false));

    scene
        .create_point(scene.root(), Vector::ORIGIN, 1, Rgba8::WHITE)
        .unwrap();
    assert_eq!(renderer.update(&mut scene), Ok(true));
    assert_eq!(renderer.update(&mut scene), Ok(false));

    renderer.set_options(RenderOptions::default());
    assert_eq!(renderer.update(&mut scene), Ok(true));
}

fn lit_box_scene() -> Scene {
    let mut scene = Scene::new();
    let root = scene.root();
    scene
        .create_rectangle(root, 3.0, 3.0, [0.0, 0.0], Rgba8::new(200, 200, 200, 255))
        .unwrap();
    scene.add_translate(root, 0.0, 0.0, -1.5).unwrap();
    scene
        .create_box(
            root,
            [0.5, 0.5, 0.5],
            [0.0, 0.0, 0.0],
            [Rgba8::new(180, 60, 60, 255); 6],
        )
        .unwrap();
    scene
        .lighting_mut()
        .add_light(Light::ambient(Rgba8::new(60, 60, 60, 255)))
        .unwrap();
    scene
        .lighting_mut()
        .add_light(Light::point(
            Rgba8::WHITE,
            Vector::point(2.0, 2.0, -6.0),
            4,
        ))
        .unwrap();
    scene
}

#[test]
fn same_seed_same_frame() {
    let mut options = RenderOptions::default();
    options.seed = 1234;
    options.shadows.diffusion = 2;
    options.reflections.diffusion = 2;

    let mut a = perspective_renderer();
    let mut b = perspective_renderer();
    a.set_options(options.clone());
    b.set_options(options);

    let info = a.draw(&mut lit_box_scene()).unwrap();
    b.draw(&mut lit_box_scene()).unwrap();
    assert!(info.pixels_written > 0);
    assert_eq!(a.rendering(), b.rendering());
}

#[test]
fn missing_texture_is_a_flaw() {
    let mut scene = Scene::new();
    let root = scene.root();
    scene
        .add_draw_state(
            root,
            DrawStateChange::NONE.with_texture(Some(TextureRef::new("nowhere.png"))),
        )
        .unwrap();
    scene
        .create_rectangle(root, 0.5, 0.5, [0.0, 0.0], RED)
        .unwrap();

    let mut renderer = unit_renderer();
    renderer.draw(&mut scene).unwrap();
    let image = renderer.rendering();
    assert_eq!(image.flaws, Flaws::MISSING_TEXTURES);
    assert_eq!(image.get(5, 5), Some(RED.to_array()));
}

#[test]
fn texture_replaces_body_color() {
    let green = Rgba8::new(0, 255, 0, 255);
    let mut source = MemoryTextureSource::new();
    source.insert(
        TextureRef::new("green"),
        Texture::new(ImageSize::new(1, 1), vec![green]).unwrap(),
    );
    let camera = Camera::new(View2D::new(Vector::ORIGIN, 2.0, ImageSize::new(10, 10))).unwrap();
    let mut renderer = Renderer::new(camera, TextureCache::new(source));

    let mut scene = Scene::new();
    let root = scene.root();
    scene
        .add_draw_state(
            root,
            DrawStateChange::NONE.with_texture(Some(TextureRef::new("green"))),
        )
        .unwrap();
    scene
        .create_rectangle(root, 0.5, 0.5, [0.0, 0.0], RED)
        .unwrap();
    // no anchors, so the texture does not apply
    scene
        .add_shape(
            root,
            Polygon::new(
                vec![
                    Vector::point(-1.0, 0.8, 0.0),
                    Vector::point(-0.6, 0.8, 0.0),
                    Vector::point(-0.6, 1.0, 0.0),
                    Vector::point(-1.0, 1.0, 0.0),
                ],
                RED,
            )
            .unwrap(),
        )
        .unwrap();

    renderer.draw(&mut scene).unwrap();
    let image = renderer.rendering();
    assert_eq!(image.get(5, 5), Some(green.to_array()));
    assert_eq!(image.get(1, 0), Some(RED.to_array()));
    assert_eq!(image.flaws, Flaws::empty());
}

#[test]
fn present_matches_rendering() {
    let mut scene = Scene::new();
    scene
        .create_rectangle(scene.root(), 0.5, 0.25, [0.0, 0.0], RED)
        .unwrap();
    let mut renderer = unit_renderer();
    renderer.draw(&mut scene).unwrap();

    let mut surface = imgref::ImgVec::new(vec![[0u8; 4]], 1, 1);
    renderer.present(&mut surface).unwrap();
    let rendering = renderer.rendering();
    assert_eq!(surface.width(), 10);
    assert_eq!(surface.buf().as_slice(), rendering.data.as_slice());
}

#[test]
fn out_of_range_options_are_repaired() {
    let mut scene = Scene::new();
    scene
        .create_rectangle(scene.root(), 0.5, 0.5, [0.0, 0.0], Rgba8::WHITE)
        .unwrap();
    scene
        .lighting_mut()
        .add_light(Light::point(Rgba8::WHITE, Vector::point(0.5, 0.5, 3.0), 4))
        .unwrap();

    let mut options = RenderOptions::default();
    options.shadows.diffusion = 70_000;
    options.shadows.area = [u32::MAX, u32::MAX];
    options.reflections.diffusion = 70_000;
    options.reflections.projection = 1e300;
    let mut renderer = unit_renderer();
    renderer.set_options(options);

    assert_eq!(renderer.options().shadows.diffusion, 16);
    assert_eq!(renderer.options().reflections.diffusion, 16);
    let info = renderer.draw(&mut scene).unwrap();
    assert!(info.pixels_written > 0);
}

/// A white wall with a half-transparent red pane in front of it, drawn in either order.
fn glass_scene(glass_first: bool) -> Scene {
    let mut scene = Scene::new();
    let root = scene.root();
    let (glass, wall) = if glass_first {
        let glass = scene.create_module(root).unwrap();
        (glass, scene.create_module(root).unwrap())
    } else {
        let wall = scene.create_module(root).unwrap();
        (scene.create_module(root).unwrap(), wall)
    };
    scene.add_translate(glass, 0.0, 0.0, 1.0).unwrap();
    scene
        .add_draw_state(glass, DrawStateChange::NONE.with_alpha(0.5))
        .unwrap();
    scene
        .create_rectangle(glass, 0.5, 0.5, [0.0, 0.0], RED)
        .unwrap();
    scene
        .create_rectangle(wall, 0.5, 0.5, [0.0, 0.0], Rgba8::WHITE)
        .unwrap();
    scene
}

#[test]
fn translucency_ignores_draw_order() {
    let mut renderer = unit_renderer();
    renderer.draw(&mut glass_scene(true)).unwrap();
    let glass_first = renderer.rendering();
    renderer.draw(&mut glass_scene(false)).unwrap();
    let wall_first = renderer.rendering();

    assert_eq!(glass_first.get(5, 5), Some([255, 128, 128, 255]));
    assert_eq!(glass_first, wall_first);
}

/// A gray anchored rectangle lit from the front, with `bump_map` bound.
fn bumped_scene(bump_map: Option<&str>) -> Scene {
    let mut scene = Scene::new();
    let root = scene.root();
    scene
        .add_draw_state(
            root,
            DrawStateChange::NONE
                .with_surface_color(Rgba8::BLACK)
                .with_bump_map(bump_map.map(TextureRef::new)),
        )
        .unwrap();
    scene
        .create_rectangle(root, 0.8, 0.8, [0.0, 0.0], Rgba8::new(100, 100, 100, 255))
        .unwrap();
    scene
        .lighting_mut()
        .add_light(Light::point(Rgba8::WHITE, Vector::point(0.0, 0.0, 3.0), 1))
        .unwrap();
    scene
}

fn bump_renderer() -> Renderer {
    let mut source = MemoryTextureSource::new();
    // flat on the left half, tilted on the right half
    source.insert(
        TextureRef::new("ridge"),
        Texture::new(ImageSize::new(2, 1), vec![Rgba8::BLACK, Rgba8::WHITE]).unwrap(),
    );
    source.insert(
        TextureRef::new("flat"),
        Texture::new(ImageSize::new(2, 1), vec![Rgba8::BLACK, Rgba8::BLACK]).unwrap(),
    );
    let camera = Camera::new(View2D::new(Vector::ORIGIN, 2.0, ImageSize::new(10, 10))).unwrap();
    let mut renderer = Renderer::new(camera, TextureCache::new(source));
    let mut options = RenderOptions::default();
    options.shadows.enabled = false;
    options.reflections.enabled = false;
    renderer.set_options(options);
    renderer
}

#[test]
fn bump_map_perturbs_shading() {
    let mut renderer = bump_renderer();
    renderer.draw(&mut bumped_scene(Some("flat"))).unwrap();
    let flat = renderer.rendering();
    renderer.draw(&mut bumped_scene(Some("ridge"))).unwrap();
    let bumped = renderer.rendering();

    assert_eq!(bumped.flaws, Flaws::empty());
    assert_eq!(bumped.get(2, 5), flat.get(2, 5));
    assert_ne!(bumped.get(2, 5), Some(Rgba8::BLACK.to_array()));
    assert!(
        (6..9).any(|x| bumped.get(x, 5) != flat.get(x, 5)),
        "{bumped:?}\n{flat:?}"
    );
}

#[test]
fn missing_bump_map_only_flags() {
    let mut renderer = bump_renderer();
    renderer.draw(&mut bumped_scene(None)).unwrap();
    let plain = renderer.rendering();
    renderer.draw(&mut bumped_scene(Some("nowhere"))).unwrap();
    let missing = renderer.rendering();

    assert_eq!(missing.flaws, Flaws::MISSING_TEXTURES);
    assert_eq!(missing.data, plain.data);
}
