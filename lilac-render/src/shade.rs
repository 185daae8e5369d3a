//! The lighting model.

use lilac::camera::Eye;
use lilac::math::{Rgb, Vector};
use lilac::{Light, LightKind};

use crate::{FogOptions, Flaws, RenderOptions};

/// Surface properties at one point, in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
#[expect(clippy::exhaustive_structs)]
pub struct ShadeInput {
    /// Position of the shaded point.
    pub position: Vector,
    /// Surface normal; need not be unit length. A zero normal receives ambient light only.
    pub normal: Vector,
    /// Base color, lit by diffuse and ambient light.
    pub body: Rgb,
    /// Color of specular highlights.
    pub surface: Rgb,
}

/// Computes the lit color of a surface point.
///
/// Ambient lights contribute `light · body`. Point lights contribute
/// `light · (body · (L·N) + surface · (H·N)^sharpness)`, attenuated by distance
/// according to [`RenderOptions::light_falloff`], where `L` points toward the light and
/// `H` is halfway between `L` and the direction toward the viewer. Surfaces facing away
/// from a light are lit as if they faced it when [`RenderOptions::two_sided_lighting`]
/// is set, and not at all otherwise.
///
/// With no lights at all, the body color is returned unlit.
///
/// Components of the result may exceed 1; they are clamped when stored.
pub fn shade(
    input: &ShadeInput,
    lights: &[Light],
    eye: Eye,
    options: &RenderOptions,
    flaws: &mut Flaws,
) -> Rgb {
    if lights.is_empty() {
        return input.body;
    }
    let normal = input.normal.normalize();
    if normal.is_none() && lights.iter().any(|l| l.kind == LightKind::Point) {
        *flaws |= Flaws::UNLIT_FACETS;
    }

    let mut total = Rgb::ZERO;
    for light in lights {
        let light_color = light.color.to_rgb();
        match light.kind {
            LightKind::Ambient => total += light_color * input.body,
            LightKind::Point => {
                let Some(n) = normal else { continue };
                let to_light = light.position - input.position;
                let Some(l) = to_light.normalize() else {
                    continue;
                };
                let v = eye.direction_from(input.position).unwrap_or(n);
                let h = ((l + v) * 0.5).normalize().unwrap_or(n);

                let mut ln = l.dot(n);
                let mut hn = h.dot(n);
                if ln < 0.0 {
                    if !options.two_sided_lighting {
                        continue;
                    }
                    ln = -ln;
                    hn = -hn;
                }
                let specular = match light.sharpness {
                    0 => 1.0,
                    s => hn.max(0.0).powi(i32::try_from(s).unwrap_or(i32::MAX)),
                };
                let distance_squared = to_light.dot(to_light);
                let attenuation = 1.0 / (1.0 + options.light_falloff * distance_squared);

                total += light_color
                    * (input.body * ln + input.surface * specular)
                    * attenuation;
            }
            _ => {}
        }
    }
    total
}

/// Fades `color` toward the fog color in proportion to `depth`.
pub fn fog(color: Rgb, depth: f64, options: &FogOptions) -> Rgb {
    if !(options.magnitude > 0.0) {
        return color;
    }
    let t = (depth * options.magnitude / 100.0).clamp(0.0, 1.0);
    color.lerp(options.color.to_rgb(), t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lilac::math::Rgba8;
    use pretty_assertions::assert_eq;

    const EYE: Eye = Eye::Direction(Vector::direction(0.0, 0.0, 1.0));

    fn input(normal: Vector) -> ShadeInput {
        ShadeInput {
            position: Vector::ORIGIN,
            normal,
            body: Rgb::new(0.5, 0.25, 1.0),
            surface: Rgb::ONE,
        }
    }

    fn no_falloff() -> RenderOptions {
        RenderOptions {
            light_falloff: 0.0,
            ..RenderOptions::default()
        }
    }

    #[test]
    fn ambient_never_exceeds_base() {
        let gray = Light::ambient(Rgba8::new(200, 200, 200, 255));
        let mut flaws = Flaws::empty();
        let lit = shade(
            &input(Vector::direction(0.0, 0.0, 1.0)),
            &[gray],
            EYE,
            &RenderOptions::default(),
            &mut flaws,
        );
        let base = input(Vector::ZERO).body;
        assert!(lit.red() <= base.red());
        assert!(lit.green() <= base.green());
        assert!(lit.blue() <= base.blue());
        assert_eq!(flaws, Flaws::empty());
    }

    #[test]
    fn head_on_point_light() {
        let light = Light::point(Rgba8::WHITE, Vector::point(0.0, 0.0, 10.0), 0);
        let mut flaws = Flaws::empty();
        let lit = shade(
            &input(Vector::direction(0.0, 0.0, 2.0)),
            &[light],
            EYE,
            &no_falloff(),
            &mut flaws,
        );
        // diffuse = body, specular = surface
        assert_eq!(lit, Rgb::new(1.5, 1.25, 2.0));
    }

    #[test]
    fn back_face_depends_on_two_sided() {
        let light = Light::point(Rgba8::WHITE, Vector::point(0.0, 0.0, -10.0), 4);
        let back = input(Vector::direction(0.0, 0.0, 1.0));
        let mut flaws = Flaws::empty();
        let mut options = no_falloff();
        let two = shade(&back, &[light.clone()], EYE, &options, &mut flaws);
        assert!(two.red() > 0.0);
        options.two_sided_lighting = false;
        let one = shade(&back, &[light], EYE, &options, &mut flaws);
        assert_eq!(one, Rgb::ZERO);
    }

    #[test]
    fn falloff_dims_distant_lights() {
        let near = Light::point(Rgba8::WHITE, Vector::point(0.0, 0.0, 1.0), 0);
        let far = Light::point(Rgba8::WHITE, Vector::point(0.0, 0.0, 30.0), 0);
        let options = RenderOptions::default();
        let mut flaws = Flaws::empty();
        let n = Vector::direction(0.0, 0.0, 1.0);
        let a = shade(&input(n), &[near], EYE, &options, &mut flaws);
        let b = shade(&input(n), &[far], EYE, &options, &mut flaws);
        assert!(a.red() > b.red());
    }

    #[test]
    fn zero_normal_is_flagged() {
        let lights = [
            Light::ambient(Rgba8::WHITE),
            Light::point(Rgba8::WHITE, Vector::point(0.0, 0.0, 1.0), 1),
        ];
        let mut flaws = Flaws::empty();
        let lit = shade(
            &input(Vector::ZERO),
            &lights,
            EYE,
            &RenderOptions::default(),
            &mut flaws,
        );
        assert_eq!(lit, input(Vector::ZERO).body);
        assert_eq!(flaws, Flaws::UNLIT_FACETS);
    }

    #[test]
    fn no_lights_is_unlit() {
        let mut flaws = Flaws::empty();
        let i = input(Vector::direction(0.0, 1.0, 0.0));
        assert_eq!(
            shade(&i, &[], EYE, &RenderOptions::default(), &mut flaws),
            i.body
        );
    }

    #[test]
    fn fog_fades_with_depth() {
        let options = FogOptions {
            magnitude: 50.0,
            color: Rgba8::WHITE,
        };
        assert_eq!(fog(Rgb::ZERO, 0.0, &options), Rgb::ZERO);
        assert_eq!(fog(Rgb::ZERO, 1.0, &options), Rgb::new(0.5, 0.5, 0.5));
        assert_eq!(fog(Rgb::ZERO, 10.0, &options), Rgb::ONE);
        assert_eq!(fog(Rgb::ZERO, 10.0, &FogOptions::default()), Rgb::ZERO);
    }
}
