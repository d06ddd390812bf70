//! Renders a sampled sphere with each supported blend mode.
//!
//! Usage: `cargo run --example volume_demo [options.json]`
//!
//! The optional JSON file overrides the mapper options, for example
//! `{"sample_distance": 0.01, "background_color": [0.1, 0.1, 0.2]}`.

use volray::*;

fn main() -> Result<()> {
    init();

    let options = match std::env::args().nth(1) {
        Some(path) => MapperOptions::from_json_file(path)?,
        None => MapperOptions {
            sample_distance: 0.02,
            ..MapperOptions::default()
        },
    };

    // Density falls off linearly from the center of a unit sphere
    let source = ImplicitSource::new(
        [64, 64, 64],
        DVec3::splat(-1.0),
        DVec3::splat(1.0),
        |p| (255.0 * (1.0 - p.length())).clamp(0.0, 255.0) as f32,
    );

    let mut mapper = VolumeMapper::with_options(options)?;
    mapper.set_input(source);
    mapper.add_observer(|event| log::debug!("{event:?}"));

    let mut volume = Volume::new();
    let property = volume.property_mut();
    property.set_interpolation(Interpolation::Linear);
    property.set_shade(true);
    let color = property.color_mut();
    color.add_rgb_point(0.0, 0.0, 0.0, 0.3);
    color.add_rgb_point(128.0, 0.9, 0.5, 0.1);
    color.add_rgb_point(255.0, 1.0, 1.0, 0.9);
    let opacity = property.scalar_opacity_mut();
    opacity.add_point(0.0, 0.0);
    opacity.add_point(40.0, 0.0);
    opacity.add_point(255.0, 0.8);

    for mode in [
        BlendMode::Composite,
        BlendMode::MaximumIntensity,
        BlendMode::MinimumIntensity,
        BlendMode::Additive,
    ] {
        mapper.set_blend_mode(mode);
        let filename = format!("volume_demo_{}.png", mode.name().replace(' ', "_"));
        render_to_file(&filename, &mut mapper, &mut volume, 640, 480)?;
        println!(
            "{filename}: rendered in {:?}",
            mapper.last_draw_time()
        );
    }

    Ok(())
}
