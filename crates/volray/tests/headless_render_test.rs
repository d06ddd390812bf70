//! Headless rendering integration tests.
//!
//! These need a GPU adapter (real or software fallback). Without one the
//! device cannot be created and the test prints a note and returns.

use volray::*;

fn has_nontrivial_content(pixels: &[u8], width: u32, height: u32) -> bool {
    let total = (width * height) as usize;
    assert_eq!(pixels.len(), total * 4, "pixel buffer size mismatch");
    let first = &pixels[0..4];
    !pixels.chunks(4).all(|px| px == first)
}

fn density_sphere() -> ImplicitSource {
    ImplicitSource::new(
        [32, 32, 32],
        DVec3::splat(-1.0),
        DVec3::splat(1.0),
        |p| (255.0 * (1.0 - p.length())).clamp(0.0, 255.0) as f32,
    )
}

#[test]
fn headless_render_tests() {
    init();
    let (width, height) = (160, 120);

    let mut mapper = VolumeMapper::with_options(MapperOptions {
        sample_distance: 0.05,
        ..MapperOptions::default()
    })
    .unwrap();
    mapper.set_input(density_sphere());
    let mut volume = Volume::new();
    volume.property_mut().set_interpolation(Interpolation::Linear);
    volume.property_mut().scalar_opacity_mut().add_point(0.0, 0.0);
    volume.property_mut().scalar_opacity_mut().add_point(255.0, 1.0);

    // --- Composite ---
    let pixels = match render_to_image(&mut mapper, &mut volume, width, height) {
        Ok(pixels) => pixels,
        Err(Error::Render(RenderError::AdapterCreationFailed | RenderError::DeviceCreationFailed(_))) => {
            eprintln!("Skipping headless tests: no GPU adapter available");
            return;
        }
        Err(e) => panic!("headless render failed: {e}"),
    };
    assert!(
        has_nontrivial_content(&pixels, width, height),
        "composite render should differ from the background"
    );
    // Corners see only background
    assert_eq!(&pixels[0..4], &[0, 0, 0, 255]);

    // --- Maximum intensity, rendered again on a fresh device ---
    mapper.set_blend_mode(BlendMode::MaximumIntensity);
    let pixels = render_to_image(&mut mapper, &mut volume, width, height).unwrap();
    assert!(has_nontrivial_content(&pixels, width, height));

    // --- Background color comes from the options ---
    let mut options = mapper.options().clone();
    options.background_color = Vec3::new(0.0, 0.0, 1.0);
    mapper.set_options(options).unwrap();
    let pixels = render_to_image(&mut mapper, &mut volume, width, height).unwrap();
    assert_eq!(&pixels[0..4], &[0, 0, 255, 255]);

    // --- Save to file ---
    let path = std::env::temp_dir().join("volray_headless_test.png");
    render_to_file(&path, &mut mapper, &mut volume, width, height).unwrap();
    assert!(path.exists());
    let _ = std::fs::remove_file(&path);
}

#[test]
fn headless_render_without_scalars_fails_early() {
    let mut mapper = VolumeMapper::new();
    mapper.set_input(ImageData::new([2, 2, 2]));
    let mut volume = Volume::new();
    assert!(matches!(
        render_to_image(&mut mapper, &mut volume, 8, 8),
        Err(Error::NothingToRender(_))
    ));
}
