use pixel_tools::background::{classify_and_apply, remove_background};
use pixel_tools::codec::{decode, encode_png};
use pixel_tools::enhance::{adjust_tone, enhance, unsharp_mask};
use pixel_tools::redact::blur_regions;
use pixel_tools::resample::{capped_dimensions, compress, resize};
use pixel_tools::{
    compose, BackgroundMode, BackgroundSettings, CompressSettings, EnhanceSettings, JoinSettings,
    OutputFormat, RasterImage, RedactSettings, ResizeFilter, ToneSettings,
};
use proptest::prelude::*;

fn arb_image(max_side: u32) -> impl Strategy<Value = RasterImage> {
    (1..=max_side, 1..=max_side).prop_flat_map(|(w, h)| {
        proptest::collection::vec(any::<u8>(), (w * h * 4) as usize)
            .prop_map(move |data| RasterImage::from_raw(w, h, data).unwrap())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn raw_buffer_must_match_dimensions(w in 1u32..32, h in 1u32..32, extra in 1usize..8) {
        let exact = (w * h * 4) as usize;
        prop_assert!(RasterImage::from_raw(w, h, vec![0; exact]).is_ok());
        prop_assert!(RasterImage::from_raw(w, h, vec![0; exact + extra]).is_err());
        prop_assert!(RasterImage::from_raw(w, h, vec![0; exact - 1]).is_err());
    }

    #[test]
    fn remove_background_is_idempotent(img in arb_image(12), tolerance in any::<u8>()) {
        let settings = BackgroundSettings { tolerance, ..Default::default() };
        let mut once = img.clone();
        let first = remove_background(&mut once, &settings);
        let mut twice = once.clone();
        let second = remove_background(&mut twice, &settings);

        prop_assert_eq!(once, twice);
        prop_assert_eq!(first.matched_pixels, second.matched_pixels);
    }

    #[test]
    fn background_pass_keeps_size_and_reference_pixel(img in arb_image(12), tolerance in 1u8..=255) {
        let mut out = img.clone();
        let result = classify_and_apply(&mut out, tolerance, BackgroundMode::Remove);

        prop_assert_eq!(out.dimensions(), img.dimensions());
        prop_assert_eq!(out.as_bytes().len(), img.as_bytes().len());
        // the reference pixel always matches itself
        prop_assert!(result.matched_pixels >= 1);
        prop_assert_eq!(out.pixel(0, 0)[3], 0);
    }

    #[test]
    fn zero_tolerance_matches_nothing(img in arb_image(12)) {
        let mut out = img.clone();
        let result = classify_and_apply(&mut out, 0, BackgroundMode::Remove);
        prop_assert_eq!(result.matched_pixels, 0);
        prop_assert_eq!(out, img);
    }

    #[test]
    fn neutral_tone_is_identity(img in arb_image(10)) {
        let neutral = ToneSettings { brightness: 100.0, contrast: 50.0, saturation: 100.0 };
        let mut out = img.clone();
        adjust_tone(&mut out, &neutral);
        prop_assert_eq!(out, img);
    }

    #[test]
    fn tone_never_touches_alpha(
        img in arb_image(10),
        brightness in 50f32..150.0,
        contrast in 50f32..150.0,
        saturation in 0f32..200.0,
    ) {
        let mut out = img.clone();
        adjust_tone(&mut out, &ToneSettings { brightness, contrast, saturation });
        for (a, b) in out.as_bytes().chunks_exact(4).zip(img.as_bytes().chunks_exact(4)) {
            prop_assert_eq!(a[3], b[3]);
        }
    }

    #[test]
    fn zero_sharpness_is_identity(img in arb_image(10)) {
        let mut out = img.clone();
        unsharp_mask(&mut out, 0.0).unwrap();
        prop_assert_eq!(out, img);
    }

    #[test]
    fn resize_hits_requested_size(img in arb_image(16), w in 1u32..48, h in 1u32..48) {
        let out = resize(&img, w, h, ResizeFilter::Bilinear).unwrap();
        prop_assert_eq!(out.dimensions(), (w, h));
        prop_assert_eq!(out.as_bytes().len(), (w * h * 4) as usize);
    }

    #[test]
    fn enhance_keeps_buffer_length(
        img in arb_image(12),
        sharpness in 0f32..=10.0,
        denoise in any::<bool>(),
    ) {
        let settings = EnhanceSettings { sharpness, denoise, ..Default::default() };
        let out = enhance(&img, &settings).unwrap();
        let (w, h) = img.dimensions();
        prop_assert_eq!(out.dimensions(), (w, h));
        prop_assert_eq!(out.as_bytes().len(), (w * h * 4) as usize);
    }

    #[test]
    fn redact_keeps_buffer_length(img in arb_image(24)) {
        let settings = RedactSettings { blur_radius: 5.0, ..Default::default() };
        let out = blur_regions(&img, &settings).unwrap();
        let (w, h) = img.dimensions();
        prop_assert_eq!(out.dimensions(), (w, h));
        prop_assert_eq!(out.as_bytes().len(), (w * h * 4) as usize);
    }

    #[test]
    fn join_output_matches_layout(photo in arb_image(16), sign in arb_image(16), padding in 0u32..=20) {
        let settings = JoinSettings { padding, ..Default::default() };
        let plan = compose::layout(photo.dimensions(), sign.dimensions(), &settings);
        let out = compose::join_signature(&photo, &sign, &settings).unwrap();
        let (cw, ch) = plan.canvas;
        prop_assert_eq!(out.dimensions(), (cw, ch));
        prop_assert_eq!(out.as_bytes().len(), (cw * ch * 4) as usize);
    }

    #[test]
    fn full_quality_png_compress_is_within_raw_size(
        w in 16u32..64,
        h in 16u32..64,
        rgba in any::<[u8; 4]>(),
    ) {
        let img = RasterImage::from_pixel(w, h, rgba).unwrap();
        let source = encode_png(&img).unwrap();
        let decoded = decode(&source.bytes).unwrap();
        let settings = CompressSettings { quality: 1.0, ..Default::default() };

        let (encoded, _) = compress(&decoded.image, decoded.mime, source.len(), &settings).unwrap();
        prop_assert_eq!(encoded.format, OutputFormat::Png);
        prop_assert!(encoded.len() <= (w * h * 4) as usize);
    }

    #[test]
    fn capped_width_never_exceeds_max(w in 1u32..10_000, h in 1u32..10_000, max in 1u32..4_000) {
        let (cw, ch) = capped_dimensions((w, h), max);
        prop_assert!(cw <= max);
        prop_assert!(cw <= w);
        prop_assert!(ch >= 1 && ch <= h);
    }

    #[test]
    fn join_canvas_holds_photo(
        pw in 1u32..400,
        ph in 1u32..400,
        sw in 1u32..400,
        sh in 1u32..400,
        padding in 0u32..=50,
    ) {
        let settings = JoinSettings { padding, ..Default::default() };
        let plan = compose::layout((pw, ph), (sw, sh), &settings);
        prop_assert!(plan.canvas.0 >= pw + padding * 2);
        prop_assert!(plan.canvas.1 >= ph + padding * 2);
    }
}

#[test]
fn four_by_four_white_with_black_pixel() {
    let mut img = RasterImage::from_pixel(4, 4, [255, 255, 255, 255]).unwrap();
    img.set_pixel(1, 1, [0, 0, 0, 255]);

    let result = remove_background(&mut img, &BackgroundSettings::default());

    assert_eq!(result.matched_pixels, 15);
    assert_eq!(img.pixel(1, 1), [0, 0, 0, 255]);
    assert_eq!(img.pixel(3, 3), [255, 255, 255, 0]);
}
