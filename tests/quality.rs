use zenpalette::{
    ClusterSpace, DensityParams, KMeansConfig, Method, Palette, PaletteConfig,
    PaletteSortStrategy, Pixel, PixelGroup, hdbscan, kmeans, lab_to_rgb, rgb_to_lab,
};

/// Mean squared ΔE76 between each pixel and its nearest palette entry.
fn compute_mse(pixels: &[Pixel], palette: &Palette) -> f32 {
    let mut total = 0.0f32;
    for pixel in pixels {
        let idx = palette.nearest(*pixel).unwrap();
        total += rgb_to_lab(*pixel).distance_sq(palette.swatches()[idx].lab);
    }
    total / pixels.len() as f32
}

/// Sum of squared RGB distances from each pixel to its group mean.
fn within_group_sse(groups: &[PixelGroup]) -> f64 {
    let mut total = 0.0f64;
    for group in groups {
        let Some(mean) = group.mean() else {
            continue;
        };
        for p in group.pixels() {
            let dr = p.r as f64 - mean.r as f64;
            let dg = p.g as f64 - mean.g as f64;
            let db = p.b as f64 - mean.b as f64;
            total += dr * dr + dg * dg + db * db;
        }
    }
    total
}

fn gradient_image(width: usize, height: usize) -> Vec<Pixel> {
    let mut pixels = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            let b = ((x + y) * 128 / (width + height).max(1)) as u8;
            pixels.push(Pixel { r, g, b });
        }
    }
    pixels
}

fn palette_for(pixels: &[Pixel], method: Method) -> Palette {
    let config = PaletteConfig::new().method(method);
    zenpalette::extract_palette(pixels, &config).unwrap()
}

#[test]
fn more_median_cut_groups_lower_mse() {
    let pixels = gradient_image(64, 64);
    let mse_4 = compute_mse(&pixels, &palette_for(&pixels, Method::median_cut(4)));
    let mse_32 = compute_mse(&pixels, &palette_for(&pixels, Method::median_cut(32)));
    assert!(
        mse_32 < mse_4,
        "32 groups should beat 4: mse_4={mse_4:.2}, mse_32={mse_32:.2}"
    );
}

#[test]
fn finer_histogram_grid_lower_mse() {
    let pixels = gradient_image(64, 64);
    let coarse = compute_mse(&pixels, &palette_for(&pixels, Method::Histogram { grid_size: 2 }));
    let fine = compute_mse(&pixels, &palette_for(&pixels, Method::Histogram { grid_size: 8 }));
    assert!(fine < coarse, "coarse={coarse:.2}, fine={fine:.2}");
}

#[test]
fn more_kmeans_clusters_lower_mse() {
    let pixels = gradient_image(48, 48);
    let mse_2 = compute_mse(&pixels, &palette_for(&pixels, Method::kmeans(2)));
    let mse_16 = compute_mse(&pixels, &palette_for(&pixels, Method::kmeans(16)));
    assert!(mse_16 < mse_2, "mse_2={mse_2:.2}, mse_16={mse_16:.2}");
}

#[test]
fn kmeans_iterations_never_worsen_fit() {
    let pixels = gradient_image(40, 40);
    let first = kmeans::kmeans(&pixels, &KMeansConfig::new(8).max_iterations(1)).unwrap();
    let full = kmeans::kmeans(&pixels, &KMeansConfig::new(8)).unwrap();
    assert!(full.iterations >= first.iterations);
    let sse_first = within_group_sse(&first.clusters);
    let sse_full = within_group_sse(&full.clusters);
    assert!(
        sse_full <= sse_first + 1e-6,
        "first={sse_first:.1}, full={sse_full:.1}"
    );
}

#[test]
fn lab_roundtrip_over_cube() {
    for r in (0..=255u8).step_by(15) {
        for g in (0..=255u8).step_by(15) {
            for b in (0..=255u8).step_by(15) {
                let p = Pixel { r, g, b };
                let back = lab_to_rgb(rgb_to_lab(p));
                assert!(
                    back.r.abs_diff(r) <= 1 && back.g.abs_diff(g) <= 1 && back.b.abs_diff(b) <= 1,
                    "{p:?} -> {back:?}"
                );
            }
        }
    }
}

#[test]
fn density_finds_separated_blobs_in_lab() {
    let blobs = [
        (Pixel { r: 200, g: 40, b: 40 }, Pixel { r: 210, g: 44, b: 40 }),
        (Pixel { r: 40, g: 60, b: 200 }, Pixel { r: 40, g: 70, b: 190 }),
        (Pixel { r: 240, g: 230, b: 90 }, Pixel { r: 230, g: 230, b: 100 }),
    ];
    let mut pixels = Vec::new();
    for (a, b) in blobs {
        pixels.extend(vec![a; 40]);
        pixels.extend(vec![b; 40]);
    }

    let params = DensityParams::new(50, 5);
    let result = hdbscan::cluster_pixels(&pixels, &params, ClusterSpace::Lab).unwrap();
    assert_eq!(result.clusters.len(), 3);
    assert!(result.noise.is_empty());
    assert!(result.labels.iter().all(|l| l.is_some()));

    for (a, b) in blobs {
        let expected = (
            (a.r as f32 + b.r as f32) / 2.0,
            (a.g as f32 + b.g as f32) / 2.0,
            (a.b as f32 + b.b as f32) / 2.0,
        );
        let found = result.means().iter().any(|m| {
            (m.r - expected.0).abs() < 0.01
                && (m.g - expected.1).abs() < 0.01
                && (m.b - expected.2).abs() < 0.01
        });
        assert!(found, "no cluster centered on {expected:?}");
    }
}

#[test]
fn delta_sort_smooths_transitions() {
    let pixels = gradient_image(32, 32);
    let adjacent_delta = |strategy: PaletteSortStrategy| -> f32 {
        let config = PaletteConfig::new()
            .method(Method::median_cut(16))
            .sort(strategy);
        let palette = zenpalette::extract_palette(&pixels, &config).unwrap();
        palette
            .swatches()
            .windows(2)
            .map(|w| w[0].lab.delta_e(w[1].lab))
            .sum()
    };

    let population = adjacent_delta(PaletteSortStrategy::Population);
    let delta = adjacent_delta(PaletteSortStrategy::DeltaMinimize);
    assert!(
        delta <= population,
        "delta-minimized order should have smaller jumps: population={population:.1}, delta={delta:.1}"
    );
}
