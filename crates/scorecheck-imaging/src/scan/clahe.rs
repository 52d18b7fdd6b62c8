// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contrast-limited adaptive histogram equalization (CLAHE).
//
// The image is split into a grid of tiles. Each tile gets its own equalization
// lookup table built from a clipped histogram, and every pixel is mapped
// through a bilinear blend of the four nearest tile tables so tile seams
// don't show.

use image::{GrayImage, Luma};
use scorecheck_core::config::ClaheParams;
use tracing::{debug, instrument};

/// Equalize local contrast of `gray` using the given clip limit and tile grid.
#[instrument(skip(gray), fields(width = gray.width(), height = gray.height()))]
pub fn clahe(gray: &GrayImage, params: &ClaheParams) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }

    let grid = TileGrid::new(w, h, params.tiles_x, params.tiles_y);
    debug!(
        tile_w = grid.tile_w,
        tile_h = grid.tile_h,
        tiles_x = grid.tiles_x,
        tiles_y = grid.tiles_y,
        clip_limit = params.clip_limit,
        "Building CLAHE lookup tables"
    );

    let mut luts = Vec::with_capacity((grid.tiles_x * grid.tiles_y) as usize);
    for ty in 0..grid.tiles_y {
        for tx in 0..grid.tiles_x {
            let (x0, x1) = grid.span_x(tx);
            let (y0, y1) = grid.span_y(ty);
            luts.push(tile_lut(gray, x0, x1, y0, y1, params.clip_limit));
        }
    }
    let lut_at = |tx: u32, ty: u32| &luts[(ty * grid.tiles_x + tx) as usize];

    GrayImage::from_fn(w, h, |x, y| {
        let v = gray.get_pixel(x, y).0[0] as usize;
        let (tx1, tx2, xa) = neighbours(x, grid.tile_w, grid.tiles_x);
        let (ty1, ty2, ya) = neighbours(y, grid.tile_h, grid.tiles_y);

        let top = lut_at(tx1, ty1)[v] as f32 * (1.0 - xa) + lut_at(tx2, ty1)[v] as f32 * xa;
        let bottom = lut_at(tx1, ty2)[v] as f32 * (1.0 - xa) + lut_at(tx2, ty2)[v] as f32 * xa;
        let blended = top * (1.0 - ya) + bottom * ya;
        Luma([blended.round().clamp(0.0, 255.0) as u8])
    })
}

/// Tile layout covering the whole image. Trailing tiles may be narrower.
struct TileGrid {
    tile_w: u32,
    tile_h: u32,
    tiles_x: u32,
    tiles_y: u32,
    width: u32,
    height: u32,
}

impl TileGrid {
    fn new(width: u32, height: u32, tiles_x: u32, tiles_y: u32) -> Self {
        let tile_w = width.div_ceil(tiles_x.clamp(1, width));
        let tile_h = height.div_ceil(tiles_y.clamp(1, height));
        Self {
            tile_w,
            tile_h,
            tiles_x: width.div_ceil(tile_w),
            tiles_y: height.div_ceil(tile_h),
            width,
            height,
        }
    }

    fn span_x(&self, tx: u32) -> (u32, u32) {
        (tx * self.tile_w, ((tx + 1) * self.tile_w).min(self.width))
    }

    fn span_y(&self, ty: u32) -> (u32, u32) {
        (ty * self.tile_h, ((ty + 1) * self.tile_h).min(self.height))
    }
}

/// The two tiles whose centres bracket `pos`, and the weight of the second.
fn neighbours(pos: u32, tile_size: u32, tiles: u32) -> (u32, u32, f32) {
    let f = pos as f32 / tile_size as f32 - 0.5;
    let lower = f.floor();
    let weight = f - lower;
    let first = (lower as i64).clamp(0, tiles as i64 - 1) as u32;
    let second = (lower as i64 + 1).clamp(0, tiles as i64 - 1) as u32;
    (first, second, weight)
}

/// Equalization table for one tile from its clipped histogram.
fn tile_lut(gray: &GrayImage, x0: u32, x1: u32, y0: u32, y1: u32, clip_limit: f32) -> [u8; 256] {
    let mut histogram = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            histogram[gray.get_pixel(x, y).0[0] as usize] += 1;
        }
    }
    let area = (x1 - x0) * (y1 - y0);

    if clip_limit > 0.0 {
        let clip = ((clip_limit * area as f32 / 256.0) as u32).max(1);
        clip_histogram(&mut histogram, clip);
    }

    let scale = 255.0 / area.max(1) as f32;
    let mut lut = [0u8; 256];
    let mut cumulative = 0u32;
    for (level, count) in histogram.iter().enumerate() {
        cumulative += count;
        lut[level] = (cumulative as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Cap every bin at `clip` and spread the excess evenly over all bins.
fn clip_histogram(histogram: &mut [u32; 256], clip: u32) {
    let mut excess = 0u32;
    for count in histogram.iter_mut() {
        if *count > clip {
            excess += *count - clip;
            *count = clip;
        }
    }

    let increment = excess / 256;
    let mut residual = excess % 256;
    for count in histogram.iter_mut() {
        *count += increment;
    }

    if residual > 0 {
        let step = (256 / residual as usize).max(1);
        let mut level = 0;
        while level < 256 && residual > 0 {
            histogram[level] += 1;
            residual -= 1;
            level += step;
        }
    }
}
