// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Skew estimation and correction from long near-horizontal line segments.
//
// Box score screens are full of long horizontal rules (row separators, table
// borders). Their slope in a photographed or captured screen is the skew.

use image::{GrayImage, Rgb, RgbImage};
use imageproc::edges::canny;
use imageproc::hough::{LineDetectionOptions, PolarLine, detect_lines};
use scorecheck_core::config::BinaryOcrParams;
use tracing::{debug, info, instrument, warn};

/// Hough accumulator non-maximum suppression radius (pixels and degrees).
const SUPPRESSION_RADIUS: u32 = 8;

/// A finite line segment between two pixel positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSegment {
    pub start: (i32, i32),
    pub end: (i32, i32),
}

impl LineSegment {
    /// Angle of the segment in degrees, `atan2(dy, dx)` in image coordinates
    /// (y grows downwards, so a segment falling to the right is positive).
    pub fn angle_degrees(&self) -> f64 {
        let dx = (self.end.0 - self.start.0) as f64;
        let dy = (self.end.1 - self.start.1) as f64;
        dy.atan2(dx).to_degrees()
    }

    pub fn length(&self) -> f64 {
        let dx = (self.end.0 - self.start.0) as f64;
        let dy = (self.end.1 - self.start.1) as f64;
        dx.hypot(dy)
    }
}

/// Parameters for turning an edge map into line segments.
#[derive(Debug, Clone, Copy)]
pub struct SegmentOptions {
    /// Minimum Hough votes for a candidate line.
    pub vote_threshold: u32,
    /// Shortest segment kept, in pixels.
    pub min_length: u32,
    /// Longest run of missing edge pixels bridged inside one segment.
    pub max_gap: u32,
}

/// Outcome of skew estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkewEstimate {
    /// Median angle of the qualifying segments, 0.0 when none qualified.
    pub angle_degrees: f64,
    /// Segments found in the edge map.
    pub segments_detected: usize,
    /// Segments that voted on the angle.
    pub segments_used: usize,
}

/// Estimate the skew of a grayscale capture.
///
/// ## Pipeline
///
/// 1. Canny edge detection
/// 2. Hough line candidates (1 degree resolution)
/// 3. Trace each candidate across the edge map into segments, bridging gaps
///    up to `max_line_gap` and keeping segments of at least
///    `max(min_line_length, width / min_line_width_divisor)` pixels
/// 4. Longest segments first, take at most `max_lines`
/// 5. Keep angles within `max_skew_degrees` of horizontal
/// 6. Median of the kept angles
#[instrument(skip(gray, params), fields(width = gray.width(), height = gray.height()))]
pub fn estimate_skew(gray: &GrayImage, params: &BinaryOcrParams) -> SkewEstimate {
    let edges = canny(gray, params.canny_low, params.canny_high);

    let options = SegmentOptions {
        vote_threshold: params.hough_vote_threshold,
        min_length: params.min_line_length_for(gray.width()),
        max_gap: params.max_line_gap,
    };
    let mut segments = detect_segments(&edges, &options);
    segments.sort_by(|a, b| b.length().total_cmp(&a.length()));
    debug!(
        segments = segments.len(),
        min_length = options.min_length,
        "Line segments detected"
    );

    let mut angles: Vec<f64> = segments
        .iter()
        .take(params.max_lines)
        .map(LineSegment::angle_degrees)
        .filter(|angle| angle.abs() <= params.max_skew_degrees)
        .collect();

    let angle = match median(&mut angles) {
        Some(angle) => angle,
        None => {
            warn!(
                segments = segments.len(),
                "No near-horizontal lines found; assuming no skew"
            );
            0.0
        }
    };

    info!(angle, used = angles.len(), "Skew estimated");
    SkewEstimate {
        angle_degrees: angle,
        segments_detected: segments.len(),
        segments_used: angles.len(),
    }
}

/// Find line segments in a binary edge map.
///
/// Candidate lines come from the Hough transform; each candidate is then
/// walked pixel by pixel across the image, and runs of edge pixels (allowing
/// one pixel of slack either side of the ideal line) become segments.
pub fn detect_segments(edges: &GrayImage, options: &SegmentOptions) -> Vec<LineSegment> {
    let lines = detect_lines(
        edges,
        LineDetectionOptions {
            vote_threshold: options.vote_threshold,
            suppression_radius: SUPPRESSION_RADIUS,
        },
    );
    debug!(candidates = lines.len(), "Hough line candidates");

    lines
        .iter()
        .flat_map(|line| trace_line(edges, line, options))
        .collect()
}

/// Walk a polar line `x cos(t) + y sin(t) = r` and split it into segments.
fn trace_line(edges: &GrayImage, line: &PolarLine, options: &SegmentOptions) -> Vec<LineSegment> {
    let (w, h) = edges.dimensions();
    let (sin, cos) = (line.angle_in_degrees as f64).to_radians().sin_cos();
    // Unit normal and direction; the direction runs left to right for
    // near-horizontal lines.
    let (nx, ny) = (cos, sin);
    let (dx, dy) = (sin, -cos);
    let (ox, oy) = (line.r as f64 * nx, line.r as f64 * ny);
    let reach = (w as f64).hypot(h as f64).ceil() as i64;
    let max_gap = options.max_gap as i64;
    let min_length = options.min_length as f64;

    let mut segments = Vec::new();
    // (start, end, t of end)
    let mut run: Option<((i32, i32), (i32, i32), i64)> = None;

    let mut close = |start: (i32, i32), end: (i32, i32)| {
        let segment = LineSegment { start, end };
        if segment.length() >= min_length {
            segments.push(segment);
        }
    };

    for t in -reach..=reach {
        let x = ox + t as f64 * dx;
        let y = oy + t as f64 * dy;
        if !is_edge_near(edges, x, y, nx, ny) {
            continue;
        }
        let here = (x.round() as i32, y.round() as i32);
        run = match run {
            Some((start, _, last)) if t - last - 1 <= max_gap => Some((start, here, t)),
            Some((start, end, _)) => {
                close(start, end);
                Some((here, here, t))
            }
            None => Some((here, here, t)),
        };
    }
    if let Some((start, end, _)) = run {
        close(start, end);
    }

    segments
}

/// True when the pixel at `(x, y)` or either neighbour along the normal is an edge.
fn is_edge_near(edges: &GrayImage, x: f64, y: f64, nx: f64, ny: f64) -> bool {
    [0.0, 1.0, -1.0].iter().any(|&k| {
        let px = (x + k * nx).round();
        let py = (y + k * ny).round();
        px >= 0.0
            && py >= 0.0
            && (px as u32) < edges.width()
            && (py as u32) < edges.height()
            && edges.get_pixel(px as u32, py as u32).0[0] > 0
    })
}

/// Median of `values` (mean of the two middle values for even counts).
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Undo a skew of `angle_degrees`: an angle of exactly 0.0 returns the source
/// pixels untouched, anything else rotates about the centre.
pub fn deskew(rgb: &RgbImage, angle_degrees: f64) -> RgbImage {
    if angle_degrees == 0.0 {
        return rgb.clone();
    }
    rotate_about_center_replicate(rgb, angle_degrees)
}

/// Rotate about the image centre, keeping the canvas size.
///
/// Positive `degrees` turn the content counter-clockwise on screen, which
/// levels a line that falls to the right by the same angle. Pixels are sampled
/// bilinearly and samples outside the source repeat the nearest edge pixel.
#[instrument(skip(rgb), fields(width = rgb.width(), height = rgb.height()))]
pub fn rotate_about_center_replicate(rgb: &RgbImage, degrees: f64) -> RgbImage {
    let (w, h) = rgb.dimensions();
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
    let (sin, cos) = degrees.to_radians().sin_cos();

    RgbImage::from_fn(w, h, |x, y| {
        let (rx, ry) = (x as f64 - cx, y as f64 - cy);
        let sx = cos * rx - sin * ry + cx;
        let sy = sin * rx + cos * ry + cy;
        sample_bilinear_replicate(rgb, sx, sy)
    })
}

fn sample_bilinear_replicate(rgb: &RgbImage, x: f64, y: f64) -> Rgb<u8> {
    let (w, h) = rgb.dimensions();
    let clamp = |v: f64, max: u32| v.clamp(0.0, (max - 1) as f64) as u32;

    let x0f = x.floor();
    let y0f = y.floor();
    let fx = x - x0f;
    let fy = y - y0f;
    let (x0, x1) = (clamp(x0f, w), clamp(x0f + 1.0, w));
    let (y0, y1) = (clamp(y0f, h), clamp(y0f + 1.0, h));

    let p00 = rgb.get_pixel(x0, y0).0;
    let p10 = rgb.get_pixel(x1, y0).0;
    let p01 = rgb.get_pixel(x0, y1).0;
    let p11 = rgb.get_pixel(x1, y1).0;

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] as f64 * (1.0 - fx) + p10[c] as f64 * fx;
        let bottom = p01[c] as f64 * (1.0 - fx) + p11[c] as f64 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

// -- Tests --------------------------------------------------------------------
