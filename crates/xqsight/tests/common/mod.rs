//! Synthetic screenshots: a framed board with grid lines and flat discs for
//! pieces, drawn on a light desktop background.

#![allow(dead_code)]

use nalgebra::Point2;
use xqsight::core::{homography_from_4pt, sample_bilinear_rgb, ColorImage};
use xqsight::position::{Grid, Side};

pub const ORIGIN: (usize, usize) = (50, 40);
pub const CELL: usize = 50;
pub const BOARD_W: usize = 9 * CELL;
pub const BOARD_H: usize = 10 * CELL;

const DESKTOP: [u8; 3] = [245, 245, 245];
const WOOD: [u8; 3] = [225, 190, 140];
const FRAME: [u8; 3] = [40, 30, 20];
const LINE: [u8; 3] = [90, 70, 50];
const RED_INK: [u8; 3] = [200, 30, 30];
const BLACK_INK: [u8; 3] = [30, 30, 30];

pub fn blank_canvas() -> ColorImage {
    ColorImage::filled(BOARD_W + 110, BOARD_H + 100, DESKTOP)
}

/// Draw `grid` with point `(row, col)` at the centre of cell `(row, col)` of
/// the board rectangle.
pub fn render(grid: &Grid) -> ColorImage {
    let mut img = blank_canvas();
    let (x0, y0) = ORIGIN;
    let (x1, y1) = (x0 + BOARD_W - 1, y0 + BOARD_H - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            let frame = x < x0 + 3 || x + 3 > x1 || y < y0 + 3 || y + 3 > y1;
            img.put_pixel(x, y, if frame { FRAME } else { WOOD });
        }
    }

    let half = CELL / 2;
    for col in 0..9 {
        let x = x0 + col * CELL + half;
        for y in y0 + half..=y0 + BOARD_H - half {
            img.put_pixel(x, y, LINE);
        }
    }
    for row in 0..10 {
        let y = y0 + row * CELL + half;
        for x in x0 + half..=x0 + BOARD_W - half {
            img.put_pixel(x, y, LINE);
        }
    }

    for ((row, col), piece) in grid.pieces() {
        let ink = match piece.side {
            Side::Red => RED_INK,
            Side::Black => BLACK_INK,
        };
        let cx = (x0 + col * CELL + half) as f32;
        let cy = (y0 + row * CELL + half) as f32;
        let r = 18.0f32;
        for y in (cy - r) as usize..=(cy + r) as usize {
            for x in (cx - r) as usize..=(cx + r) as usize {
                let (dx, dy) = (x as f32 - cx, y as f32 - cy);
                if dx * dx + dy * dy <= r * r {
                    img.put_pixel(x, y, ink);
                }
            }
        }
    }
    img
}

/// Outer corners of the board frame in `render` output, edge coordinates,
/// `[TL, TR, BR, BL]`.
pub fn board_outline() -> [Point2<f32>; 4] {
    let (x0, y0) = (ORIGIN.0 as f32, ORIGIN.1 as f32);
    let (x1, y1) = (x0 + BOARD_W as f32, y0 + BOARD_H as f32);
    [
        Point2::new(x0, y0),
        Point2::new(x1, y0),
        Point2::new(x1, y1),
        Point2::new(x0, y1),
    ]
}

/// Re-project `img` so that `board_outline()` lands on `to` (edge
/// coordinates). Points falling outside the source show the desktop.
pub fn reproject(img: &ColorImage, to: [Point2<f32>; 4]) -> ColorImage {
    let h_src_from_dst = homography_from_4pt(&to, &board_outline()).unwrap();
    let src = img.view();
    let mut out = ColorImage::filled(img.width, img.height, DESKTOP);
    for y in 0..out.height {
        for x in 0..out.width {
            let p = h_src_from_dst.apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
            let (sx, sy) = (p.x - 0.5, p.y - 0.5);
            if sx >= 0.0 && sy >= 0.0 && sx <= (img.width - 1) as f32 && sy <= (img.height - 1) as f32 {
                out.put_pixel(x, y, sample_bilinear_rgb(&src, sx, sy));
            }
        }
    }
    out
}
