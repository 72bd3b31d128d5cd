//! Deterministic task colors. Each task id maps to a fixed hue by walking
//! the color wheel in golden-angle steps, so consecutive ids land far apart
//! without keeping a palette table anywhere.

/// Step between consecutive task ids on the hue wheel.
const GOLDEN_ANGLE: f64 = 137.508;
const SATURATION: f64 = 0.70;
const VALUE: f64 = 0.90;

/// `#rrggbb` color for a task. Pure function of the id, so the color
/// survives restarts without being re-derived differently.
pub fn task_color(id: u64) -> String {
    let hue = (id.wrapping_sub(1) % 360) as f64 * GOLDEN_ANGLE % 360.0;
    let (r, g, b) = hsv_to_rgb(hue, SATURATION, VALUE);
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> (u8, u8, u8) {
    let c = value * saturation;
    let sector = hue / 60.0;
    let x = c * (1.0 - (sector % 2.0 - 1.0).abs());
    let (r, g, b) = match sector as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = value - c;
    (
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    )
}
