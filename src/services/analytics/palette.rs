/// Base palette as RGB triples: red, blue, yellow, teal, purple, orange,
/// grey, pink, green, violet.
const BASE_COLORS: [(u8, u8, u8); 10] = [
    (255, 99, 132),
    (54, 162, 235),
    (255, 205, 86),
    (75, 192, 192),
    (153, 102, 255),
    (255, 159, 64),
    (201, 203, 207),
    (255, 99, 255),
    (99, 255, 132),
    (132, 99, 255),
];

pub const PRIMARY_LINE: &str = "#3B82F6";

/// `count` colors cycling through the base palette. An `alpha` of exactly 1
/// yields opaque `rgb(..)` strings, anything else `rgba(..)`.
pub fn colors(count: usize, alpha: f64) -> Vec<String> {
    BASE_COLORS
        .iter()
        .cycle()
        .take(count)
        .map(|&(r, g, b)| {
            if alpha == 1.0 {
                format!("rgb({}, {}, {})", r, g, b)
            } else {
                format!("rgba({}, {}, {}, {})", r, g, b, alpha)
            }
        })
        .collect()
}

/// The primary line color with the given transparency.
pub fn primary_fill(alpha: f64) -> String {
    format!("rgba(59, 130, 246, {})", alpha)
}
