// Simple color struct, created from an unsigned 32 representing RRGGBBAA

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

// Blue, violet and slate, all at 0.7 alpha
pub const PALETTE: [Color; 3] = [
    Color::from_u32(0x3b82f6b3),
    Color::from_u32(0x8b5cf6b3),
    Color::from_u32(0x4b5563b3),
];

impl Color {
    pub const fn from_u32(num: u32) -> Color {
        let r = (num >> 24) as u8;
        let g = (num >> 16) as u8;
        let b = (num >> 8) as u8;
        let a = num as u8;

        Color { r, g, b, a }
    }

    // Formats as a canvas style string, e.g. "rgba(59, 130, 246, 0.70)"
    pub fn to_css(&self) -> String {
        format!(
            "rgba({}, {}, {}, {:.2})",
            self.r,
            self.g,
            self.b,
            self.a as f64 / 255.0
        )
    }
}
