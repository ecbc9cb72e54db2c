use eframe::egui::Color32;

pub trait ColorExt {
    fn from_hex(hex: &str) -> Option<Self>
    where
        Self: Sized;
}

impl ColorExt for Color32 {
    fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if hex.len() != 6 {
            return None;
        }

        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

        Some(Color32::from_rgb(r, g, b))
    }
}

/// Parse the server's style colours, falling back so callers can always index
/// the first entry. Unparseable entries are dropped.
pub fn parse_palette(hex_colours: &[String], fallback: Color32) -> Vec<Color32> {
    let mut palette: Vec<Color32> = hex_colours
        .iter()
        .filter_map(|hex| Color32::from_hex(hex))
        .collect();
    if palette.is_empty() {
        palette.push(fallback);
    }
    palette
}
