use eframe::egui::Color32;

use crate::client::AnalysisResponse;
use crate::utils::color::parse_palette;
use crate::utils::markup::fragment_text;

/// Brand dark blue, used when the server sends no usable style colours.
pub const FALLBACK_COLOUR: Color32 = Color32::from_rgb(0, 49, 68);

/// Everything the results pane needs, derived once from the server response.
/// Chart sections and the share link exist only when the response carries
/// focal-length data; the classification summary always renders.
#[derive(Debug)]
pub struct ResultsView {
    pub response: AnalysisResponse,
    pub summary: String,
    pub palette: Vec<Color32>,
    pub has_focal_data: bool,
    pub share_url: Option<String>,
    pub recommendations: Option<String>,
}

impl ResultsView {
    pub fn from_response(response: AnalysisResponse, base_url: &str) -> Self {
        let summary = fragment_text(&response.template);
        let palette = parse_palette(&response.additional_data.style_colours, FALLBACK_COLOUR);
        let has_focal_data = !response.additional_data.focal_lengths.binned.all.is_empty();
        let share_url = if has_focal_data {
            response
                .additional_data
                .recommendations_id
                .as_ref()
                .map(|id| format!("{}/recall/{}", base_url.trim_end_matches('/'), id))
        } else {
            None
        };

        Self {
            response,
            summary,
            palette,
            has_focal_data,
            share_url,
            recommendations: None,
        }
    }

    pub fn lead_colour(&self) -> Color32 {
        self.palette[0]
    }

    pub fn series_colour(&self, index: usize) -> Color32 {
        self.palette[index % self.palette.len()]
    }

    pub fn set_recommendations(&mut self, markup: &str) {
        let text = fragment_text(markup);
        if !text.is_empty() {
            self.recommendations = Some(text);
        }
    }
}
