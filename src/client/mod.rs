use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::ExifRecord;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Analysis failed. Server responded with status {status}. {detail}")]
    Analysis { status: u16, detail: String },
}

#[derive(Serialize)]
struct AnalysisRequest<'a> {
    #[serde(rename = "exifData")]
    exif_data: &'a [ExifRecord],
}

/// The server's classification result: a markup fragment plus the structured
/// data the result views are built from.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisResponse {
    pub template: String,
    pub additional_data: AdditionalData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdditionalData {
    #[serde(default)]
    pub style_colours: Vec<String>,
    #[serde(default)]
    pub focal_lengths: FocalLengthData,
    #[serde(default)]
    pub aperture: f64,
    #[serde(default)]
    pub iso: f64,
    #[serde(default)]
    pub shutter_speed: f64,
    #[serde(default)]
    pub exposure: f64,
    #[serde(default)]
    pub recommendations_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FocalLengthData {
    #[serde(default)]
    pub binned: SeriesSet<String>,
    #[serde(default)]
    pub discrete: SeriesSet<f64>,
}

/// Frequency series split by lens kind; `binned` series are labeled by range,
/// `discrete` series by focal length in millimetres.
#[derive(Debug, Clone, Deserialize)]
pub struct SeriesSet<L> {
    #[serde(default)]
    pub primes: Vec<(L, f64)>,
    #[serde(default)]
    pub zooms: Vec<(L, f64)>,
    #[serde(default)]
    pub all: Vec<(L, f64)>,
}

impl<L> Default for SeriesSet<L> {
    fn default() -> Self {
        Self {
            primes: Vec::new(),
            zooms: Vec::new(),
            all: Vec::new(),
        }
    }
}

/// Client for the analysis server. One instance per submission; the base URL
/// comes from the UI input.
pub struct AnalysisClient {
    base_url: String,
    http: reqwest::Client,
}

impl AnalysisClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Fetch the server-approved field whitelist. Any failure degrades to an
    /// empty whitelist; extraction then produces field-less records, which
    /// the server still accepts.
    pub fn fetch_whitelist(&self) -> Vec<String> {
        let url = self.endpoint("exif-whitelist");
        let result = reqwest::blocking::get(&url)
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<Vec<String>>());
        match result {
            Ok(fields) => {
                tracing::info!(count = fields.len(), "loaded EXIF whitelist");
                fields
            }
            Err(err) => {
                tracing::warn!("Failed to fetch EXIF whitelist: {err}");
                Vec::new()
            }
        }
    }

    /// Submit one batch for classification. Non-success statuses surface the
    /// body text as the diagnostic.
    pub async fn analyze(&self, batch: &[ExifRecord]) -> Result<AnalysisResponse, ClientError> {
        let response = self
            .http
            .post(self.endpoint("process-exif"))
            .json(&AnalysisRequest { exif_data: batch })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let detail = if detail.is_empty() {
                "(No further details)".to_string()
            } else {
                detail
            };
            return Err(ClientError::Analysis {
                status: status.as_u16(),
                detail,
            });
        }
        Ok(response.json().await?)
    }

    /// Fetch the recommendations fragment for a finished analysis.
    pub async fn fetch_recommendations(&self, id: &str) -> Result<String, ClientError> {
        let response = self
            .http
            .get(self.endpoint(&format!("llm-recommendations/{id}")))
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    /// Shareable link that replays a finished analysis.
    pub fn recall_url(&self, recommendations_id: &str) -> String {
        self.endpoint(&format!("recall/{recommendations_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoints_normalize_slashes() {
        let client = AnalysisClient::new("http://example.test:5000/");
        assert_eq!(client.base_url(), "http://example.test:5000");
        assert_eq!(
            client.endpoint("/process-exif"),
            "http://example.test:5000/process-exif"
        );
        assert_eq!(
            client.recall_url("abc123"),
            "http://example.test:5000/recall/abc123"
        );
    }

    #[test]
    fn request_payload_wraps_records_in_exif_data() {
        let mut fields = serde_json::Map::new();
        fields.insert("Make".to_string(), json!("OLYMPUS"));
        let batch = vec![
            ExifRecord::from_fields(fields),
            ExifRecord::read_error("lost.jpg".to_string()),
        ];

        let payload = serde_json::to_value(AnalysisRequest { exif_data: &batch }).unwrap();
        assert_eq!(
            payload,
            json!({
                "exifData": [
                    {"Make": "OLYMPUS"},
                    {"filename": "lost.jpg", "error": "File read error"},
                ]
            })
        );
    }

    #[test]
    fn response_fixture_deserializes() {
        let fixture = json!({
            "template": "<div><h3>Landscape photographer</h3></div>",
            "additional_data": {
                "style_colours": ["#003144", "#e83e8c", "#ffd167"],
                "focal_lengths": {
                    "binned": {
                        "primes": [["Wide", 4.0], ["Standard", 2.0]],
                        "zooms": [["Wide", 1.0], ["Standard", 7.0]],
                        "all": [["Wide", 5.0], ["Standard", 9.0]]
                    },
                    "discrete": {
                        "primes": [[35.0, 4.0]],
                        "zooms": [[24.0, 1.0], [70.0, 3.0]],
                        "all": [[24.0, 1.0], [35.0, 4.0], [70.0, 3.0]]
                    }
                },
                "aperture": 31.5,
                "iso": 12.0,
                "shutter_speed": 24.0,
                "exposure": 9.0,
                "recommendations_id": "rec-42"
            }
        });

        let response: AnalysisResponse = serde_json::from_value(fixture).unwrap();
        assert_eq!(response.additional_data.style_colours.len(), 3);
        assert_eq!(response.additional_data.focal_lengths.binned.all.len(), 2);
        assert_eq!(
            response.additional_data.focal_lengths.binned.primes[0],
            ("Wide".to_string(), 4.0)
        );
        assert_eq!(response.additional_data.focal_lengths.discrete.zooms[1].0, 70.0);
        assert_eq!(
            response.additional_data.recommendations_id.as_deref(),
            Some("rec-42")
        );
    }

    #[test]
    fn sparse_response_falls_back_to_defaults() {
        let fixture = json!({
            "template": "<p>Minimalist</p>",
            "additional_data": {}
        });
        let response: AnalysisResponse = serde_json::from_value(fixture).unwrap();
        assert!(response.additional_data.style_colours.is_empty());
        assert!(response.additional_data.focal_lengths.binned.all.is_empty());
        assert!(response.additional_data.recommendations_id.is_none());
        assert_eq!(response.additional_data.aperture, 0.0);
    }
}
