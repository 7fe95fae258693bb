use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// 256-bin intensity histogram, one series per channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum HistogramData {
    Gray {
        gray: Vec<u32>,
    },
    Color {
        red: Vec<u32>,
        green: Vec<u32>,
        blue: Vec<u32>,
    },
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistogramResponse {
    pub image_id: Uuid,
    pub histogram: HistogramData,
}
