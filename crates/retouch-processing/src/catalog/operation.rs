use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Every operation the engine knows how to run.
///
/// The transform dispatcher matches on this enum exhaustively, so a catalog
/// entry cannot exist without an implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Grayscale,
    GaussianBlur,
    Beautify,
    FlowerSketch,
    Threshold,
    AdaptiveThreshold,
    Rotate,
    Flip,
    Resize,
    Equalize,
    Normalize,
    Canny,
    Roi,
}

impl Operation {
    pub const ALL: [Operation; 13] = [
        Operation::Grayscale,
        Operation::GaussianBlur,
        Operation::Beautify,
        Operation::FlowerSketch,
        Operation::Threshold,
        Operation::AdaptiveThreshold,
        Operation::Rotate,
        Operation::Flip,
        Operation::Resize,
        Operation::Equalize,
        Operation::Normalize,
        Operation::Canny,
        Operation::Roi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Grayscale => "grayscale",
            Operation::GaussianBlur => "gaussian_blur",
            Operation::Beautify => "beautify",
            Operation::FlowerSketch => "flower_sketch",
            Operation::Threshold => "threshold",
            Operation::AdaptiveThreshold => "adaptive_threshold",
            Operation::Rotate => "rotate",
            Operation::Flip => "flip",
            Operation::Resize => "resize",
            Operation::Equalize => "equalize",
            Operation::Normalize => "normalize",
            Operation::Canny => "canny",
            Operation::Roi => "roi",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .iter()
            .copied()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_roundtrip() {
        for op in Operation::ALL {
            assert_eq!(op.as_str().parse::<Operation>().unwrap(), op);
            assert_eq!(
                serde_json::to_value(op).unwrap(),
                serde_json::Value::from(op.as_str())
            );
        }
    }

    #[test]
    fn test_unknown_name() {
        assert!("sepia".parse::<Operation>().is_err());
    }
}
