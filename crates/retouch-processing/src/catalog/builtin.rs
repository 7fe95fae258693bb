use super::{Operation, OperationSpec, ParamRule, ParamSpec};

pub(super) fn operations() -> Vec<OperationSpec> {
    vec![
        OperationSpec::new(
            Operation::Grayscale,
            "conversion",
            "Reduce color to a single luma channel",
        ),
        OperationSpec::new(
            Operation::GaussianBlur,
            "filtering",
            "Gaussian smoothing with an odd square kernel",
        )
        .alias(&["blur"])
        .param(
            ParamSpec::integer("intensity", 3, 31, 5)
                .odd(3)
                .describe("Kernel size in pixels"),
        ),
        OperationSpec::new(
            Operation::Beautify,
            "filtering",
            "Edge-preserving smoothing, light sharpening and a brightness lift",
        )
        .param(
            ParamSpec::real("smoothing", 10.0, 150.0, 75.0)
                .step(5.0)
                .describe("Bilateral color sigma"),
        )
        .param(
            ParamSpec::integer("brightness", 0, 60, 15)
                .describe("Added to the HSV value channel"),
        ),
        OperationSpec::new(
            Operation::FlowerSketch,
            "artistic",
            "Pastel line drawing traced from three edge maps",
        )
        .param(ParamSpec::integer("intensity", 1, 3, 1).describe("Stroke thickness")),
        OperationSpec::new(
            Operation::Threshold,
            "thresholding",
            "Global binary threshold on intensity",
        )
        .param(ParamSpec::integer("value", 0, 255, 127)),
        OperationSpec::new(
            Operation::AdaptiveThreshold,
            "thresholding",
            "Binary threshold against the Gaussian-weighted local mean",
        )
        .param(
            ParamSpec::integer("block_size", 3, 51, 11)
                .odd(3)
                .describe("Neighborhood size in pixels"),
        )
        .param(
            ParamSpec::real("c", -20.0, 20.0, 2.0)
                .step(1.0)
                .describe("Constant subtracted from the local mean"),
        ),
        OperationSpec::new(
            Operation::Rotate,
            "geometry",
            "Rotate counter-clockwise about the image center",
        )
        .param(
            ParamSpec::real("angle", -180.0, 180.0, 0.0)
                .unbounded()
                .describe("Degrees, wrapped into (-180, 180]"),
        )
        .param(
            ParamSpec::choice("canvas", &["expand", "crop"], "expand")
                .describe("Grow the canvas to fit, or keep the original size"),
        ),
        OperationSpec::new(Operation::Flip, "geometry", "Mirror the image").param(
            ParamSpec::choice("direction", &["horizontal", "vertical", "both"], "horizontal"),
        ),
        OperationSpec::new(Operation::Resize, "geometry", "Resample to exact dimensions")
            .param(ParamSpec::integer("width", 1, 8192, 500))
            .param(ParamSpec::integer("height", 1, 8192, 500)),
        OperationSpec::new(
            Operation::Equalize,
            "histogram",
            "Histogram equalization",
        )
        .param(
            ParamSpec::choice("mode", &["per_channel", "luma"], "per_channel")
                .describe("Equalize each channel, or only the luma of YCrCb"),
        ),
        OperationSpec::new(
            Operation::Normalize,
            "histogram",
            "Stretch the observed intensity range to 0-255",
        ),
        OperationSpec::new(
            Operation::Canny,
            "edges",
            "Canny edge detection with hysteresis",
        )
        .param(ParamSpec::real("low", 0.0, 500.0, 50.0).step(1.0))
        .param(ParamSpec::real("high", 0.0, 500.0, 150.0).step(1.0))
        .rule(ParamRule::LessThan {
            lower: "low",
            upper: "high",
        }),
        OperationSpec::new(
            Operation::Roi,
            "edges",
            "Outline the largest salient regions",
        )
        .param(ParamSpec::integer("max_regions", 1, 20, 5)),
    ]
}
