//! ONNX-backed object detector.
//!
//! Consumes a YOLO-family detection model: input `[1, 3, H, W]` RGB in
//! `[0, 1]`, output `[1, 4 + C, N]` (or transposed) rows of box center,
//! extent and per-class scores. Training and fine-tuning are out of scope;
//! this module only decodes inference output.

use std::path::Path;
use std::sync::Mutex;

use image::{imageops, RgbImage};
use log::{debug, info, warn};
use ndarray::Array4;
use ort::session::Session;

use relicscan_core::{
    Detection, DetectionSource, FeatureKind, ModelParams, PixelBox, RasterTile,
};

use crate::{Detector, ModelError};

/// Input size assumed when the model declares dynamic spatial dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// One decoded box in tile-pixel space.
#[derive(Clone, Copy, Debug)]
struct RawBox {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    class_id: u32,
    score: f32,
}

pub struct OnnxDetector {
    session: Mutex<Session>,
    output_name: String,
    input_width: u32,
    input_height: u32,
    confidence_threshold: f32,
    iou_threshold: f32,
}

impl OnnxDetector {
    /// Load a session and validate the tensor interface.
    pub fn load(path: &Path, params: &ModelParams) -> Result<Self, ModelError> {
        let session = Session::builder()
            .and_then(|builder| builder.commit_from_file(path))
            .map_err(|e| ModelError::Unavailable(e.to_string()))?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| ModelError::Unavailable("model has no inputs".to_owned()))?;
        let dims: Vec<i64> = input
            .input_type
            .tensor_dimensions()
            .ok_or_else(|| ModelError::Unavailable("model input is not a tensor".to_owned()))?
            .collect();
        if dims.len() != 4 {
            return Err(ModelError::Unavailable(format!(
                "expected a 4-d image input, got {}-d",
                dims.len()
            )));
        }
        let input_height = spatial_dim(dims[2]);
        let input_width = spatial_dim(dims[3]);

        let output_name = session
            .outputs
            .first()
            .ok_or_else(|| ModelError::Unavailable("model has no outputs".to_owned()))?
            .name
            .clone();

        info!(
            "loaded detection model {} (input {}x{})",
            path.display(),
            input_width,
            input_height
        );

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            input_width,
            input_height,
            confidence_threshold: params.confidence_threshold,
            iou_threshold: params.iou_threshold,
        })
    }

    fn composite(tile: &RasterTile) -> Result<RgbImage, ModelError> {
        let [red, green, blue] = tile.rgb_bands()?;
        let mut rgb = RgbImage::new(tile.width(), tile.height());
        for (i, pixel) in rgb.pixels_mut().enumerate() {
            pixel.0 = [red[i], green[i], blue[i]];
        }
        Ok(rgb)
    }

    fn preprocess(&self, rgb: &RgbImage) -> Array4<f32> {
        let resized = imageops::resize(
            rgb,
            self.input_width,
            self.input_height,
            imageops::FilterType::CatmullRom,
        );
        let mut input =
            Array4::<f32>::zeros((1, 3, self.input_height as usize, self.input_width as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for channel in 0..3 {
                input[[0, channel, y as usize, x as usize]] =
                    f32::from(pixel.0[channel]) / 255.0;
            }
        }
        input
    }

    fn run_inference(&self, input: Array4<f32>) -> Result<(Vec<i64>, Vec<f32>), ModelError> {
        let value = ort::value::Value::from_array(input)
            .map_err(|e| ModelError::Inference(e.to_string()))?;
        let session = self
            .session
            .lock()
            .map_err(|_| ModelError::Inference("session lock poisoned".to_owned()))?;
        let outputs = session
            .run(ort::inputs![value])
            .map_err(|e| ModelError::Inference(e.to_string()))?;
        let tensor = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| ModelError::Inference("missing model output".to_owned()))?;
        let (shape, data) = tensor
            .try_extract_tensor::<f32>()
            .map_err(|e| ModelError::Inference(e.to_string()))?;
        Ok((shape.to_vec(), data.to_vec()))
    }

    /// Decode `[1, 4 + C, N]` (or `[1, N, 4 + C]`) rows into tile-pixel boxes.
    fn decode(&self, shape: &[i64], data: &[f32], tile: &RasterTile) -> Result<Vec<RawBox>, ModelError> {
        if shape.len() != 3 || shape[0] != 1 {
            return Err(ModelError::Inference(format!(
                "unexpected output shape {shape:?}"
            )));
        }
        // The feature axis (4 + C) is the smaller one for every class table
        // this pipeline consumes.
        let (features, anchors, transposed) = if shape[1] <= shape[2] {
            (shape[1] as usize, shape[2] as usize, false)
        } else {
            (shape[2] as usize, shape[1] as usize, true)
        };
        if features < 5 || data.len() != features * anchors {
            return Err(ModelError::Inference(format!(
                "unexpected output layout {shape:?}"
            )));
        }

        let at = |anchor: usize, feature: usize| -> f32 {
            if transposed {
                data[anchor * features + feature]
            } else {
                data[feature * anchors + anchor]
            }
        };

        let sx = tile.width() as f32 / self.input_width as f32;
        let sy = tile.height() as f32 / self.input_height as f32;

        let mut boxes = Vec::new();
        for anchor in 0..anchors {
            let mut best_class = 0u32;
            let mut best_score = 0.0f32;
            for class in 0..features - 4 {
                let score = at(anchor, 4 + class);
                if score > best_score {
                    best_score = score;
                    best_class = class as u32;
                }
            }
            if best_score < self.confidence_threshold {
                continue;
            }
            let cx = at(anchor, 0) * sx;
            let cy = at(anchor, 1) * sy;
            let w = at(anchor, 2) * sx;
            let h = at(anchor, 3) * sy;
            boxes.push(RawBox {
                x0: cx - w / 2.0,
                y0: cy - h / 2.0,
                x1: cx + w / 2.0,
                y1: cy + h / 2.0,
                class_id: best_class,
                score: best_score,
            });
        }
        Ok(suppress_boxes(boxes, self.iou_threshold))
    }

    fn to_detections(&self, boxes: Vec<RawBox>, tile: &RasterTile) -> Vec<Detection> {
        let mut out = Vec::new();
        for b in boxes {
            let Some(kind) = FeatureKind::from_class_id(b.class_id) else {
                warn!("dropping box with unknown class id {}", b.class_id);
                continue;
            };
            let col = f64::from((b.x0 + b.x1) / 2.0);
            let row = f64::from((b.y0 + b.y1) / 2.0);
            let (lon, lat) = tile.pixel_to_geo(col, row);
            out.push(Detection {
                latitude: lat,
                longitude: lon,
                kind,
                confidence: b.score.clamp(0.0, 1.0),
                source: DetectionSource::ModelInference,
                description: format!("{} (model confidence {:.2})", kind.label(), b.score),
                bounding_box: Some(PixelBox::from_points(b.x0, b.y0, b.x1, b.y1)),
                tile_reference: tile.reference().map(str::to_owned),
            });
        }
        out
    }
}

impl Detector for OnnxDetector {
    fn detect(&self, tile: &RasterTile) -> Result<Vec<Detection>, ModelError> {
        let rgb = Self::composite(tile)?;
        let input = self.preprocess(&rgb);
        let (shape, data) = self.run_inference(input)?;
        let boxes = self.decode(&shape, &data, tile)?;
        let detections = self.to_detections(boxes, tile);
        debug!("model produced {} detections", detections.len());
        Ok(detections)
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

fn spatial_dim(dim: i64) -> u32 {
    if dim > 0 {
        dim as u32
    } else {
        DEFAULT_INPUT_SIZE
    }
}

/// Greedy IoU suppression, strongest box first.
fn suppress_boxes(mut boxes: Vec<RawBox>, iou_threshold: f32) -> Vec<RawBox> {
    boxes.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut kept: Vec<RawBox> = Vec::new();
    for b in boxes {
        if kept.iter().all(|k| iou(k, &b) <= iou_threshold) {
            kept.push(b);
        }
    }
    kept
}

fn iou(a: &RawBox, b: &RawBox) -> f32 {
    let ix0 = a.x0.max(b.x0);
    let iy0 = a.y0.max(b.y0);
    let ix1 = a.x1.min(b.x1);
    let iy1 = a.y1.min(b.y1);
    let iw = (ix1 - ix0).max(0.0);
    let ih = (iy1 - iy0).max(0.0);
    let inter = iw * ih;
    let area_a = (a.x1 - a.x0).max(0.0) * (a.y1 - a.y0).max(0.0);
    let area_b = (b.x1 - b.x0).max(0.0) * (b.y1 - b.y0).max(0.0);
    let union = area_a + area_b - inter;
    if union <= 0.0 {
        return 0.0;
    }
    inter / union
}
