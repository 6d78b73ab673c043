use std::path::Path;

use anyhow::Context;
use image::{DynamicImage, imageops::FilterType};
use rten::Model;
use rten_tensor::NdTensor;
use rten_tensor::prelude::*;

use super::{InferenceMode, InferenceProvider, ModelCache};
use crate::config::YoloParams;
use crate::detection::filter::sort_by_confidence;
use crate::detection::validate::open_image;
use crate::models::RawDetection;

const UNKNOWN_LABEL: &str = "unknown";
const PAD_VALUE: f32 = 114.0 / 255.0;

pub const COCO_CLASS_NAMES: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich",
    "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch",
    "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote",
    "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator", "book",
    "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// A YOLOv8-style detector and its class vocabulary.
pub struct YoloModel {
    model: Model,
    class_names: Vec<String>,
    params: YoloParams,
}

impl YoloModel {
    /// Load the model; class names come from a `.names` file beside it, or COCO.
    pub fn load(path: &Path, params: YoloParams) -> anyhow::Result<Self> {
        let model = Model::load_file(path).map_err(|e| anyhow::anyhow!("{}", e))?;

        let names_path = path.with_extension("names");
        let class_names: Vec<String> = if names_path.is_file() {
            let content = std::fs::read_to_string(&names_path)
                .with_context(|| format!("Failed to read class names {:?}", names_path))?;
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect()
        } else {
            COCO_CLASS_NAMES.iter().map(|name| name.to_string()).collect()
        };
        log::info!("Model loaded with {} classes", class_names.len());

        Ok(Self {
            model,
            class_names,
            params,
        })
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn detect(&self, img: &DynamicImage) -> anyhow::Result<Vec<RawDetection>> {
        let input = letterbox(img, self.params.input_size);
        let output: NdTensor<f32, 3> = self
            .model
            .run_one(input.view().into(), None)
            .map_err(|e| anyhow::anyhow!("model run failed: {}", e))?
            .try_into()
            .map_err(|e| anyhow::anyhow!("unexpected model output: {:?}", e))?;
        decode_output(&output, &self.class_names, &self.params)
    }
}

/// Scale into a square canvas keeping aspect ratio, as CHW floats in [0, 1].
pub fn letterbox(img: &DynamicImage, size: u32) -> NdTensor<f32, 4> {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
    let scaled_w = ((width as f32 * scale).round() as u32).clamp(1, size);
    let scaled_h = ((height as f32 * scale).round() as u32).clamp(1, size);
    let resized = image::imageops::resize(&rgb, scaled_w, scaled_h, FilterType::Triangle);

    let offset_x = ((size - scaled_w) / 2) as usize;
    let offset_y = ((size - scaled_h) / 2) as usize;
    let side = size as usize;
    let mut tensor = NdTensor::full([1, 3, side, side], PAD_VALUE);
    for (x, y, pixel) in resized.enumerate_pixels() {
        for channel in 0..3 {
            tensor[[0, channel, y as usize + offset_y, x as usize + offset_x]] =
                pixel[channel] as f32 / 255.0;
        }
    }
    tensor
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    class_id: usize,
    score: f32,
    // cx, cy, w, h in model input space
    bbox: [f32; 4],
}

/// Intersection over union of two center-format boxes.
pub fn iou(a: [f32; 4], b: [f32; 4]) -> f32 {
    let (ax0, ay0, ax1, ay1) = (a[0] - a[2] / 2.0, a[1] - a[3] / 2.0, a[0] + a[2] / 2.0, a[1] + a[3] / 2.0);
    let (bx0, by0, bx1, by1) = (b[0] - b[2] / 2.0, b[1] - b[3] / 2.0, b[0] + b[2] / 2.0, b[1] + b[3] / 2.0);
    let inter_w = (ax1.min(bx1) - ax0.max(bx0)).max(0.0);
    let inter_h = (ay1.min(by1) - ay0.max(by0)).max(0.0);
    let inter = inter_w * inter_h;
    let union = a[2] * a[3] + b[2] * b[3] - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
}

/// Turn a `[1, 4 + classes, anchors]` output into one detection per surviving box.
///
/// Boxes go through the detector's own score floor and class-wise NMS.
/// Class ids outside the vocabulary are labelled `"unknown"`.
pub fn decode_output(
    output: &NdTensor<f32, 3>,
    class_names: &[String],
    params: &YoloParams,
) -> anyhow::Result<Vec<RawDetection>> {
    let [batch, rows, anchors] = output.shape();
    if batch != 1 || rows <= 4 {
        anyhow::bail!("unexpected model output shape {:?}", output.shape());
    }

    let mut candidates = Vec::new();
    for anchor in 0..anchors {
        let mut best: Option<(usize, f32)> = None;
        for row in 4..rows {
            let score = output[[0, row, anchor]];
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((row - 4, score));
            }
        }
        if let Some((class_id, score)) = best {
            if score > params.box_threshold {
                candidates.push(Candidate {
                    class_id,
                    score,
                    bbox: [
                        output[[0, 0, anchor]],
                        output[[0, 1, anchor]],
                        output[[0, 2, anchor]],
                        output[[0, 3, anchor]],
                    ],
                });
            }
        }
    }
    sort_by_confidence(&mut candidates, |c| c.score);

    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.len() >= params.max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && iou(k.bbox, candidate.bbox) > params.iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }

    Ok(kept
        .into_iter()
        .map(|c| {
            let label = class_names
                .get(c.class_id)
                .map(String::as_str)
                .unwrap_or(UNKNOWN_LABEL);
            RawDetection::new(label, c.score)
        })
        .collect())
}

/// Real inference backed by a trained model file.
#[derive(Debug)]
pub struct ModelProvider {
    cache: ModelCache<YoloModel>,
}

impl ModelProvider {
    pub fn new(model_path: &Path, params: YoloParams) -> Self {
        Self {
            cache: ModelCache::new(model_path, move |path: &Path| {
                YoloModel::load(path, params.clone())
            }),
        }
    }

    pub fn cache(&self) -> &ModelCache<YoloModel> {
        &self.cache
    }
}

impl InferenceProvider for ModelProvider {
    fn detect(&self, image_path: &Path) -> anyhow::Result<Vec<RawDetection>> {
        let model = self.cache.get()?;
        let img = open_image(image_path)?;
        let mut detections = model.detect(&img)?;
        sort_by_confidence(&mut detections, |d| d.confidence);
        log::debug!("model produced {} boxes for {:?}", detections.len(), image_path);
        Ok(detections)
    }

    fn mode(&self) -> InferenceMode {
        InferenceMode::Model
    }
}
