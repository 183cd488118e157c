//! Inference backends and tensor preprocessing.

use crate::BackendError;
use xqsight_core::ColorImageView;

/// Dense `f32` tensor, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl Tensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Result<Self, BackendError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(BackendError::Output(format!(
                "shape {shape:?} needs {expected} values, got {}",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// Rows of the last axis, e.g. the 16 class scores of each of 90 points
    /// for a `[1, 90, 16]` tensor.
    pub fn last_axis_rows(&self) -> impl Iterator<Item = &[f32]> {
        let n = self.shape.last().copied().unwrap_or(0).max(1);
        self.data.chunks_exact(n)
    }
}

/// A loaded model: one NCHW image in, outputs in model order.
pub trait InferenceBackend: Send + Sync {
    fn name(&self) -> &str;
    fn run(&self, input: Tensor) -> Result<Vec<Tensor>, BackendError>;
}

/// Per-channel normalization applied after scaling `0..=255` pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Normalization {
    pub scale: f32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Normalization {
    /// ImageNet statistics on `[0, 1]` input (pose model).
    pub const IMAGENET_UNIT: Self = Self {
        scale: 1.0 / 255.0,
        mean: [0.485, 0.456, 0.406],
        std: [0.229, 0.224, 0.225],
    };

    /// ImageNet statistics on `[0, 255]` input (board classifier).
    pub const IMAGENET_BYTE: Self = Self {
        scale: 1.0,
        mean: [123.675, 116.28, 103.53],
        std: [58.395, 57.12, 57.375],
    };
}

/// Resize to `width x height` and pack as a `[1, 3, H, W]` RGB tensor.
pub fn image_to_nchw(
    image: &ColorImageView<'_>,
    width: usize,
    height: usize,
    norm: &Normalization,
) -> Tensor {
    let resized = image.resize(width, height);
    let plane = width * height;
    let mut data = vec![0f32; 3 * plane];
    for (i, px) in resized.data.chunks_exact(3).enumerate() {
        for c in 0..3 {
            data[c * plane + i] = (px[c] as f32 * norm.scale - norm.mean[c]) / norm.std[c];
        }
    }
    Tensor {
        shape: vec![1, 3, height, width],
        data,
    }
}

#[cfg(feature = "onnx")]
mod onnx {
    use super::{InferenceBackend, Tensor};
    use crate::BackendError;
    use std::path::{Path, PathBuf};
    use tract_onnx::prelude::*;

    type Plan = TypedRunnableModel<TypedModel>;

    /// ONNX model executed with `tract`.
    pub struct OnnxBackend {
        name: String,
        plan: Plan,
    }

    impl OnnxBackend {
        /// Load and optimize a model with a fixed `[1, 3, height, width]` input.
        pub fn load(path: &Path, width: usize, height: usize) -> Result<Self, BackendError> {
            if !path.is_file() {
                return Err(BackendError::ModelNotFound(path.to_path_buf()));
            }
            let load_err = |e: TractError| BackendError::Load {
                path: PathBuf::from(path),
                message: e.to_string(),
            };
            let plan = tract_onnx::onnx()
                .model_for_path(path)
                .and_then(|m| m.with_input_fact(0, f32::fact([1, 3, height, width]).into()))
                .and_then(|m| m.into_optimized())
                .and_then(|m| m.into_runnable())
                .map_err(load_err)?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "onnx".to_owned());
            log::info!("loaded model {name} ({width}x{height})");
            Ok(Self { name, plan })
        }
    }

    impl InferenceBackend for OnnxBackend {
        fn name(&self) -> &str {
            &self.name
        }

        fn run(&self, input: Tensor) -> Result<Vec<Tensor>, BackendError> {
            let run_err = |e: TractError| BackendError::Run(e.to_string());
            let t = tract_onnx::prelude::Tensor::from_shape(&input.shape, &input.data)
                .map_err(run_err)?;
            let outputs = self.plan.run(tvec!(t.into())).map_err(run_err)?;
            outputs
                .iter()
                .map(|o| {
                    let data = o.as_slice::<f32>().map_err(run_err)?.to_vec();
                    Tensor::new(o.shape().to_vec(), data)
                })
                .collect()
        }
    }
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxBackend;

#[cfg(test)]
mod tests {
    use super::*;
    use xqsight_core::ColorImage;

    #[test]
    fn nchw_layout_and_normalization() {
        let img = ColorImage::filled(4, 2, [255, 0, 128]);
        let norm = Normalization {
            scale: 1.0,
            mean: [0.0, 0.0, 128.0],
            std: [255.0, 1.0, 1.0],
        };
        let t = image_to_nchw(&img.view(), 4, 2, &norm);
        assert_eq!(t.shape, vec![1, 3, 2, 4]);
        assert!(t.data[..8].iter().all(|&v| (v - 1.0).abs() < 1e-6));
        assert!(t.data[8..16].iter().all(|&v| v == 0.0));
        assert!(t.data[16..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn imagenet_unit_maps_mid_gray_near_zero() {
        let img = ColorImage::filled(2, 2, [124, 116, 104]);
        let t = image_to_nchw(&img.view(), 2, 2, &Normalization::IMAGENET_UNIT);
        assert!(t.data.iter().all(|v| v.abs() < 0.02), "{:?}", t.data);
    }

    #[test]
    fn tensor_shape_must_match_data() {
        assert!(Tensor::new(vec![1, 90, 16], vec![0.0; 1440]).is_ok());
        assert!(Tensor::new(vec![1, 90, 16], vec![0.0; 1439]).is_err());
        let t = Tensor::new(vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let rows: Vec<&[f32]> = t.last_axis_rows().collect();
        assert_eq!(rows, vec![&[1.0, 2.0, 3.0][..], &[4.0, 5.0, 6.0][..]]);
    }
}
