use std::{fmt::Display, path::Path};

use crate::{
    errors::{Result, SpillError},
    traits::ProbabilityModel,
};
use image::RgbImage;
use ndarray::prelude::*;
use nshare::AsNdarray3;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::Session,
};
use parking_lot::Mutex;

/// Memory layout of the model's image input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// `(batch, height, width, channels)`, as exported from Keras.
    Nhwc,
    /// `(batch, channels, height, width)`, as exported from PyTorch.
    Nchw,
}

impl TensorLayout {
    /// Detects the layout and square input size from a 4-D input shape.
    ///
    /// Dynamic dimensions (`-1`) are only accepted for the batch axis.
    pub fn from_input_shape(shape: &[i64]) -> Option<(Self, u32)> {
        match *shape {
            [_, h, w, 3] if h == w && h > 0 => Some((Self::Nhwc, h as u32)),
            [_, 3, h, w] if h == w && h > 0 => Some((Self::Nchw, h as u32)),
            _ => None,
        }
    }
}

/// ONNX Runtime backed segmentation model.
pub struct Model {
    image_size: u32,
    layout: TensorLayout,
    input_name: String,
    session: Mutex<Session>,
}

impl Model {
    /// Loads the model and runs one warm-up pass.
    ///
    /// Every failure here is a [`SpillError::ModelLoadFailure`]; there is no
    /// fallback model.
    pub fn load(model_path: &Path, device_id: i32) -> Result<Self> {
        let mut session = Session::builder()
            .map_err(|e| load_failure(model_path, "session builder", e))?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ])
            .map_err(|e| load_failure(model_path, "execution providers", e))?
            .with_memory_pattern(true)
            .map_err(|e| load_failure(model_path, "memory pattern", e))?
            .commit_from_file(model_path)
            .map_err(|e| load_failure(model_path, "read model file", e))?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| load_failure(model_path, "input lookup", "model has no inputs"))?;
        let shape = input
            .input_type
            .tensor_shape()
            .map(|shape| shape.to_vec())
            .ok_or_else(|| load_failure(model_path, "input lookup", "input is not a tensor"))?;
        let (layout, image_size) = TensorLayout::from_input_shape(&shape).ok_or_else(|| {
            load_failure(
                model_path,
                "input lookup",
                format!("unsupported input shape {shape:?}, expected a square RGB image"),
            )
        })?;
        let input_name = input.name.clone();
        log::debug!(
            "model input `{input_name}`: {layout:?} {image_size}x{image_size} from {}",
            model_path.display()
        );

        let warm_up = zeros_input(layout, image_size);
        session
            .run(ort::inputs![
                input_name.as_str() => TensorRef::from_array_view(&warm_up.as_standard_layout())
                    .map_err(|e| load_failure(model_path, "warm-up tensor", e))?
            ])
            .map_err(|e| load_failure(model_path, "warm-up run", e))?;

        Ok(Self {
            image_size,
            layout,
            input_name,
            session: Mutex::new(session),
        })
    }

    pub const fn layout(&self) -> TensorLayout {
        self.layout
    }

    fn run(&self, tensor: ArrayView4<f32>) -> Result<ArrayD<f32>> {
        let mut binding = self.session.lock();
        let outputs = binding.run(ort::inputs![
            self.input_name.as_str() => TensorRef::from_array_view(&tensor.as_standard_layout())?
        ])?;
        let probabilities = outputs[0].try_extract_array::<f32>()?.to_owned();
        Ok(probabilities)
    }
}

impl ProbabilityModel for Model {
    fn input_size(&self) -> u32 {
        self.image_size
    }

    fn predict(&self, image: &RgbImage) -> Result<Array2<f32>> {
        if image.dimensions() != (self.image_size, self.image_size) {
            return Err(SpillError::shape_mismatch(
                &[self.image_size as usize, self.image_size as usize],
                &[image.height() as usize, image.width() as usize],
            ));
        }
        let tensor = preprocess(image, self.layout)?;
        let output = self.run(tensor.view())?;
        let size = self.image_size as usize;
        squeeze_probability_map(output.view(), (size, size))
    }
}

/// Scales pixels to `[0, 1]` and adds the batch axis in the given layout.
pub fn preprocess(image: &RgbImage, layout: TensorLayout) -> Result<Array4<f32>> {
    let (width, height) = image.dimensions();
    let tensor = match layout {
        TensorLayout::Nhwc => {
            Array3::from_shape_vec((height as usize, width as usize, 3), image.as_raw().clone())?
                .mapv(normalize)
        }
        TensorLayout::Nchw => image.as_ndarray3().mapv(normalize),
    };
    Ok(tensor.insert_axis(Axis(0)))
}

/// Reduces a model output to `(height, width)`.
///
/// Accepts `(1, H, W, 1)`, `(1, 1, H, W)`, `(1, H, W)` and `(H, W)`, where
/// `(H, W)` must equal `expected`.
pub fn squeeze_probability_map(
    output: ArrayViewD<f32>,
    expected: (usize, usize),
) -> Result<Array2<f32>> {
    let shape = output.shape().to_vec();
    let spatial = match *shape.as_slice() {
        [1, h, w, 1] | [1, 1, h, w] | [1, h, w] | [h, w] => Some((h, w)),
        _ => None,
    };
    if spatial != Some(expected) {
        return Err(SpillError::shape_mismatch(&[expected.0, expected.1], &shape));
    }
    Ok(Array2::from_shape_vec(
        expected,
        output.iter().copied().collect(),
    )?)
}

fn normalize(v: u8) -> f32 {
    f32::from(v) / 255.0
}

fn zeros_input(layout: TensorLayout, size: u32) -> Array4<f32> {
    let size = size as usize;
    match layout {
        TensorLayout::Nhwc => Array4::zeros((1, size, size, 3)),
        TensorLayout::Nchw => Array4::zeros((1, 3, size, size)),
    }
}

fn load_failure(model_path: &Path, stage: &str, err: impl Display) -> SpillError {
    SpillError::ModelLoadFailure {
        path: model_path.to_path_buf(),
        source: format!("{stage}: {err}").into(),
    }
}
