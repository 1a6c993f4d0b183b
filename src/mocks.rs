use crate::errors::Result;
use crate::traits::ProbabilityModel;
use image::RgbImage;
use ndarray::prelude::*;

/// Deterministic stand-in for the segmentation model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockProbabilityModel {
    /// Every pixel gets the same probability.
    Constant { image_size: u32, probability: f32 },
    /// Dark pixels score high: `1 - luma / 255`, the way oil slicks show up
    /// on SAR backscatter.
    DarkSpot { image_size: u32 },
}

impl MockProbabilityModel {
    pub const fn constant(image_size: u32, probability: f32) -> Self {
        Self::Constant {
            image_size,
            probability,
        }
    }

    pub const fn dark_spot(image_size: u32) -> Self {
        Self::DarkSpot { image_size }
    }
}

impl ProbabilityModel for MockProbabilityModel {
    fn input_size(&self) -> u32 {
        match *self {
            Self::Constant { image_size, .. } | Self::DarkSpot { image_size } => image_size,
        }
    }

    fn predict(&self, image: &RgbImage) -> Result<Array2<f32>> {
        let (width, height) = image.dimensions();
        let shape = (height as usize, width as usize);
        Ok(match *self {
            Self::Constant { probability, .. } => Array2::from_elem(shape, probability),
            Self::DarkSpot { .. } => Array2::from_shape_fn(shape, |(y, x)| {
                let [r, g, b] = image.get_pixel(x as u32, y as u32).0;
                let luma = (u16::from(r) + u16::from(g) + u16::from(b)) as f32 / 3.0;
                1.0 - luma / 255.0
            }),
        })
    }
}
