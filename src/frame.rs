// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// src/frame.rs - NCHW 帧定义
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use thiserror::Error;

use crate::{input::AsNchwFrame, model::InputTensor};

const RGB_CHANNELS: usize = 3;

#[derive(Error, Debug)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 固定尺寸的 RGB 帧，按通道平面存储
#[derive(Debug, Clone)]
pub struct RgbNchwFrame<const W: u32, const H: u32> {
  data: Box<[u8]>,
}

impl<const W: u32, const H: u32> TryFrom<Vec<u8>> for RgbNchwFrame<W, H> {
  type Error = FrameError;

  fn try_from(data: Vec<u8>) -> Result<Self, Self::Error> {
    let expected = RGB_CHANNELS * W as usize * H as usize;
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      data: data.into_boxed_slice(),
    })
  }
}

impl<const W: u32, const H: u32> Default for RgbNchwFrame<W, H> {
  fn default() -> Self {
    let size = RGB_CHANNELS * (W as usize) * (H as usize);
    let data = vec![0u8; size].into_boxed_slice();
    Self { data }
  }
}

impl<const W: u32, const H: u32> RgbNchwFrame<W, H> {
  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }
}

impl<const W: u32, const H: u32> AsMut<[u8]> for RgbNchwFrame<W, H> {
  fn as_mut(&mut self) -> &mut [u8] {
    &mut self.data
  }
}

impl<const W: u32, const H: u32> AsNchwFrame<W, H> for RgbNchwFrame<W, H> {
  fn as_nchw(&self) -> &[u8] {
    &self.data
  }
}

/// 像素值除以 255 得到模型输入
impl<const W: u32, const H: u32> From<&RgbNchwFrame<W, H>> for InputTensor {
  fn from(frame: &RgbNchwFrame<W, H>) -> Self {
    InputTensor {
      data: frame.data.iter().map(|&v| v as f32 / 255.0).collect(),
      shape: [1, RGB_CHANNELS, H as usize, W as usize],
    }
  }
}

#[cfg(feature = "image")]
mod rgb_image {
  use image::{ImageBuffer, Rgb, RgbImage};

  use super::RgbNchwFrame;
  use crate::input::AsNchwFrame;

  /// 调用方保证图像尺寸为 W x H
  impl<const W: u32, const H: u32> From<&RgbImage> for RgbNchwFrame<W, H> {
    fn from(image: &RgbImage) -> Self {
      let mut frame = RgbNchwFrame::<W, H>::default();
      let plane = (W as usize) * (H as usize);
      let slice = frame.as_mut();

      for (x, y, pixel) in image.enumerate_pixels() {
        if x >= W || y >= H {
          continue;
        }
        let idx = (y as usize) * (W as usize) + (x as usize);
        slice[idx] = pixel[0];
        slice[plane + idx] = pixel[1];
        slice[2 * plane + idx] = pixel[2];
      }
      frame
    }
  }

  impl<const W: u32, const H: u32> RgbNchwFrame<W, H> {
    pub fn to_rgb_image(&self) -> RgbImage {
      let plane = (W as usize) * (H as usize);
      let data = self.as_nchw();

      // 将 NCHW 转为 RGB 图像
      ImageBuffer::from_fn(W, H, |x, y| {
        let idx = (y as usize) * (W as usize) + (x as usize);
        Rgb([data[idx], data[plane + idx], data[2 * plane + idx]])
      })
    }
  }
}
