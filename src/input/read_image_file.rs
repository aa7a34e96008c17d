// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::Path;

use image::{ImageReader, RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::{error, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, decoded_path, frame::RgbNchwFrame};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 读取图像并缩放到模型输入尺寸
///
/// 模型要求固定的输入分辨率，尺寸不符的图像会被缩放并给出警告。
pub fn load_resized<P: AsRef<Path>>(
  path: P,
  width: u32,
  height: u32,
) -> Result<RgbImage, ImageFileInputError> {
  let path = path.as_ref();
  let image = ImageReader::open(path)?.decode()?.to_rgb8();

  if image.dimensions() == (width, height) {
    return Ok(image);
  }

  warn!(
    "图像 {} 的分辨率为 {}x{}, 模型要求 {}x{}, 将进行缩放",
    path.display(),
    image.width(),
    image.height(),
    width,
    height
  );
  Ok(image::imageops::resize(
    &image,
    width,
    height,
    FilterType::Triangle,
  ))
}

pub struct ImageFileInput<const W: u32, const H: u32> {
  image: Option<RgbImage>,
}

impl<const W: u32, const H: u32> FromUrlWithScheme for ImageFileInput<W, H> {
  const SCHEME: &'static str = "image";
}

impl<const W: u32, const H: u32> FromUrl for ImageFileInput<W, H> {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let image = load_resized(decoded_path(url), W, H)?;
    Ok(ImageFileInput { image: Some(image) })
  }
}

impl<const W: u32, const H: u32> ImageFileInput<W, H> {
  pub fn from_image(image: RgbImage) -> Self {
    let image = if image.dimensions() == (W, H) {
      image
    } else {
      image::imageops::resize(&image, W, H, FilterType::Triangle)
    };
    ImageFileInput { image: Some(image) }
  }
}

impl<const W: u32, const H: u32> Iterator for ImageFileInput<W, H> {
  type Item = RgbNchwFrame<W, H>;

  fn next(&mut self) -> Option<Self::Item> {
    self.image.take().map(|image| RgbNchwFrame::from(&image))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::input::AsNchwFrame;

  #[test]
  fn yields_a_single_resized_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("in put.png");
    RgbImage::from_pixel(8, 4, image::Rgb([10, 20, 30]))
      .save(&path)
      .unwrap();

    let url = Url::from_file_path(&path).unwrap();
    let url = Url::parse(&url.as_str().replacen("file:", "image:", 1)).unwrap();
    let mut input = ImageFileInput::<4, 4>::from_url(&url).unwrap();

    let frame = input.next().unwrap();
    assert_eq!(frame.as_nchw().len(), 3 * 4 * 4);
    assert_eq!(frame.as_nchw()[0], 10);
    assert_eq!(frame.as_nchw()[16], 20);
    assert!(input.next().is_none());
  }

  #[test]
  fn rejects_other_schemes() {
    let url = Url::parse("folder:///tmp").unwrap();
    assert!(matches!(
      ImageFileInput::<4, 4>::from_url(&url),
      Err(ImageFileInputError::SchemaMismatch)
    ));
  }
}
