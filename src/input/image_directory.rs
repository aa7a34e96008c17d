// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// src/input/image_directory.rs - 图像目录输入
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

use std::{collections::VecDeque, path::PathBuf};

use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, decoded_path, frame::RgbNchwFrame, input::load_resized,
};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "gif", "webp"];

#[derive(Error, Debug)]
pub enum ImageDirectoryInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("不是目录: {0}")]
  NotADirectory(String),
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
}

/// 按文件名顺序逐个读取目录中的图像
///
/// 无法解码的文件会被跳过。
pub struct ImageDirectoryInput<const W: u32, const H: u32> {
  pending: VecDeque<PathBuf>,
}

fn is_image_file(path: &std::path::Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| {
      let ext = ext.to_ascii_lowercase();
      IMAGE_EXTENSIONS.contains(&ext.as_str())
    })
    .unwrap_or(false)
}

impl<const W: u32, const H: u32> FromUrlWithScheme for ImageDirectoryInput<W, H> {
  const SCHEME: &'static str = "folder";
}

impl<const W: u32, const H: u32> FromUrl for ImageDirectoryInput<W, H> {
  type Error = ImageDirectoryInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageDirectoryInputError::SchemaMismatch);
    }

    let directory = PathBuf::from(decoded_path(url));
    if !directory.is_dir() {
      return Err(ImageDirectoryInputError::NotADirectory(
        directory.display().to_string(),
      ));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(&directory)? {
      let path = entry?.path();
      if path.is_file() && is_image_file(&path) {
        files.push(path);
      }
    }
    files.sort();
    info!("目录 {} 中共有 {} 张图像", directory.display(), files.len());

    Ok(ImageDirectoryInput {
      pending: files.into(),
    })
  }
}

impl<const W: u32, const H: u32> ImageDirectoryInput<W, H> {
  pub fn remaining(&self) -> usize {
    self.pending.len()
  }
}

impl<const W: u32, const H: u32> Iterator for ImageDirectoryInput<W, H> {
  type Item = RgbNchwFrame<W, H>;

  fn next(&mut self) -> Option<Self::Item> {
    while let Some(path) = self.pending.pop_front() {
      match load_resized(&path, W, H) {
        Ok(image) => {
          info!("读取图像: {}", path.display());
          return Some(RgbNchwFrame::from(&image));
        }
        Err(e) => warn!("跳过无法读取的图像 {}: {}", path.display(), e),
      }
    }
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  fn folder_url(path: &std::path::Path) -> Url {
    let url = Url::from_directory_path(path).unwrap();
    Url::parse(&url.as_str().replacen("file:", "folder:", 1)).unwrap()
  }

  #[test]
  fn reads_images_in_name_order_and_skips_broken_files() {
    let dir = tempfile::tempdir().unwrap();
    RgbImage::from_pixel(4, 4, Rgb([2, 0, 0]))
      .save(dir.path().join("b.png"))
      .unwrap();
    RgbImage::from_pixel(4, 4, Rgb([1, 0, 0]))
      .save(dir.path().join("a.png"))
      .unwrap();
    std::fs::write(dir.path().join("c.png"), b"not an image").unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

    let mut input = ImageDirectoryInput::<4, 4>::from_url(&folder_url(dir.path())).unwrap();
    assert_eq!(input.remaining(), 3);

    use crate::input::AsNchwFrame;
    assert_eq!(input.next().unwrap().as_nchw()[0], 1);
    assert_eq!(input.next().unwrap().as_nchw()[0], 2);
    assert!(input.next().is_none());
  }

  #[test]
  fn rejects_missing_directory() {
    let url = Url::parse("folder:///definitely/not/here").unwrap();
    assert!(matches!(
      ImageDirectoryInput::<4, 4>::from_url(&url),
      Err(ImageDirectoryInputError::NotADirectory(_))
    ));
  }
}
