// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{
  frame::RgbNchwFrame,
  model::{DetectResult, PixelBox},
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const BORDER_THICKNESS: i32 = 2;

// 按类别名选取颜色，同类物体颜色一致
const PALETTE: [[u8; 3]; 6] = [
  [0, 0, 255],
  [255, 0, 0],
  [0, 160, 0],
  [255, 128, 0],
  [160, 0, 160],
  [0, 160, 160],
];

#[derive(Error, Debug)]
pub enum FontError {
  #[error("无法读取字体文件: {0}")]
  Io(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  Invalid(String),
}

pub fn load_font<P: AsRef<Path>>(path: P) -> Result<FontArc, FontError> {
  let data = std::fs::read(path.as_ref())?;
  FontArc::try_from_vec(data).map_err(|e| FontError::Invalid(e.to_string()))
}

fn label_color(label: &str) -> [u8; 3] {
  let hash = label
    .bytes()
    .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
  PALETTE[hash % PALETTE.len()]
}

/// 在图像上绘制检测框；没有字体时只画边框不写标签
#[derive(Clone, Default)]
pub struct Draw {
  font: Option<FontArc>,
}

impl Draw {
  pub fn with_font(font: FontArc) -> Self {
    Draw { font: Some(font) }
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  // bbox 为像素坐标 [x_min, y_min, x_max, y_max]，原点在左上角
  fn draw_bbox_with_label(&self, image: &mut RgbImage, bbox: &[f32; 4], label: &str, score: f32) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 {
      return;
    }
    let color = label_color(label);

    let x_min = (bbox[0].floor() as i32).clamp(0, w - 1);
    let y_min = (bbox[1].floor() as i32).clamp(0, h - 1);
    let x_max = (bbox[2].ceil() as i32).clamp(0, w - 1);
    let y_max = (bbox[3].ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    for thickness in 0..BORDER_THICKNESS {
      let x_min_t = (x_min + thickness).min(x_max);
      let y_min_t = (y_min + thickness).min(y_max);
      let x_max_t = (x_max - thickness).max(x_min_t);
      let y_max_t = (y_max - thickness).max(y_min_t);

      for x in x_min_t..=x_max_t {
        image.put_pixel(x as u32, y_min_t as u32, Rgb(color));
        image.put_pixel(x as u32, y_max_t as u32, Rgb(color));
      }
      for y in y_min_t..=y_max_t {
        image.put_pixel(x_min_t as u32, y as u32, Rgb(color));
        image.put_pixel(x_max_t as u32, y as u32, Rgb(color));
      }
    }

    let Some(font) = &self.font else {
      return;
    };

    let text = format!("{} {:.2}", label, score);
    let text_width = (text.chars().count() as f32 * LABEL_CHAR_WIDTH) as i32;

    // 标签放在边框上方
    let label_x = x_min;
    let label_y = (y_min - LABEL_TEXT_HEIGHT).max(0);
    let label_width = text_width.min(w - label_x).max(0) as u32;

    if label_width > 0 {
      let rect = imageproc::rect::Rect::at(label_x, label_y).of_size(label_width, LABEL_TEXT_HEIGHT as u32);
      draw_filled_rect_mut(image, rect, Rgb(color));
      draw_text_mut(
        image,
        Rgb([255u8, 255u8, 255u8]),
        label_x,
        label_y + LABEL_TEXT_VERTICAL_PADDING,
        PxScale::from(LABEL_FONT_SIZE),
        font,
        &text,
      );
    }
  }

  pub fn draw_detections_on_image(&self, image: &mut RgbImage, result: &DetectResult) {
    let (w, h) = (image.width() as f32, image.height() as f32);
    for item in result.items.iter() {
      self.draw_bbox_with_label(image, &item.corners(w, h), &item.label, item.score);
    }
    debug!("绘制 {} 个检测框", result.len());
  }

  pub fn draw_detection<const W: u32, const H: u32>(
    &self,
    frame: &RgbNchwFrame<W, H>,
    result: &DetectResult,
  ) -> RgbImage {
    let mut image = frame.to_rgb_image();
    self.draw_detections_on_image(&mut image, result);
    image
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
  /// 每行 `label, score, x_min, y_min, x_max, y_max`
  Name,
  Json,
}

#[derive(Serialize)]
struct RecordEntry<'a> {
  #[serde(flatten)]
  item: &'a PixelBox,
  bbox: [f32; 4],
}

/// 把检测结果写在图像文件旁边
pub struct Record {
  pub format: RecordFormat,
}

impl Record {
  pub fn record(
    &self,
    result: &DetectResult,
    image_width: u32,
    image_height: u32,
    path: &Path,
  ) -> Result<(), std::io::Error> {
    let (w, h) = (image_width as f32, image_height as f32);
    match self.format {
      RecordFormat::Name => {
        let records: Vec<String> = result
          .items
          .iter()
          .map(|item| {
            let bbox = item.corners(w, h);
            format!(
              "{}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}",
              item.label, item.score, bbox[0], bbox[1], bbox[2], bbox[3]
            )
          })
          .collect();
        std::fs::write(path.with_extension("txt"), records.join("\n"))
      }
      RecordFormat::Json => {
        let entries: Vec<RecordEntry> = result
          .items
          .iter()
          .map(|item| RecordEntry {
            item,
            bbox: item.corners(w, h),
          })
          .collect();
        let json = serde_json::to_string_pretty(&entries).map_err(std::io::Error::other)?;
        std::fs::write(path.with_extension("json"), json)
      }
    }
  }
}
