// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// src/model/convert.rs - 候选框到像素坐标的换算
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

use serde::Serialize;
use tracing::debug;

use crate::model::{DetectConfig, DetectError, RawBox};

/// 像素空间中的检测框
///
/// `x`, `y` 是框中心相对图像中心的偏移（y 向下为正），
/// `width`, `height` 为像素尺寸。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PixelBox {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
  /// objectness 置信度
  pub score: f32,
  pub label: String,
}

impl PixelBox {
  pub fn left(&self) -> f32 {
    self.x - 0.5 * self.width
  }

  pub fn right(&self) -> f32 {
    self.x + 0.5 * self.width
  }

  pub fn top(&self) -> f32 {
    self.y - 0.5 * self.height
  }

  pub fn bottom(&self) -> f32 {
    self.y + 0.5 * self.height
  }

  /// 由边界计算的面积，与交并比使用同一套边界
  pub fn area(&self) -> f32 {
    (self.right() - self.left()) * (self.bottom() - self.top())
  }

  /// 以图像左上角为原点的 `[x_min, y_min, x_max, y_max]`
  pub fn corners(&self, image_width: f32, image_height: f32) -> [f32; 4] {
    let (cx, cy) = (0.5 * image_width, 0.5 * image_height);
    [
      self.left() + cx,
      self.top() + cy,
      self.right() + cx,
      self.bottom() + cy,
    ]
  }
}

/// 不会溢出的 sigmoid
pub fn sigmoid(value: f32) -> f32 {
  if value >= 0.0 {
    1.0 / (1.0 + (-value).exp())
  } else {
    let e = value.exp();
    e / (1.0 + e)
  }
}

pub fn to_pixel_box(raw: &RawBox, config: &DetectConfig) -> Result<PixelBox, DetectError> {
  let (anchor_w, anchor_h) = config
    .anchors
    .get(raw.anchor_index)
    .ok_or(DetectError::InvalidAnchor(raw.anchor_index))?;

  let grid = config.grid_for_anchor(raw.anchor_index);
  let pitch = config.cell_pitch(grid);
  let origin = -0.5 * config.input_resolution as f32 + 0.5 * pitch;

  // 移到图像边缘 -> 移到单元中心 -> 加上单元偏移 -> 加上单元内偏移
  Ok(PixelBox {
    x: origin + pitch * raw.cell_x as f32 + sigmoid(raw.tx),
    y: origin + pitch * raw.cell_y as f32 + sigmoid(raw.ty),
    width: anchor_w * raw.tw.exp(),
    height: anchor_h * raw.th.exp(),
    score: raw.score,
    label: raw.label.clone(),
  })
}

/// 逐个换算，保持输入顺序
pub fn convert_boxes(raws: &[RawBox], config: &DetectConfig) -> Result<Vec<PixelBox>, DetectError> {
  let boxes = raws
    .iter()
    .map(|raw| to_pixel_box(raw, config))
    .collect::<Result<Vec<_>, _>>()?;
  debug!("换算得到 {} 个像素框", boxes.len());
  Ok(boxes)
}
