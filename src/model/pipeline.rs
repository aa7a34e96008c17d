// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// src/model/pipeline.rs - 后处理流水线
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

use tracing::debug;

use crate::model::{
  DetectConfig, DetectError, GridTensor, LabelTable, PixelBox, convert_boxes, decode_outputs,
  suppress,
};

/// 解码 -> 像素换算 -> 非极大值抑制
///
/// 只持有不可变的标签表和配置，可在多个线程中对不同的输出并发调用。
#[derive(Debug, Clone)]
pub struct Postprocess {
  labels: LabelTable,
  config: DetectConfig,
}

impl Postprocess {
  pub fn new(labels: LabelTable, config: DetectConfig) -> Result<Self, DetectError> {
    config.validate()?;
    Ok(Postprocess { labels, config })
  }

  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }

  pub fn config(&self) -> &DetectConfig {
    &self.config
  }

  /// `coarse` 为 20x20 输出（640 输入时），`fine` 为 40x40 输出
  pub fn detect<C: GridTensor, F: GridTensor>(
    &self,
    coarse: &C,
    fine: &F,
  ) -> Result<Vec<PixelBox>, DetectError> {
    let raws = decode_outputs(coarse, fine, &self.labels, &self.config)?;
    if raws.is_empty() {
      debug!("没有候选框超过置信度阈值 {}", self.config.confidence_threshold);
      return Ok(Vec::new());
    }

    let boxes = convert_boxes(&raws, &self.config)?;
    Ok(suppress(
      boxes,
      self.config.iou_threshold,
      self.config.overlap,
      self.config.suppression,
    ))
  }
}
