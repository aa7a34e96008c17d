// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// src/model/config.rs - 检测配置与锚框
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

use std::str::FromStr;

use crate::model::DetectError;

/// 每个网格单元预测的框数
pub const ANCHORS_PER_CELL: usize = 3;
/// 每个框的 tx, ty, tw, th, objectness
pub const BOX_ATTRIBUTES: usize = 5;
/// 粗网格（20x20 @ 640）的步长
pub const COARSE_STRIDE: u32 = 32;
/// 细网格（40x40 @ 640）的步长
pub const FINE_STRIDE: u32 = 16;
pub const COARSE_ANCHOR_OFFSET: usize = 3;
pub const FINE_ANCHOR_OFFSET: usize = 0;

const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
const DEFAULT_IOU_THRESHOLD: f32 = 0.45;
const DEFAULT_INPUT_RESOLUTION: u32 = 640;

/// 6 组锚框 (宽, 高)，0..3 对应细网格，3..6 对应粗网格
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorTable([(f32, f32); 6]);

impl Default for AnchorTable {
  fn default() -> Self {
    AnchorTable([
      (10.0, 14.0),
      (23.0, 27.0),
      (37.0, 58.0),
      (81.0, 82.0),
      (135.0, 169.0),
      (344.0, 319.0),
    ])
  }
}

impl AnchorTable {
  pub const fn new(pairs: [(f32, f32); 6]) -> Self {
    AnchorTable(pairs)
  }

  pub fn get(&self, index: usize) -> Option<(f32, f32)> {
    self.0.get(index).copied()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

/// 交并比中交集矩形右下角的计算方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapFormula {
  /// 右下角取两框的较小值
  ///
  /// 默认值。旧版部署使用的是 [`OverlapFormula::Legacy`]，这里改为常规公式，
  /// 使交并比落在 [0, 1]、不相交时为 0。
  #[default]
  Conventional,
  /// 右下角取两框的较大值，并集为正时与旧版部署的数值一致。
  /// 该公式的“交集”经常退化，不保证结果落在 [0, 1]。
  /// 并集不为正时旧版会得到负数或无穷大，这里返回 0。
  Legacy,
}

impl FromStr for OverlapFormula {
  type Err = DetectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "conventional" => Ok(OverlapFormula::Conventional),
      "legacy" => Ok(OverlapFormula::Legacy),
      other => Err(DetectError::InvalidConfig(format!(
        "未知的交并比公式: {}",
        other
      ))),
    }
  }
}

/// 同类重叠框的取舍规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuppressionPolicy {
  /// 重叠时丢弃列表中靠前的框，保留靠后的框
  #[default]
  KeepLater,
  /// 按 objectness 分数从高到低保留
  HighestScore,
}

impl FromStr for SuppressionPolicy {
  type Err = DetectError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "keep-later" => Ok(SuppressionPolicy::KeepLater),
      "highest-score" => Ok(SuppressionPolicy::HighestScore),
      other => Err(DetectError::InvalidConfig(format!(
        "未知的抑制策略: {}",
        other
      ))),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectConfig {
  pub confidence_threshold: f32,
  pub iou_threshold: f32,
  /// 正方形输入边长（像素）
  pub input_resolution: u32,
  pub anchors: AnchorTable,
  pub overlap: OverlapFormula,
  pub suppression: SuppressionPolicy,
}

impl Default for DetectConfig {
  fn default() -> Self {
    DetectConfig {
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      iou_threshold: DEFAULT_IOU_THRESHOLD,
      input_resolution: DEFAULT_INPUT_RESOLUTION,
      anchors: AnchorTable::default(),
      overlap: OverlapFormula::default(),
      suppression: SuppressionPolicy::default(),
    }
  }
}

impl DetectConfig {
  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
    self.iou_threshold = threshold;
    self
  }

  pub fn with_input_resolution(mut self, resolution: u32) -> Self {
    self.input_resolution = resolution;
    self
  }

  pub fn with_anchors(mut self, anchors: AnchorTable) -> Self {
    self.anchors = anchors;
    self
  }

  pub fn with_overlap(mut self, overlap: OverlapFormula) -> Self {
    self.overlap = overlap;
    self
  }

  pub fn with_suppression(mut self, suppression: SuppressionPolicy) -> Self {
    self.suppression = suppression;
    self
  }

  pub fn validate(&self) -> Result<(), DetectError> {
    if !self.confidence_threshold.is_finite() {
      return Err(DetectError::InvalidConfig(format!(
        "置信度阈值必须是有限数值: {}",
        self.confidence_threshold
      )));
    }
    if !self.iou_threshold.is_finite() {
      return Err(DetectError::InvalidConfig(format!(
        "IoU 阈值必须是有限数值: {}",
        self.iou_threshold
      )));
    }
    if self.input_resolution == 0 || self.input_resolution % COARSE_STRIDE != 0 {
      return Err(DetectError::InvalidConfig(format!(
        "输入分辨率必须是 {} 的正整数倍: {}",
        COARSE_STRIDE, self.input_resolution
      )));
    }
    Ok(())
  }

  /// 粗网格边长，640 输入时为 20
  pub fn coarse_grid(&self) -> usize {
    (self.input_resolution / COARSE_STRIDE) as usize
  }

  /// 细网格边长，640 输入时为 40
  pub fn fine_grid(&self) -> usize {
    (self.input_resolution / FINE_STRIDE) as usize
  }

  /// 锚框索引 >= 3 来自粗网格，否则来自细网格
  pub fn grid_for_anchor(&self, anchor_index: usize) -> usize {
    if anchor_index >= COARSE_ANCHOR_OFFSET {
      self.coarse_grid()
    } else {
      self.fine_grid()
    }
  }

  /// 单元格在像素空间的边长
  pub fn cell_pitch(&self, grid: usize) -> f32 {
    (self.input_resolution as usize / grid) as f32
  }
}
