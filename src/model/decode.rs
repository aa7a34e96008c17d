// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// src/model/decode.rs - 原始输出网格解码
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

use tracing::{debug, error};

use crate::model::{
  ANCHORS_PER_CELL, BOX_ATTRIBUTES, COARSE_ANCHOR_OFFSET, DetectConfig, DetectError,
  FINE_ANCHOR_OFFSET, GridTensor, LabelTable,
};

/// 坐标换算前的候选框，保存网络的原始输出
#[derive(Debug, Clone, PartialEq)]
pub struct RawBox {
  /// 中心偏移（未经 sigmoid）
  pub tx: f32,
  pub ty: f32,
  /// 尺寸缩放（未经指数变换）
  pub tw: f32,
  pub th: f32,
  /// objectness 置信度
  pub score: f32,
  pub label: String,
  /// 0..3 来自细网格，3..6 来自粗网格
  pub anchor_index: usize,
  pub cell_x: usize,
  pub cell_y: usize,
}

/// 检查输出张量是否为 `[1, grid, grid, 3 * (5 + classes)]`
pub fn check_grid_shape<T: GridTensor>(
  tensor: &T,
  grid: usize,
  classes: usize,
) -> Result<(), DetectError> {
  let expected = [1, grid, grid, ANCHORS_PER_CELL * (BOX_ATTRIBUTES + classes)];
  let actual = tensor.dims();
  if actual != expected {
    error!("输出张量形状不匹配: 期望 {:?}, 实际 {:?}", expected, actual);
    return Err(DetectError::InvalidInput(format!(
      "输出张量形状不匹配: 期望 {:?}, 实际 {:?}",
      expected, actual
    )));
  }
  Ok(())
}

/// 扫描一个 `grid x grid` 网格，把 objectness 严格大于阈值的框追加到 `boxes`
///
/// 形状不符时返回错误，不追加任何框。
pub fn decode_grid<T: GridTensor>(
  tensor: &T,
  grid: usize,
  anchor_offset: usize,
  labels: &LabelTable,
  confidence_threshold: f32,
  boxes: &mut Vec<RawBox>,
) -> Result<(), DetectError> {
  check_grid_shape(tensor, grid, labels.len())?;
  let classes = labels.len();
  let block = BOX_ATTRIBUTES + classes;

  for row in 0..grid {
    for col in 0..grid {
      for anchor in 0..ANCHORS_PER_CELL {
        let base = anchor * block;
        let objectness = tensor.at(0, row, col, base + 4);
        // NaN 同样视为未通过
        if objectness.is_nan() || objectness <= confidence_threshold {
          continue;
        }

        // 初始最大值为 0，全部为负时落在类别 0
        let mut best_value = 0.0f32;
        let mut best_index = 0usize;
        for class_id in 0..classes {
          let value = tensor.at(0, row, col, base + BOX_ATTRIBUTES + class_id);
          if value > best_value {
            best_value = value;
            best_index = class_id;
          }
        }

        boxes.push(RawBox {
          tx: tensor.at(0, row, col, base),
          ty: tensor.at(0, row, col, base + 1),
          tw: tensor.at(0, row, col, base + 2),
          th: tensor.at(0, row, col, base + 3),
          score: objectness,
          label: labels.get(best_index).unwrap_or("unknown").to_string(),
          anchor_index: anchor + anchor_offset,
          cell_x: col,
          cell_y: row,
        });
      }
    }
  }
  Ok(())
}

/// 解码两个输出网格：先细网格（锚框 0..3），再粗网格（锚框 3..6）
///
/// 两个张量的形状都通过校验后才开始解码。
pub fn decode_outputs<T: GridTensor, U: GridTensor>(
  coarse: &T,
  fine: &U,
  labels: &LabelTable,
  config: &DetectConfig,
) -> Result<Vec<RawBox>, DetectError> {
  let (coarse_grid, fine_grid) = (config.coarse_grid(), config.fine_grid());
  check_grid_shape(coarse, coarse_grid, labels.len())?;
  check_grid_shape(fine, fine_grid, labels.len())?;

  let mut boxes = Vec::new();
  decode_grid(
    fine,
    fine_grid,
    FINE_ANCHOR_OFFSET,
    labels,
    config.confidence_threshold,
    &mut boxes,
  )?;
  let fine_count = boxes.len();
  decode_grid(
    coarse,
    coarse_grid,
    COARSE_ANCHOR_OFFSET,
    labels,
    config.confidence_threshold,
    &mut boxes,
  )?;
  debug!(
    "解码得到 {} 个候选框（细网格 {}, 粗网格 {}）",
    boxes.len(),
    fine_count,
    boxes.len() - fine_count
  );

  Ok(boxes)
}
