// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// src/model/nms.rs - 非极大值抑制
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

use crate::model::{OverlapFormula, PixelBox, SuppressionPolicy};

/// 计算两个框的交并比
pub fn intersection_over_union(a: &PixelBox, b: &PixelBox, formula: OverlapFormula) -> f32 {
  let x_left = a.left().max(b.left());
  let y_top = a.top().max(b.top());
  let (x_right, y_bottom) = match formula {
    OverlapFormula::Conventional => (a.right().min(b.right()), a.bottom().min(b.bottom())),
    OverlapFormula::Legacy => (a.right().max(b.right()), a.bottom().max(b.bottom())),
  };

  if x_right < x_left || y_bottom < y_top {
    return 0.0;
  }

  let intersection = (x_right - x_left) * (y_bottom - y_top);
  let union = a.area() + b.area() - intersection;
  if intersection <= 0.0 || union <= 0.0 {
    return 0.0;
  }
  intersection / union
}

/// 去除同类重叠框，幸存框保持原有相对顺序
///
/// 不同类别的框无论重叠多少都不会互相抑制。
pub fn suppress(
  boxes: Vec<PixelBox>,
  iou_threshold: f32,
  formula: OverlapFormula,
  policy: SuppressionPolicy,
) -> Vec<PixelBox> {
  let overlaps = |a: &PixelBox, b: &PixelBox| {
    a.label == b.label && intersection_over_union(a, b, formula) > iou_threshold
  };

  let keep = match policy {
    SuppressionPolicy::KeepLater => keep_later(&boxes, overlaps),
    SuppressionPolicy::HighestScore => keep_highest_score(&boxes, overlaps),
  };

  let before = boxes.len();
  let survivors: Vec<PixelBox> = boxes
    .into_iter()
    .zip(keep)
    .filter_map(|(item, keep)| keep.then_some(item))
    .collect();
  debug!("非极大值抑制: {} -> {}", before, survivors.len());
  survivors
}

/// 某个框与其后任一框重叠时被移除
///
/// 等价于原地删除第 i 个框后从新的第 i 个框重新开始内层扫描：
/// 删除只发生在当前位置，当前位置之后的框在被检查前始终都在列表中。
fn keep_later<F>(boxes: &[PixelBox], overlaps: F) -> Vec<bool>
where
  F: Fn(&PixelBox, &PixelBox) -> bool,
{
  (0..boxes.len())
    .map(|i| !boxes[i + 1..].iter().any(|later| overlaps(&boxes[i], later)))
    .collect()
}

fn keep_highest_score<F>(boxes: &[PixelBox], overlaps: F) -> Vec<bool>
where
  F: Fn(&PixelBox, &PixelBox) -> bool,
{
  let mut order: Vec<usize> = (0..boxes.len()).collect();
  // 稳定排序，同分时靠前的框优先
  order.sort_by(|&a, &b| boxes[b].score.total_cmp(&boxes[a].score));

  let mut keep = vec![false; boxes.len()];
  let mut suppressed = vec![false; boxes.len()];
  for (rank, &i) in order.iter().enumerate() {
    if suppressed[i] {
      continue;
    }
    keep[i] = true;
    for &j in &order[rank + 1..] {
      if !suppressed[j] && overlaps(&boxes[i], &boxes[j]) {
        suppressed[j] = true;
      }
    }
  }
  keep
}

#[cfg(test)]
mod tests {
  use super::*;

  fn pixel(x: f32, y: f32, width: f32, height: f32, label: &str) -> PixelBox {
    PixelBox {
      x,
      y,
      width,
      height,
      score: 0.5,
      label: label.to_string(),
    }
  }

  #[test]
  fn identical_boxes_have_unit_iou() {
    let a = pixel(3.0, -7.0, 20.0, 10.0, "dog");
    assert_eq!(
      intersection_over_union(&a, &a.clone(), OverlapFormula::Conventional),
      1.0
    );
  }

  #[test]
  fn conventional_partial_and_disjoint() {
    let a = pixel(0.0, 0.0, 10.0, 10.0, "dog");
    let b = pixel(5.0, 0.0, 10.0, 10.0, "dog");
    // 交集 50，并集 150
    let iou = intersection_over_union(&a, &b, OverlapFormula::Conventional);
    assert!((iou - 1.0 / 3.0).abs() < 1e-6);

    let c = pixel(100.0, 100.0, 10.0, 10.0, "dog");
    assert_eq!(intersection_over_union(&a, &c, OverlapFormula::Conventional), 0.0);

    // 仅边相接
    let d = pixel(10.0, 0.0, 10.0, 10.0, "dog");
    assert_eq!(intersection_over_union(&a, &d, OverlapFormula::Conventional), 0.0);
  }

  #[test]
  fn legacy_formula_reports_overlap_for_disjoint_boxes() {
    let a = pixel(0.0, 0.0, 10.0, 10.0, "dog");
    let b = pixel(20.0, 0.0, 10.0, 10.0, "dog");
    // 交集矩形取 [15, 25] x [-5, 5]，面积 100，并集 100
    assert_eq!(intersection_over_union(&a, &b, OverlapFormula::Legacy), 1.0);
    assert_eq!(intersection_over_union(&a, &b, OverlapFormula::Conventional), 0.0);
  }

  #[test]
  fn legacy_formula_returns_zero_for_non_positive_union() {
    // [0, 10] x [20, 100] 与 [20, 100] x [0, 10]
    // 退化交集 80 x 80 = 6400 大于两框面积之和 1600
    let a = pixel(5.0, 60.0, 10.0, 80.0, "dog");
    let b = pixel(60.0, 5.0, 80.0, 10.0, "dog");
    assert_eq!(intersection_over_union(&a, &b, OverlapFormula::Legacy), 0.0);
    assert_eq!(intersection_over_union(&b, &a, OverlapFormula::Legacy), 0.0);
  }

  #[test]
  fn keep_later_drops_the_earlier_box() {
    let boxes = vec![
      pixel(0.0, 0.0, 10.0, 10.0, "dog"),
      pixel(50.0, 50.0, 10.0, 10.0, "cat"),
      pixel(0.5, 0.0, 10.0, 10.0, "dog"),
    ];
    let kept = suppress(
      boxes.clone(),
      0.45,
      OverlapFormula::Conventional,
      SuppressionPolicy::KeepLater,
    );
    assert_eq!(kept, vec![boxes[1].clone(), boxes[2].clone()]);
  }

  #[test]
  fn keep_later_handles_chains() {
    // 三个互相重叠的同类框只留最后一个
    let boxes = vec![
      pixel(0.0, 0.0, 10.0, 10.0, "dog"),
      pixel(0.1, 0.0, 10.0, 10.0, "dog"),
      pixel(0.2, 0.0, 10.0, 10.0, "dog"),
    ];
    let kept = suppress(
      boxes.clone(),
      0.45,
      OverlapFormula::Conventional,
      SuppressionPolicy::KeepLater,
    );
    assert_eq!(kept, vec![boxes[2].clone()]);
  }

  #[test]
  fn different_labels_never_suppress() {
    let boxes = vec![
      pixel(0.0, 0.0, 10.0, 10.0, "dog"),
      pixel(0.0, 0.0, 10.0, 10.0, "cat"),
    ];
    for policy in [SuppressionPolicy::KeepLater, SuppressionPolicy::HighestScore] {
      let kept = suppress(boxes.clone(), 0.1, OverlapFormula::Conventional, policy);
      assert_eq!(kept.len(), 2);
    }
  }

  #[test]
  fn highest_score_keeps_best_and_original_order() {
    let mut low = pixel(0.0, 0.0, 10.0, 10.0, "dog");
    low.score = 0.3;
    let mut high = pixel(1.0, 0.0, 10.0, 10.0, "dog");
    high.score = 0.9;
    let mut other = pixel(200.0, 0.0, 10.0, 10.0, "dog");
    other.score = 0.1;
    let boxes = vec![other.clone(), high.clone(), low];
    let kept = suppress(
      boxes,
      0.45,
      OverlapFormula::Conventional,
      SuppressionPolicy::HighestScore,
    );
    assert_eq!(kept, vec![other, high]);
  }

  #[test]
  fn empty_input_is_fine() {
    let kept = suppress(
      Vec::new(),
      0.45,
      OverlapFormula::Conventional,
      SuppressionPolicy::KeepLater,
    );
    assert!(kept.is_empty());
  }
}
