// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// tests/properties.rs - 后处理性质测试
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

use proptest::prelude::*;
use tiny_yolo::model::{
  DetectConfig, LabelTable, OutputTensor, OverlapFormula, PixelBox, Postprocess,
  SuppressionPolicy, TensorLayout, decode_outputs, intersection_over_union, suppress,
};

// 小分辨率与少量类别，保证用例足够快
const RESOLUTION: u32 = 128;
const COARSE: usize = 4;
const FINE: usize = 8;
const CLASSES: usize = 2;
const CHANNELS: usize = 3 * (5 + CLASSES);

fn labels() -> LabelTable {
  LabelTable::new(vec!["cat".to_string(), "dog".to_string()]).unwrap()
}

fn config(confidence: f32) -> DetectConfig {
  DetectConfig::default()
    .with_input_resolution(RESOLUTION)
    .with_confidence_threshold(confidence)
}

fn grid(size: usize) -> impl Strategy<Value = OutputTensor> {
  prop::collection::vec(-4.0f32..4.0, size * size * CHANNELS).prop_map(move |data| {
    OutputTensor::new(data, [1, size, size, CHANNELS], TensorLayout::Nhwc).unwrap()
  })
}

fn pixel_box() -> impl Strategy<Value = PixelBox> {
  (
    -320.0f32..320.0,
    -320.0f32..320.0,
    1.0f32..200.0,
    1.0f32..200.0,
    0.0f32..1.0,
    prop::sample::select(vec!["cat", "dog", "bird"]),
  )
    .prop_map(|(x, y, width, height, score, label)| PixelBox {
      x,
      y,
      width,
      height,
      score,
      label: label.to_string(),
    })
}

fn policy() -> impl Strategy<Value = SuppressionPolicy> {
  prop::sample::select(vec![
    SuppressionPolicy::KeepLater,
    SuppressionPolicy::HighestScore,
  ])
}

fn formula() -> impl Strategy<Value = OverlapFormula> {
  prop::sample::select(vec![OverlapFormula::Conventional, OverlapFormula::Legacy])
}

proptest! {
  #[test]
  fn detection_is_deterministic(coarse in grid(COARSE), fine in grid(FINE)) {
    let postprocess = Postprocess::new(labels(), config(0.5)).unwrap();
    let first = postprocess.detect(&coarse, &fine).unwrap();
    let second = postprocess.detect(&coarse, &fine).unwrap();
    prop_assert_eq!(first, second);
  }

  #[test]
  fn raising_confidence_never_adds_candidates(
    coarse in grid(COARSE),
    fine in grid(FINE),
    low in -1.0f32..3.0,
    delta in 0.0f32..2.0,
  ) {
    let loose = decode_outputs(&coarse, &fine, &labels(), &config(low)).unwrap();
    let strict = decode_outputs(&coarse, &fine, &labels(), &config(low + delta)).unwrap();
    prop_assert!(strict.len() <= loose.len());
    for raw in &strict {
      prop_assert!(loose.contains(raw));
    }
  }

  #[test]
  fn decoded_anchors_match_their_grid(coarse in grid(COARSE), fine in grid(FINE)) {
    let config = config(0.0);
    let raws = decode_outputs(&coarse, &fine, &labels(), &config).unwrap();
    for raw in &raws {
      let size = config.grid_for_anchor(raw.anchor_index);
      prop_assert!(raw.anchor_index < 6);
      prop_assert!(raw.cell_x < size && raw.cell_y < size);
      prop_assert!(raw.score > 0.0);
    }
    // 细网格的候选框排在前面
    let first_coarse = raws.iter().position(|raw| raw.anchor_index >= 3).unwrap_or(raws.len());
    prop_assert!(raws[first_coarse..].iter().all(|raw| raw.anchor_index >= 3));
  }

  #[test]
  fn iou_is_symmetric_and_bounded(a in pixel_box(), b in pixel_box()) {
    let ab = intersection_over_union(&a, &b, OverlapFormula::Conventional);
    let ba = intersection_over_union(&b, &a, OverlapFormula::Conventional);
    prop_assert_eq!(ab, ba);
    prop_assert!((0.0..=1.0).contains(&ab));

    let legacy_ab = intersection_over_union(&a, &b, OverlapFormula::Legacy);
    let legacy_ba = intersection_over_union(&b, &a, OverlapFormula::Legacy);
    prop_assert_eq!(legacy_ab, legacy_ba);
  }

  #[test]
  fn disjoint_boxes_do_not_overlap(a in pixel_box(), gap in 0.1f32..50.0) {
    let mut b = a.clone();
    b.x = a.right() + gap + 0.5 * b.width;
    prop_assert_eq!(intersection_over_union(&a, &b, OverlapFormula::Conventional), 0.0);
  }

  #[test]
  fn distinct_labels_never_suppress_each_other(
    a in pixel_box(),
    policy in policy(),
    formula in formula(),
  ) {
    let mut b = a.clone();
    b.label = format!("{}-other", a.label);
    let survivors = suppress(vec![a.clone(), b.clone()], 0.0, formula, policy);
    prop_assert_eq!(survivors, vec![a, b]);
  }

  #[test]
  fn suppression_is_idempotent(
    boxes in prop::collection::vec(pixel_box(), 0..24),
    threshold in 0.0f32..1.0,
    policy in policy(),
    formula in formula(),
  ) {
    let once = suppress(boxes, threshold, formula, policy);
    let twice = suppress(once.clone(), threshold, formula, policy);
    prop_assert_eq!(once, twice);
  }

  #[test]
  fn survivors_keep_relative_order(
    boxes in prop::collection::vec(pixel_box(), 0..24),
    policy in policy(),
  ) {
    let tagged: Vec<PixelBox> = boxes
      .into_iter()
      .enumerate()
      .map(|(i, mut item)| {
        item.score = i as f32;
        item
      })
      .collect();
    let survivors = suppress(tagged, 0.45, OverlapFormula::Conventional, policy);
    prop_assert!(survivors.windows(2).all(|w| w[0].score < w[1].score));
  }
}
