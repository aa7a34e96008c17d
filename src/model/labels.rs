// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// src/model/labels.rs - 类别标签表
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

use tracing::debug;

use crate::model::DetectError;

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

/// 不可变的类别名称表，下标即类别 ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
  labels: Box<[String]>,
}

impl Default for LabelTable {
  fn default() -> Self {
    LabelTable::coco()
  }
}

impl LabelTable {
  pub fn new(labels: Vec<String>) -> Result<Self, DetectError> {
    if labels.is_empty() {
      return Err(DetectError::InvalidConfig("类别标签表为空".to_string()));
    }
    Ok(LabelTable {
      labels: labels.into_boxed_slice(),
    })
  }

  pub fn coco() -> Self {
    LabelTable {
      labels: COCO_CLASSES.iter().map(|s| s.to_string()).collect(),
    }
  }

  /// 按行解析标签文本，去掉行尾 `\r` 以及末尾的空行
  pub fn from_text(text: &str) -> Result<Self, DetectError> {
    let mut labels: Vec<String> = text
      .split('\n')
      .map(|line| line.trim_end_matches('\r').to_string())
      .collect();
    while labels.last().is_some_and(|label| label.is_empty()) {
      labels.pop();
    }
    LabelTable::new(labels)
  }

  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DetectError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let table = LabelTable::from_text(&text)?;
    debug!("从 {} 加载 {} 个类别标签", path.display(), table.len());
    Ok(table)
  }

  pub fn get(&self, class_id: usize) -> Option<&str> {
    self.labels.get(class_id).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.labels.iter().map(String::as_str)
  }
}
