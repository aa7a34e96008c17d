// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// src/model.rs - 模型
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

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[PixelBox]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}

impl From<Vec<PixelBox>> for DetectResult {
  fn from(items: Vec<PixelBox>) -> Self {
    DetectResult {
      items: items.into_boxed_slice(),
    }
  }
}

mod config;
mod convert;
mod decode;
mod error;
mod executor;
mod labels;
mod nms;
mod pipeline;
mod tensor;
#[cfg(feature = "backend-tract")]
mod tract_executor;
mod yolov3_tiny;

pub use self::config::{
  ANCHORS_PER_CELL, AnchorTable, BOX_ATTRIBUTES, COARSE_ANCHOR_OFFSET, COARSE_STRIDE,
  DetectConfig, FINE_ANCHOR_OFFSET, FINE_STRIDE, OverlapFormula, SuppressionPolicy,
};
pub use self::convert::{PixelBox, convert_boxes, sigmoid, to_pixel_box};
pub use self::decode::{RawBox, check_grid_shape, decode_grid, decode_outputs};
pub use self::error::DetectError;
pub use self::executor::{Executor, InputTensor, NamedOutputs};
pub use self::labels::{COCO_CLASSES, LabelTable};
pub use self::nms::{intersection_over_union, suppress};
pub use self::pipeline::Postprocess;
pub use self::tensor::{GridTensor, OutputTensor, TensorDump, TensorLayout};
#[cfg(feature = "backend-tract")]
pub use self::tract_executor::{TractExecutor, TractExecutorError};
pub use self::yolov3_tiny::{
  COARSE_OUTPUT_NAME, FINE_OUTPUT_NAME, YoloV3Tiny, YoloV3TinyBuilder, YoloV3TinyError,
};
