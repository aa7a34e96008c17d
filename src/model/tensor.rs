// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// src/model/tensor.rs - 模型输出张量视图
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

use serde::Deserialize;

use crate::model::DetectError;

/// 只读的四维网格张量，按 `(batch, row, col, channel)` 访问
pub trait GridTensor {
  /// 逻辑维度 `[batch, rows, cols, channels]`
  fn dims(&self) -> [usize; 4];

  fn at(&self, batch: usize, row: usize, col: usize, channel: usize) -> f32;
}

/// 张量在内存中的排布
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TensorLayout {
  /// `[batch, height, width, channel]`，引擎侧常见排布
  Nhwc,
  /// `[batch, channel, height, width]`，ONNX 卷积输出排布
  Nchw,
}

#[derive(Debug, Clone)]
pub struct OutputTensor {
  data: Box<[f32]>,
  dims: [usize; 4],
  layout: TensorLayout,
}

impl OutputTensor {
  /// `shape` 按存储顺序给出（NHWC 或 NCHW）
  pub fn new(data: Vec<f32>, shape: [usize; 4], layout: TensorLayout) -> Result<Self, DetectError> {
    let expected = shape
      .iter()
      .try_fold(1usize, |acc, &d| acc.checked_mul(d))
      .ok_or_else(|| DetectError::InvalidInput(format!("张量形状溢出: {:?}", shape)))?;

    if data.len() != expected {
      return Err(DetectError::InvalidInput(format!(
        "张量数据长度 {} 与形状 {:?} 不符（期望 {}）",
        data.len(),
        shape,
        expected
      )));
    }

    let dims = match layout {
      TensorLayout::Nhwc => shape,
      TensorLayout::Nchw => [shape[0], shape[2], shape[3], shape[1]],
    };

    Ok(OutputTensor {
      data: data.into_boxed_slice(),
      dims,
      layout,
    })
  }

  pub fn layout(&self) -> TensorLayout {
    self.layout
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  fn offset(&self, batch: usize, row: usize, col: usize, channel: usize) -> usize {
    let [_, rows, cols, channels] = self.dims;
    match self.layout {
      TensorLayout::Nhwc => ((batch * rows + row) * cols + col) * channels + channel,
      TensorLayout::Nchw => ((batch * channels + channel) * rows + row) * cols + col,
    }
  }
}

impl GridTensor for OutputTensor {
  fn dims(&self) -> [usize; 4] {
    self.dims
  }

  fn at(&self, batch: usize, row: usize, col: usize, channel: usize) -> f32 {
    self.data[self.offset(batch, row, col, channel)]
  }
}

impl<T: GridTensor + ?Sized> GridTensor for &T {
  fn dims(&self) -> [usize; 4] {
    (**self).dims()
  }

  fn at(&self, batch: usize, row: usize, col: usize, channel: usize) -> f32 {
    (**self).at(batch, row, col, channel)
  }
}

/// 以 JSON 保存的张量转储
///
/// ```json
/// { "shape": [1, 20, 20, 255], "layout": "nhwc", "data": [0.0, ...] }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct TensorDump {
  pub shape: [usize; 4],
  #[serde(default = "default_layout")]
  pub layout: TensorLayout,
  pub data: Vec<f32>,
}

fn default_layout() -> TensorLayout {
  TensorLayout::Nhwc
}

impl TryFrom<TensorDump> for OutputTensor {
  type Error = DetectError;

  fn try_from(dump: TensorDump) -> Result<Self, Self::Error> {
    OutputTensor::new(dump.data, dump.shape, dump.layout)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn nhwc_and_nchw_agree_on_logical_index() {
    // 1 x 2 x 3 x 4，数值编码为 row*100 + col*10 + channel
    let (rows, cols, channels) = (2, 3, 4);
    let mut nhwc = Vec::new();
    for r in 0..rows {
      for c in 0..cols {
        for ch in 0..channels {
          nhwc.push((r * 100 + c * 10 + ch) as f32);
        }
      }
    }
    let mut nchw = Vec::new();
    for ch in 0..channels {
      for r in 0..rows {
        for c in 0..cols {
          nchw.push((r * 100 + c * 10 + ch) as f32);
        }
      }
    }

    let a = OutputTensor::new(nhwc, [1, rows, cols, channels], TensorLayout::Nhwc).unwrap();
    let b = OutputTensor::new(nchw, [1, channels, rows, cols], TensorLayout::Nchw).unwrap();

    assert_eq!(a.dims(), [1, 2, 3, 4]);
    assert_eq!(b.dims(), [1, 2, 3, 4]);
    for r in 0..rows {
      for c in 0..cols {
        for ch in 0..channels {
          assert_eq!(a.at(0, r, c, ch), b.at(0, r, c, ch));
        }
      }
    }
    assert_eq!(a.at(0, 1, 2, 3), 123.0);
  }

  #[test]
  fn rejects_length_mismatch() {
    let err = OutputTensor::new(vec![0.0; 5], [1, 2, 2, 1], TensorLayout::Nhwc).unwrap_err();
    assert!(matches!(err, DetectError::InvalidInput(_)));
  }

  #[test]
  fn loads_dump_from_json() {
    let json = r#"{ "shape": [1, 1, 1, 2], "data": [0.5, 1.5] }"#;
    let dump: TensorDump = serde_json::from_str(json).unwrap();
    assert_eq!(dump.layout, TensorLayout::Nhwc);
    let tensor = OutputTensor::try_from(dump).unwrap();
    assert_eq!(tensor.at(0, 0, 0, 1), 1.5);

    let json = r#"{ "shape": [1, 2, 1, 1], "layout": "nchw", "data": [0.5, 1.5] }"#;
    let dump: TensorDump = serde_json::from_str(json).unwrap();
    let tensor = OutputTensor::try_from(dump).unwrap();
    assert_eq!(tensor.dims(), [1, 1, 1, 2]);
    assert_eq!(tensor.at(0, 0, 0, 1), 1.5);
  }
}
