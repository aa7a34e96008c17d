// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// src/model/executor.rs - 推理执行器接口
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

use crate::model::{DetectError, OutputTensor};

/// 归一化到 [0, 1] 的 NCHW 输入 `[1, 3, H, W]`
#[derive(Debug, Clone)]
pub struct InputTensor {
  pub data: Vec<f32>,
  pub shape: [usize; 4],
}

/// 按名称索引的模型输出
#[derive(Debug, Clone, Default)]
pub struct NamedOutputs {
  outputs: Vec<(String, OutputTensor)>,
}

impl NamedOutputs {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, name: impl Into<String>, tensor: OutputTensor) {
    let name = name.into();
    match self.outputs.iter_mut().find(|(n, _)| *n == name) {
      Some((_, existing)) => *existing = tensor,
      None => self.outputs.push((name, tensor)),
    }
  }

  pub fn get(&self, name: &str) -> Option<&OutputTensor> {
    self
      .outputs
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, tensor)| tensor)
  }

  pub fn require(&self, name: &str) -> Result<&OutputTensor, DetectError> {
    self
      .get(name)
      .ok_or_else(|| DetectError::MissingOutput(name.to_string()))
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.outputs.iter().map(|(n, _)| n.as_str())
  }

  pub fn len(&self) -> usize {
    self.outputs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.outputs.is_empty()
  }
}

/// 神经网络执行器：输入图像张量，返回命名输出
pub trait Executor {
  type Error: std::error::Error + Send + Sync + 'static;

  fn execute(&self, input: &InputTensor) -> Result<NamedOutputs, Self::Error>;
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::TensorLayout;

  fn tensor(value: f32) -> OutputTensor {
    OutputTensor::new(vec![value], [1, 1, 1, 1], TensorLayout::Nhwc).unwrap()
  }

  #[test]
  fn insert_replaces_by_name() {
    let mut outputs = NamedOutputs::new();
    outputs.insert("a", tensor(1.0));
    outputs.insert("b", tensor(2.0));
    outputs.insert("a", tensor(3.0));
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs.get("a").unwrap().as_slice(), &[3.0]);
    assert_eq!(outputs.names().collect::<Vec<_>>(), vec!["a", "b"]);
    assert!(matches!(
      outputs.require("c"),
      Err(DetectError::MissingOutput(name)) if name == "c"
    ));
  }
}
