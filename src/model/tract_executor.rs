// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// src/model/tract_executor.rs - 基于 tract 的 ONNX 执行器
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

use thiserror::Error;
use tracing::{debug, info};
use tract_onnx::prelude::*;

use crate::model::{Executor, InputTensor, NamedOutputs, OutputTensor, TensorLayout};

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

#[derive(Error, Debug)]
pub enum TractExecutorError {
  #[error("模型文件不存在: {0}")]
  ModelNotFound(String),
  #[error("模型加载错误: {0}")]
  Load(String),
  #[error("推理错误: {0}")]
  Run(String),
  #[error("输入形状 {actual:?} 与模型输入 {expected:?} 不符")]
  InputShape {
    expected: [usize; 4],
    actual: [usize; 4],
  },
  #[error("输出 {name} 不是四维张量: {shape:?}")]
  OutputRank { name: String, shape: Vec<usize> },
  #[error("输出转换错误: {0}")]
  Output(#[from] crate::model::DetectError),
}

/// 在 CPU 上运行 ONNX 模型，输出按给定名称返回（NCHW 排布）
pub struct TractExecutor {
  plan: RunnableModel,
  input_shape: [usize; 4],
  output_names: Vec<String>,
}

impl TractExecutor {
  pub fn load<P: AsRef<Path>>(
    model_path: P,
    input_resolution: u32,
    output_names: &[&str],
  ) -> Result<Self, TractExecutorError> {
    let path = model_path.as_ref();
    if !path.exists() {
      return Err(TractExecutorError::ModelNotFound(path.display().to_string()));
    }

    let side = input_resolution as usize;
    let input_shape = [1, 3, side, side];

    info!("加载 ONNX 模型: {}", path.display());
    let mut model = tract_onnx::onnx()
      .model_for_path(path)
      .map_err(|e| TractExecutorError::Load(format!("无法解析 {}: {e}", path.display())))?
      .with_input_fact(
        0,
        InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
      )
      .map_err(|e| TractExecutorError::Load(format!("无法设置输入形状: {e}")))?;

    model
      .set_output_names(output_names)
      .map_err(|e| TractExecutorError::Load(format!("无法选择输出 {:?}: {e}", output_names)))?;

    let plan = model
      .into_optimized()
      .map_err(|e| TractExecutorError::Load(format!("无法优化模型: {e}")))?
      .into_runnable()
      .map_err(|e| TractExecutorError::Load(format!("无法构建可执行模型: {e}")))?;
    info!("模型加载完成");
    debug!("模型输入形状: {:?}, 输出: {:?}", input_shape, output_names);

    Ok(TractExecutor {
      plan,
      input_shape,
      output_names: output_names.iter().map(|s| s.to_string()).collect(),
    })
  }
}

impl Executor for TractExecutor {
  type Error = TractExecutorError;

  fn execute(&self, input: &InputTensor) -> Result<NamedOutputs, Self::Error> {
    if input.shape != self.input_shape {
      return Err(TractExecutorError::InputShape {
        expected: self.input_shape,
        actual: input.shape,
      });
    }

    let [n, c, h, w] = input.shape;
    let array = tract_ndarray::Array4::from_shape_vec((n, c, h, w), input.data.clone())
      .map_err(|e| TractExecutorError::Run(format!("输入数据长度错误: {e}")))?;

    debug!("执行模型推理");
    let results = self
      .plan
      .run(tvec!(array.into_tensor().into()))
      .map_err(|e| TractExecutorError::Run(e.to_string()))?;

    let mut outputs = NamedOutputs::new();
    for (name, value) in self.output_names.iter().zip(results.iter()) {
      let view = value
        .to_array_view::<f32>()
        .map_err(|e| TractExecutorError::Run(format!("输出 {name} 不是 f32: {e}")))?;
      let shape: [usize; 4] = view
        .shape()
        .try_into()
        .map_err(|_| TractExecutorError::OutputRank {
          name: name.clone(),
          shape: view.shape().to_vec(),
        })?;
      let data: Vec<f32> = view.iter().copied().collect();
      debug!("输出 {}: {:?}", name, shape);
      outputs.insert(name.clone(), OutputTensor::new(data, shape, TensorLayout::Nchw)?);
    }

    Ok(outputs)
  }
}
