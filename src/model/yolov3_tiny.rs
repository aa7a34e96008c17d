// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// src/model/yolov3_tiny.rs - YOLOv3-tiny 模型定义
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

use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, decoded_path,
  frame::RgbNchwFrame,
  model::{
    DetectConfig, DetectError, DetectResult, Executor, InputTensor, LabelTable, Model,
    NamedOutputs, Postprocess,
  },
  query_value,
};

/// 20x20 网格输出的原始张量名
pub const COARSE_OUTPUT_NAME: &str = "016_convolutional";
/// 40x40 网格输出的原始张量名
pub const FINE_OUTPUT_NAME: &str = "023_convolutional";

#[derive(Error, Debug)]
pub enum YoloV3TinyError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("参数 {key} 无效: {value}")]
  InvalidParameter { key: String, value: String },
  #[error("模型输入尺寸 {width}x{height} 与配置分辨率 {resolution} 不符")]
  InputSize {
    width: u32,
    height: u32,
    resolution: u32,
  },
  #[error("后处理错误: {0}")]
  Detect(#[from] DetectError),
  #[error("执行器错误: {0}")]
  Executor(Box<dyn std::error::Error + Send + Sync>),
}

impl YoloV3TinyError {
  fn executor<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
    YoloV3TinyError::Executor(Box::new(err))
  }
}

pub struct YoloV3Tiny<E, const W: u32, const H: u32> {
  executor: E,
  postprocess: Postprocess,
  coarse_name: String,
  fine_name: String,
}

impl<E: Executor, const W: u32, const H: u32> YoloV3Tiny<E, W, H> {
  pub fn postprocess(&self) -> &Postprocess {
    &self.postprocess
  }

  /// 从命名输出中取出两个网格并执行后处理
  pub fn decode(&self, outputs: &NamedOutputs) -> Result<DetectResult, DetectError> {
    let coarse = outputs.require(&self.coarse_name)?;
    let fine = outputs.require(&self.fine_name)?;
    let boxes = self.postprocess.detect(coarse, fine)?;
    debug!("检测到 {} 个物体", boxes.len());
    Ok(DetectResult::from(boxes))
  }
}

impl<E: Executor, const W: u32, const H: u32> Model for YoloV3Tiny<E, W, H> {
  type Input = RgbNchwFrame<W, H>;
  type Output = DetectResult;
  type Error = YoloV3TinyError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("设置模型输入");
    let tensor = InputTensor::from(input);

    debug!("执行模型推理");
    let outputs = self
      .executor
      .execute(&tensor)
      .map_err(YoloV3TinyError::executor)?;

    debug!("后处理模型输出");
    Ok(self.decode(&outputs)?)
  }
}

/// 由 `yolov3tiny:///path/model.onnx?labels=...&confidence=...` 构建
#[derive(Debug, Clone)]
pub struct YoloV3TinyBuilder {
  model_path: String,
  labels_path: Option<String>,
  config: DetectConfig,
  coarse_name: String,
  fine_name: String,
}

impl Default for YoloV3TinyBuilder {
  fn default() -> Self {
    YoloV3TinyBuilder {
      model_path: String::new(),
      labels_path: None,
      config: DetectConfig::default(),
      coarse_name: COARSE_OUTPUT_NAME.to_string(),
      fine_name: FINE_OUTPUT_NAME.to_string(),
    }
  }
}

fn parse_param<T: FromStr>(url: &Url, key: &str) -> Result<Option<T>, YoloV3TinyError> {
  match query_value(url, key) {
    None => Ok(None),
    Some(value) => value
      .parse::<T>()
      .map(Some)
      .map_err(|_| YoloV3TinyError::InvalidParameter {
        key: key.to_string(),
        value,
      }),
  }
}

impl FromUrlWithScheme for YoloV3TinyBuilder {
  const SCHEME: &'static str = "yolov3tiny";
}

impl FromUrl for YoloV3TinyBuilder {
  type Error = YoloV3TinyError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(YoloV3TinyError::SchemeMismatch(format!(
        "模型路径必须使用 {} 方案, 实际为 {}",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let mut builder = YoloV3TinyBuilder {
      model_path: decoded_path(url),
      labels_path: query_value(url, "labels"),
      ..Default::default()
    };

    if let Some(v) = parse_param(url, "confidence")? {
      builder.config.confidence_threshold = v;
    }
    if let Some(v) = parse_param(url, "iou")? {
      builder.config.iou_threshold = v;
    }
    if let Some(v) = parse_param(url, "resolution")? {
      builder.config.input_resolution = v;
    }
    if let Some(v) = parse_param(url, "overlap")? {
      builder.config.overlap = v;
    }
    if let Some(v) = parse_param(url, "suppression")? {
      builder.config.suppression = v;
    }
    if let Some(name) = query_value(url, "coarse") {
      builder.coarse_name = name;
    }
    if let Some(name) = query_value(url, "fine") {
      builder.fine_name = name;
    }

    Ok(builder)
  }
}

impl YoloV3TinyBuilder {
  pub fn model_path(&self) -> &str {
    &self.model_path
  }

  pub fn config(&self) -> &DetectConfig {
    &self.config
  }

  pub fn with_config(mut self, config: DetectConfig) -> Self {
    self.config = config;
    self
  }

  pub fn with_labels_path(mut self, path: impl Into<String>) -> Self {
    self.labels_path = Some(path.into());
    self
  }

  pub fn with_output_names(mut self, coarse: impl Into<String>, fine: impl Into<String>) -> Self {
    self.coarse_name = coarse.into();
    self.fine_name = fine.into();
    self
  }

  fn load_labels(&self) -> Result<LabelTable, DetectError> {
    match &self.labels_path {
      Some(path) => {
        info!("加载类别标签: {}", path);
        LabelTable::from_file(path)
      }
      None => {
        debug!("使用内置 COCO 类别标签");
        Ok(LabelTable::coco())
      }
    }
  }

  /// 使用外部提供的执行器构建模型
  pub fn build_with<E: Executor, const W: u32, const H: u32>(
    self,
    executor: E,
  ) -> Result<YoloV3Tiny<E, W, H>, YoloV3TinyError> {
    let resolution = self.config.input_resolution;
    if W != resolution || H != resolution {
      error!(
        "模型输入尺寸 {}x{} 与配置分辨率 {} 不符",
        W, H, resolution
      );
      return Err(YoloV3TinyError::InputSize {
        width: W,
        height: H,
        resolution,
      });
    }

    let labels = self.load_labels()?;
    let postprocess = Postprocess::new(labels, self.config)?;
    debug!(
      "置信度阈值: {}, IoU 阈值: {}",
      postprocess.config().confidence_threshold,
      postprocess.config().iou_threshold
    );

    Ok(YoloV3Tiny {
      executor,
      postprocess,
      coarse_name: self.coarse_name,
      fine_name: self.fine_name,
    })
  }

  /// 加载 ONNX 模型文件并用 tract 执行
  #[cfg(feature = "backend-tract")]
  pub fn build<const W: u32, const H: u32>(
    self,
  ) -> Result<YoloV3Tiny<crate::model::TractExecutor, W, H>, YoloV3TinyError> {
    let executor = crate::model::TractExecutor::load(
      &self.model_path,
      self.config.input_resolution,
      &[self.coarse_name.as_str(), self.fine_name.as_str()],
    )
    .map_err(YoloV3TinyError::executor)?;
    self.build_with(executor)
  }
}
