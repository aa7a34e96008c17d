// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// src/model/error.rs - 后处理错误定义
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

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("输入无效: {0}")]
  InvalidInput(String),
  #[error("配置无效: {0}")]
  InvalidConfig(String),
  #[error("缺少模型输出: {0}")]
  MissingOutput(String),
  #[error("锚框索引越界: {0}")]
  InvalidAnchor(usize),
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
}
