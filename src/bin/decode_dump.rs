// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// src/bin/decode_dump.rs - 对转储的网格张量执行后处理
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

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use tiny_yolo::model::{
  DetectConfig, LabelTable, OutputTensor, OverlapFormula, Postprocess, SuppressionPolicy,
  TensorDump,
};

/// 读取两个 JSON 格式的网格张量，输出检测框 JSON
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 粗网格（640 输入时为 20x20）张量
  #[arg(long, value_name = "FILE")]
  pub coarse: PathBuf,
  /// 细网格（640 输入时为 40x40）张量
  #[arg(long, value_name = "FILE")]
  pub fine: PathBuf,
  /// 类别标签文件，每行一个；默认使用 COCO 标签
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,
  #[arg(long, default_value_t = 0.25)]
  pub confidence: f32,
  #[arg(long, default_value_t = 0.45)]
  pub iou: f32,
  #[arg(long, default_value_t = 640)]
  pub resolution: u32,
  /// conventional 或 legacy
  #[arg(long, default_value = "conventional")]
  pub overlap: OverlapFormula,
  /// keep-later 或 highest-score
  #[arg(long, default_value = "keep-later")]
  pub suppression: SuppressionPolicy,
}

fn load_tensor(path: &Path) -> Result<OutputTensor> {
  let text =
    std::fs::read_to_string(path).with_context(|| format!("无法读取 {}", path.display()))?;
  let dump: TensorDump =
    serde_json::from_str(&text).with_context(|| format!("无法解析 {}", path.display()))?;
  info!("读取张量 {}: {:?}", path.display(), dump.shape);
  Ok(OutputTensor::try_from(dump)?)
}

fn main() -> Result<()> {
  // 标准输出留给 JSON 结果
  tracing_subscriber::fmt().with_writer(std::io::stderr).init();

  let args = Args::parse();

  let labels = match &args.labels {
    Some(path) => LabelTable::from_file(path)?,
    None => LabelTable::coco(),
  };
  let config = DetectConfig::default()
    .with_confidence_threshold(args.confidence)
    .with_iou_threshold(args.iou)
    .with_input_resolution(args.resolution)
    .with_overlap(args.overlap)
    .with_suppression(args.suppression);
  let postprocess = Postprocess::new(labels, config)?;

  let coarse = load_tensor(&args.coarse)?;
  let fine = load_tensor(&args.fine)?;

  let boxes = postprocess.detect(&coarse, &fine)?;
  info!("检测到 {} 个物体", boxes.len());
  println!("{}", serde_json::to_string_pretty(&boxes)?);

  Ok(())
}
