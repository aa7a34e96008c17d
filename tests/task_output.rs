// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// tests/task_output.rs - 输入、模型与输出串联测试
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

#![cfg(all(feature = "read_image_file", feature = "save_image_file"))]

use image::{Rgb, RgbImage};
use thiserror::Error;
use url::Url;

use tiny_yolo::{
  FromUrl,
  input::InputWrapper,
  model::{
    COARSE_OUTPUT_NAME, DetectConfig, Executor, FINE_OUTPUT_NAME, InputTensor, NamedOutputs,
    OutputTensor, TensorLayout, YoloV3Tiny, YoloV3TinyBuilder,
  },
  output::OutputWrapper,
  task::{OneShotTask, Task},
};

#[derive(Error, Debug)]
#[error("unreachable")]
struct NoError;

/// 在粗网格中心单元放一个 person 框
struct CenterExecutor;

impl Executor for CenterExecutor {
  type Error = NoError;

  fn execute(&self, input: &InputTensor) -> Result<NamedOutputs, Self::Error> {
    assert_eq!(input.shape, [1, 3, 64, 64]);
    let channels = 3 * 85;
    let mut coarse = vec![0.0; 2 * 2 * channels];
    let base = (2 + 1) * channels;
    coarse[base + 4] = 0.9;
    coarse[base + 5] = 0.9;

    let mut outputs = NamedOutputs::new();
    outputs.insert(
      COARSE_OUTPUT_NAME,
      OutputTensor::new(coarse, [1, 2, 2, channels], TensorLayout::Nhwc).unwrap(),
    );
    outputs.insert(
      FINE_OUTPUT_NAME,
      OutputTensor::new(vec![0.0; 4 * 4 * channels], [1, 4, 4, channels], TensorLayout::Nhwc)
        .unwrap(),
    );
    Ok(outputs)
  }
}

fn with_scheme(path: &std::path::Path, scheme: &str) -> Url {
  let url = Url::from_file_path(path).unwrap();
  Url::parse(&url.as_str().replacen("file:", &format!("{scheme}:"), 1)).unwrap()
}

#[test]
fn one_shot_draws_detection_into_output_image() {
  let dir = tempfile::tempdir().unwrap();
  let input_path = dir.path().join("input.png");
  let output_path = dir.path().join("out").join("result.png");
  RgbImage::from_pixel(64, 64, Rgb([255, 255, 255]))
    .save(&input_path)
    .unwrap();

  let input = InputWrapper::<64, 64>::from_url(&with_scheme(&input_path, "image")).unwrap();
  let model: YoloV3Tiny<_, 64, 64> = YoloV3TinyBuilder::default()
    .with_config(DetectConfig::default().with_input_resolution(64))
    .build_with(CenterExecutor)
    .unwrap();
  let output = OutputWrapper::<64, 64>::from_url(&with_scheme(&output_path, "image")).unwrap();

  OneShotTask.run_task(input, model, output).unwrap();

  // 框中心 (16.5, 16.5)，尺寸 81x82，超出画面的边被裁到图像边界
  let saved = image::open(&output_path).unwrap().to_rgb8();
  assert_eq!(saved.dimensions(), (64, 64));
  assert_ne!(*saved.get_pixel(63, 63), Rgb([255, 255, 255]));
  assert_eq!(*saved.get_pixel(40, 40), Rgb([255, 255, 255]));
}
