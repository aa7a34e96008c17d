// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// src/task.rs - 推理任务
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

use std::{
  sync::mpsc::Receiver,
  thread,
  time::{Duration, Instant},
};
use tracing::{info, warn};

use crate::{
  model::{DetectResult, Model},
  output::Render,
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

fn log_detections(index: usize, result: &DetectResult) {
  if result.is_empty() {
    info!("({})未检测到物体", index);
    return;
  }
  info!("({})检测到 {} 个物体", index, result.len());
  for item in result.items.iter() {
    info!(
      "  {} {:.2} @ ({:.1}, {:.1}) {:.1}x{:.1}",
      item.label, item.score, item.x, item.y, item.width, item.height
    );
  }
}

pub struct OneShotTask;

impl<
  F,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = DetectResult, Error = ME>,
  O: Render<F, DetectResult, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let now = Instant::now();
    let result = model.infer(&frame)?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());
    log_detections(0, &result);
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

/// 对同一帧重复推理，统计平均耗时
pub struct RepeatShotTask {
  repeat: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    RepeatShotTask { repeat: 1000 }
  }
}

impl RepeatShotTask {
  pub fn with_repeat(mut self, repeat: usize) -> Self {
    self.repeat = repeat.max(1);
    self
  }
}

impl<
  F,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = DetectResult, Error = ME>,
  O: Render<F, DetectResult, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    // 前两次推理包含预热开销，不计入平均值
    const WARMUP: usize = 2;

    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let mut times = Vec::with_capacity(self.repeat);
    for i in 0..self.repeat {
      let now = Instant::now();
      let result = model.infer(&frame)?;
      let elapsed = now.elapsed();
      info!("({})推理完成，耗时: {:.2?}", i, elapsed);
      output.render_result(&frame, &result)?;
      info!("({})渲染完成，耗时: {:.2?}", i, now.elapsed());
      if i == 0 {
        log_detections(i, &result);
      }
      times.push(elapsed);
    }

    let skip = if times.len() > WARMUP { WARMUP } else { 0 };
    let counted = (times.len() - skip) as u32;
    warn!(
      "平均推理时间: {:.2?}",
      times.iter().skip(skip).sum::<Duration>() / counted
    );

    Ok(())
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }
}

fn interrupt_channel() -> Option<Receiver<()>> {
  let (tx, rx) = std::sync::mpsc::channel();
  let registered = ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    let _ = tx.send(());
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  });

  match registered {
    Ok(()) => Some(rx),
    Err(e) => {
      warn!("无法注册中断处理: {}", e);
      None
    }
  }
}

impl<
  F,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = DetectResult, Error = ME>,
  O: Render<F, DetectResult, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let interrupt = interrupt_channel();

    let mut frame_index = 0;
    let mut now = Instant::now();
    for frame in input {
      frame_index += 1;
      info!("处理第 {} 帧图像", frame_index);
      let result = model.infer(&frame)?;
      let elapsed_a = now.elapsed();
      log_detections(frame_index, &result);
      output.render_result(&frame, &result)?;
      let elapsed_b = now.elapsed();
      now = Instant::now();
      info!("推理完成，耗时: {:.2?} / {:.2?}", elapsed_a, elapsed_b);
      if self.frame_number.is_some_and(|n| frame_index >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if interrupt.as_ref().is_some_and(|rx| rx.try_recv().is_ok()) {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!("任务完成，共处理 {} 帧", frame_index);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::cell::RefCell;

  use thiserror::Error;

  use super::*;
  use crate::model::PixelBox;

  #[derive(Error, Debug)]
  #[error("mock failure")]
  struct MockError;

  /// 帧编号为 0 时失败，否则返回一个检测框
  struct MockModel;

  impl Model for MockModel {
    type Input = u32;
    type Output = DetectResult;
    type Error = MockError;

    fn infer(&self, input: &u32) -> Result<DetectResult, MockError> {
      if *input == 0 {
        return Err(MockError);
      }
      Ok(DetectResult::from(vec![PixelBox {
        x: *input as f32,
        y: 0.0,
        width: 1.0,
        height: 1.0,
        score: 0.5,
        label: "cat".to_string(),
      }]))
    }
  }

  #[derive(Default)]
  struct Collect {
    seen: RefCell<Vec<(u32, usize)>>,
  }

  impl Render<u32, DetectResult> for &Collect {
    type Error = MockError;

    fn render_result(&self, frame: &u32, result: &DetectResult) -> Result<(), MockError> {
      self.seen.borrow_mut().push((*frame, result.len()));
      Ok(())
    }
  }

  #[test]
  fn one_shot_renders_first_frame() {
    let out = Collect::default();
    OneShotTask
      .run_task(vec![3u32, 4].into_iter(), MockModel, &out)
      .unwrap();
    assert_eq!(*out.seen.borrow(), vec![(3, 1)]);
  }

  #[test]
  fn one_shot_without_input_fails() {
    let out = Collect::default();
    assert!(
      OneShotTask
        .run_task(std::iter::empty::<u32>(), MockModel, &out)
        .is_err()
    );
  }

  #[test]
  fn repeat_shot_reuses_the_same_frame() {
    let out = Collect::default();
    RepeatShotTask::default()
      .with_repeat(3)
      .run_task(vec![7u32].into_iter(), MockModel, &out)
      .unwrap();
    assert_eq!(*out.seen.borrow(), vec![(7, 1); 3]);
  }

  #[test]
  fn continuous_stops_at_frame_number_and_propagates_errors() {
    let out = Collect::default();
    ContinuousTask::default()
      .with_frame_number(Some(2))
      .run_task(vec![1u32, 2, 3].into_iter(), MockModel, &out)
      .unwrap();
    assert_eq!(*out.seen.borrow(), vec![(1, 1), (2, 1)]);

    let out = Collect::default();
    let result = ContinuousTask::default().run_task(vec![1u32, 0, 3].into_iter(), MockModel, &out);
    assert!(result.is_err());
    assert_eq!(out.seen.borrow().len(), 1);
  }
}
