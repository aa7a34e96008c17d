// 该文件是 Tiny YOLO （微型目标检测） 项目的一部分。
// src/lib.rs - 库主文件
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

pub mod frame;
pub mod input;
pub mod model;
pub mod output;
pub mod task;

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

/// 解码 URL 路径中的百分号转义（例如空格 `%20`）
pub fn decoded_path(url: &url::Url) -> String {
  match urlencoding::decode(url.path()) {
    Ok(path) => path.into_owned(),
    Err(_) => url.path().to_string(),
  }
}

/// 查找 URL 查询参数
pub fn query_value(url: &url::Url, key: &str) -> Option<String> {
  url
    .query_pairs()
    .find(|(k, _)| k == key)
    .map(|(_, v)| v.into_owned())
}

#[cfg(test)]
mod tests {
  use super::*;
  use url::Url;

  #[test]
  fn decodes_percent_escaped_paths() {
    let url = Url::parse("image:///tmp/my%20photo.png").unwrap();
    assert_eq!(decoded_path(&url), "/tmp/my photo.png");
  }

  #[test]
  fn finds_query_values() {
    let url = Url::parse("yolov3tiny:///m.onnx?confidence=0.3&labels=/a.txt").unwrap();
    assert_eq!(query_value(&url, "confidence").as_deref(), Some("0.3"));
    assert_eq!(query_value(&url, "labels").as_deref(), Some("/a.txt"));
    assert_eq!(query_value(&url, "iou"), None);
  }
}
