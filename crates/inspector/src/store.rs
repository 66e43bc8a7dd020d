//! 어플라이언스 설정 저장소 (INI 형식) 파서
//!
//! 규칙:
//! - 빈 줄, `#` 또는 `;`로 시작하는 줄은 무시
//! - `[section]` 헤더는 무시 (키 공간은 평평함)
//! - 첫 번째 `=`에서 키와 값을 나누고 양쪽 공백을 제거
//! - `=`가 없는 줄은 무시
//! - 같은 키가 여러 번 나오면 마지막 값이 유효

use std::collections::HashMap;

/// 파싱된 설정 저장소
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigStore {
    values: HashMap<String, String>,
}

impl ConfigStore {
    /// INI 텍스트를 파싱합니다. 형식 오류는 해당 줄만 건너뜁니다.
    pub fn parse(content: &str) -> Self {
        let mut values = HashMap::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                values.insert(key.to_owned(), value.trim().to_owned());
            }
        }
        Self { values }
    }

    /// 키의 값을 조회합니다. 키가 없으면 `None`입니다.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// 키 수
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
