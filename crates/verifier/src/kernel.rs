//! 커널 버전 문법
//!
//! 관리 콘솔과 `uname -r`이 보여주는 RHEL 계열 커널 릴리스 문자열:
//!
//! ```text
//! <major>.<minor>.<patch>-<build>.<rev>.<sub>.el<major>[._]<minor>.x86_64
//! ```
//!
//! 예: `5.14.0-427.24.1.el9_4.x86_64`. `el9.x86_64`처럼 배포판 마이너 버전이
//! 없는 문자열은 거부합니다.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

static KERNEL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"\b(\d+)\.(\d+)\.(\d+)-(\d+)\.(\d+)\.(\d+)\.el(\d+)([._])(\d+)\.x86_64\b").ok()
});

/// 파싱된 커널 릴리스
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KernelVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub build: u32,
    pub rev: u32,
    pub sub: u32,
    /// 배포판 메이저 (`el9`의 9)
    pub el_major: u32,
    /// 배포판 마이너 (`el9_4`의 4)
    pub el_minor: u32,
    /// `_` 또는 `.`
    pub el_separator: char,
}

/// 커널 문자열 파싱 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a kernel release string: '{0}'")]
pub struct KernelParseError(pub String);

impl KernelVersion {
    /// 임의의 텍스트에서 첫 번째 커널 릴리스를 추출합니다.
    pub fn extract(text: &str) -> Option<Self> {
        let caps = KERNEL_RE.as_ref()?.captures(text)?;
        let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        Some(Self {
            major: num(1)?,
            minor: num(2)?,
            patch: num(3)?,
            build: num(4)?,
            rev: num(5)?,
            sub: num(6)?,
            el_major: num(7)?,
            el_separator: caps.get(8)?.as_str().chars().next()?,
            el_minor: num(9)?,
        })
    }
}

impl FromStr for KernelVersion {
    type Err = KernelParseError;

    /// 문자열 전체가 커널 릴리스여야 합니다.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match Self::extract(trimmed) {
            Some(version) if version.to_string() == trimmed => Ok(version),
            _ => Err(KernelParseError(trimmed.to_owned())),
        }
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}-{}.{}.{}.el{}{}{}.x86_64",
            self.major,
            self.minor,
            self.patch,
            self.build,
            self.rev,
            self.sub,
            self.el_major,
            self.el_separator,
            self.el_minor
        )
    }
}
