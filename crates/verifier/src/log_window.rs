//! 업데이트 로그 창 분류기
//!
//! 원격 업데이트 로그의 꼬리를 타임스탬프로 잘라 `[시작, 현재]` 창을 만들고,
//! 창 안의 각 줄을 컴포넌트 기준으로 성공/에러 마커로 분류합니다.
//!
//! # 판정 규칙
//! - 성공 마커가 있고 에러 마커가 하나도 없을 때만 [`LogVerdict::Confirmed`]
//! - 에러 뒤에 성공이 나오면 [`LogVerdict::Inconclusive`] (마지막 마커 우선 규칙 없음)
//! - 한 줄이 성공과 에러 패턴에 모두 맞으면 에러로 봅니다.
//! - 마커는 이 컴포넌트에 귀속된 줄에서만 셉니다. 로그 태그 또는 표시 이름이
//!   단어 단위로 나오거나 `for component: <ID>`가 이 컴포넌트를 가리켜야 합니다.
//!   `Spyware Pattern update complete`는 PTN 성공 패턴에 맞더라도 PTN 줄이
//!   아닙니다.
//!
//! 타임스탬프가 없는 줄은 직전 줄의 타임스탬프를 물려받습니다. 꼬리 전체에
//! 타임스탬프가 하나도 없으면 창을 고정할 수 없으므로 꼬리 전체를 창으로 씁니다.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use vigil_core::catalog::ComponentDescriptor;

/// 모든 로그 줄 앞의 타임스탬프
static TIMESTAMP_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^\s*\[?(\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}:\d{2})").ok()
});

static VERSION_CHANGE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"Version changed from ([\d.]+) to ([\d.]+)").ok());

pub use vigil_core::config::DEFAULT_ERROR_PATTERN;

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// 타임스탬프가 해석된 로그 줄
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogLine {
    /// 줄 자체 또는 상속된 타임스탬프
    pub timestamp: Option<NaiveDateTime>,
    /// 원문
    pub text: String,
}

/// 원문 줄들을 파싱합니다.
pub fn parse_lines<I, S>(raw: I) -> Vec<LogLine>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut last: Option<NaiveDateTime> = None;
    raw.into_iter()
        .filter(|line| !line.as_ref().trim().is_empty())
        .map(|line| {
            let text = line.as_ref().trim_end().to_owned();
            if let Some(ts) = leading_timestamp(&text) {
                last = Some(ts);
            }
            LogLine {
                timestamp: last,
                text,
            }
        })
        .collect()
}

fn leading_timestamp(line: &str) -> Option<NaiveDateTime> {
    let caps = TIMESTAMP_RE.as_ref()?.captures(line)?;
    let raw = caps.get(1)?.as_str();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// 시간 창으로 잘린 로그
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogWindow {
    /// 창 시작 (포함)
    pub start: NaiveDateTime,
    /// 창 끝 (포함)
    pub end: NaiveDateTime,
    /// 타임스탬프로 고정되었는지 여부
    pub anchored: bool,
    /// 창 안의 줄
    pub lines: Vec<LogLine>,
}

impl LogWindow {
    /// `[start, end]`에 속하는 줄만 남깁니다.
    pub fn cut(lines: Vec<LogLine>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        let anchored = lines.iter().any(|l| l.timestamp.is_some());
        let lines = if anchored {
            lines
                .into_iter()
                .filter(|l| l.timestamp.is_some_and(|ts| ts >= start && ts <= end))
                .collect()
        } else {
            lines
        };
        Self {
            start,
            end,
            anchored,
            lines,
        }
    }

    /// 원문 줄 목록
    pub fn texts(&self) -> Vec<String> {
        self.lines.iter().map(|l| l.text.clone()).collect()
    }
}

/// 로그 창 시작 시각과 그 시계
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStart {
    /// 어플라이언스 시각
    Remote(NaiveDateTime),
    /// 어플라이언스 시각을 읽지 못해 대신 쓴 호스트 UTC 시각
    Host(NaiveDateTime),
}

impl WindowStart {
    pub fn at(&self) -> NaiveDateTime {
        match self {
            Self::Remote(at) | Self::Host(at) => *at,
        }
    }

    pub fn is_host(&self) -> bool {
        matches!(self, Self::Host(_))
    }
}

/// 한 줄의 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    /// 컴포넌트 성공 마커
    Success,
    /// 컴포넌트 에러 마커
    Error,
    /// 컴포넌트를 언급하지만 판정에 영향 없음
    Mention,
    /// 다른 컴포넌트 또는 무관한 줄
    Unrelated,
}

/// 창 전체 판정
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum LogVerdict {
    /// 성공 마커 있음, 에러 없음
    Confirmed { success: Vec<String> },
    /// 성공 마커 없음, 에러 없음
    MissingSuccess,
    /// 에러 마커가 있고 그 뒤에 성공이 없음
    ErrorReported { errors: Vec<String> },
    /// 에러 뒤에 성공이 나옴
    Inconclusive {
        first_error: String,
        later_success: String,
    },
}

impl LogVerdict {
    /// 통과 여부
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    /// 짧은 판정 이름
    pub fn label(&self) -> &'static str {
        match self {
            Self::Confirmed { .. } => "confirmed",
            Self::MissingSuccess => "missing_success",
            Self::ErrorReported { .. } => "error_reported",
            Self::Inconclusive { .. } => "inconclusive",
        }
    }

    /// 실패 사유
    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Confirmed { .. } => None,
            Self::MissingSuccess => Some("no success marker in window".to_owned()),
            Self::ErrorReported { errors } => {
                Some(format!("{} error marker(s) in window", errors.len()))
            }
            Self::Inconclusive { .. } => {
                Some("success marker after an error marker; outcome ambiguous".to_owned())
            }
        }
    }
}

/// 로그의 버전 변경 기록
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionChange {
    pub from: String,
    pub to: String,
}

/// 컴포넌트 단위 로그 분류기
#[derive(Debug, Clone)]
pub struct LogClassifier {
    component_id: String,
    /// 로그 태그 또는 표시 이름 (단어 단위)
    attribution: Vec<Regex>,
    component_field: Regex,
    success: Vec<Regex>,
    error: Regex,
}

fn case_insensitive(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// 공백 길이에 관계없이 구절 전체를 단어 단위로 찾는 패턴
fn whole_phrase(phrase: &str) -> String {
    let words: Vec<String> = phrase.split_whitespace().map(regex::escape).collect();
    format!(r"\b{}\b", words.join(r"\s+"))
}

impl LogClassifier {
    /// 디스크립터와 에러 패턴으로 분류기를 만듭니다.
    pub fn for_component(
        descriptor: &ComponentDescriptor,
        error_pattern: &str,
    ) -> Result<Self, regex::Error> {
        let tag = regex::escape(&descriptor.log_tag);

        let mut success = vec![
            case_insensitive(&format!(r"\b{tag}\b.*update.*success"))?,
            case_insensitive(&format!(
                r"update completed successfully for component:\s*{}\b",
                regex::escape(&descriptor.id)
            ))?,
        ];
        for pattern in &descriptor.success_patterns {
            success.push(case_insensitive(pattern)?);
        }

        let mut attribution = vec![case_insensitive(&format!(r"\b{tag}\b"))?];
        if !descriptor.display_name.trim().is_empty() {
            attribution.push(case_insensitive(&whole_phrase(&descriptor.display_name))?);
        }

        Ok(Self {
            component_id: descriptor.id.clone(),
            attribution,
            component_field: Regex::new(r"(?i)for component:\s*(\w+)")?,
            success,
            error: case_insensitive(error_pattern)?,
        })
    }

    /// 이 컴포넌트에 귀속된 줄인지 여부
    fn is_attributed(&self, line: &str) -> bool {
        self.attribution.iter().any(|re| re.is_match(line))
    }

    /// 한 줄을 분류합니다.
    pub fn classify(&self, line: &str) -> Marker {
        let named = self
            .component_field
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str());
        match named {
            Some(id) if !id.eq_ignore_ascii_case(&self.component_id) => return Marker::Unrelated,
            Some(_) => {}
            None if !self.is_attributed(line) => return Marker::Unrelated,
            None => {}
        }

        if self.error.is_match(line) {
            Marker::Error
        } else if self.success.iter().any(|re| re.is_match(line)) {
            Marker::Success
        } else {
            Marker::Mention
        }
    }

    /// 창 전체를 판정합니다.
    pub fn evaluate(&self, window: &LogWindow) -> LogVerdict {
        let mut success = Vec::new();
        let mut errors = Vec::new();
        let mut success_after_error: Option<String> = None;

        for line in &window.lines {
            match self.classify(&line.text) {
                Marker::Success => {
                    if !errors.is_empty() && success_after_error.is_none() {
                        success_after_error = Some(line.text.clone());
                    }
                    success.push(line.text.clone());
                }
                Marker::Error => errors.push(line.text.clone()),
                Marker::Mention | Marker::Unrelated => {}
            }
        }

        match (success.is_empty(), errors.first(), success_after_error) {
            (_, Some(first_error), Some(later_success)) => LogVerdict::Inconclusive {
                first_error: first_error.clone(),
                later_success,
            },
            (_, Some(_), None) => LogVerdict::ErrorReported { errors },
            (true, None, _) => LogVerdict::MissingSuccess,
            (false, None, _) => LogVerdict::Confirmed { success },
        }
    }
}

/// `Version changed from X to Y` 줄을 추출합니다.
pub fn version_changes(window: &LogWindow) -> Vec<VersionChange> {
    let Some(re) = VERSION_CHANGE_RE.as_ref() else {
        return Vec::new();
    };
    window
        .lines
        .iter()
        .filter_map(|line| re.captures(&line.text))
        .filter_map(|caps| {
            Some(VersionChange {
                from: caps.get(1)?.as_str().to_owned(),
                to: caps.get(2)?.as_str().to_owned(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::catalog::ComponentCatalog;

    fn classifier(id: &str) -> LogClassifier {
        let catalog = ComponentCatalog::load_default().unwrap();
        LogClassifier::for_component(catalog.get(id).unwrap(), DEFAULT_ERROR_PATTERN).unwrap()
    }

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn window(raw: &[&str]) -> LogWindow {
        LogWindow::cut(
            parse_lines(raw.iter().copied()),
            ts("2026-03-01 10:00:00"),
            ts("2026-03-01 10:30:00"),
        )
    }

    #[test]
    fn continuation_lines_inherit_timestamp() {
        let lines = parse_lines([
            "2026-03-01 10:00:05 Downloading component: PTN",
            "    at com.trend.Update.run(Update.java:42)",
            "",
            "[2026-03-01T10:00:09] done",
        ]);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].timestamp, Some(ts("2026-03-01 10:00:05")));
        assert_eq!(lines[2].timestamp, Some(ts("2026-03-01 10:00:09")));
    }

    #[test]
    fn window_excludes_lines_outside_range() {
        let w = window(&[
            "2026-03-01 09:59:59 PTN update success (previous run)",
            "2026-03-01 10:10:00 Downloading component: PTN",
            "2026-03-01 10:30:01 PTN update success (future)",
        ]);
        assert!(w.anchored);
        assert_eq!(w.texts(), vec!["2026-03-01 10:10:00 Downloading component: PTN"]);
    }

    #[test]
    fn unanchored_tail_uses_whole_tail() {
        let w = window(&["PTN update success", "other"]);
        assert!(!w.anchored);
        assert_eq!(w.lines.len(), 2);
    }

    #[test]
    fn success_without_error_is_confirmed() {
        let w = window(&[
            "2026-03-01 10:01:00 Update started for component: PTN",
            "2026-03-01 10:02:00 Version changed from 18.500.00 to 18.501.00",
            "2026-03-01 10:03:00 Update completed successfully for component: PTN",
        ]);
        let verdict = classifier("PTN").evaluate(&w);
        assert!(verdict.is_confirmed());
        assert_eq!(
            version_changes(&w),
            vec![VersionChange {
                from: "18.500.00".to_owned(),
                to: "18.501.00".to_owned()
            }]
        );
    }

    #[test]
    fn component_specific_pattern_counts_as_success() {
        let w = window(&["2026-03-01 10:03:00 Virus Pattern update complete"]);
        assert!(classifier("PTN").evaluate(&w).is_confirmed());
    }

    #[test]
    fn missing_success_fails() {
        let w = window(&["2026-03-01 10:01:00 Update started for component: PTN"]);
        assert_eq!(classifier("PTN").evaluate(&w), LogVerdict::MissingSuccess);
    }

    #[test]
    fn success_after_error_is_inconclusive() {
        let w = window(&[
            "2026-03-01 10:01:00 Update failed for component: PTN",
            "2026-03-01 10:05:00 Update completed successfully for component: PTN",
        ]);
        match classifier("PTN").evaluate(&w) {
            LogVerdict::Inconclusive {
                first_error,
                later_success,
            } => {
                assert!(first_error.contains("failed"));
                assert!(later_success.contains("completed successfully"));
            }
            other => panic!("unexpected verdict: {other:?}"),
        }
    }

    #[test]
    fn error_after_success_is_reported() {
        let w = window(&[
            "2026-03-01 10:01:00 PTN update success",
            "2026-03-01 10:02:00 PTN post-install check ERROR",
        ]);
        assert!(matches!(
            classifier("PTN").evaluate(&w),
            LogVerdict::ErrorReported { ref errors } if errors.len() == 1
        ));
    }

    #[test]
    fn other_components_are_ignored() {
        let c = classifier("PTN");
        assert_eq!(c.classify("Update failed for component: ENG"), Marker::Unrelated);
        assert_eq!(c.classify("Spyware update success"), Marker::Unrelated);
        assert_eq!(c.classify("PTNX download started"), Marker::Unrelated);
    }

    #[test]
    fn sibling_pattern_success_is_not_attributed() {
        let ptn = classifier("PTN");
        for line in [
            "2026-03-01 10:03:00 Spyware Pattern update complete",
            "2026-03-01 10:03:00 Bot Pattern update complete",
            "2026-03-01 10:03:00 IntelliTrap Pattern update complete",
        ] {
            assert_eq!(ptn.classify(line), Marker::Unrelated, "{line}");
        }

        let w = window(&["2026-03-01 10:03:00 Spyware Pattern update complete"]);
        assert_eq!(ptn.evaluate(&w), LogVerdict::MissingSuccess);
    }

    #[test]
    fn sibling_engine_success_is_not_attributed() {
        let eng = classifier("ENG");
        let w = window(&["2026-03-01 10:03:00 Advanced Threat Scan Engine update complete"]);
        assert_eq!(
            eng.classify("2026-03-01 10:03:00 Advanced Threat Scan Engine update complete"),
            Marker::Unrelated
        );
        assert_eq!(eng.evaluate(&w), LogVerdict::MissingSuccess);
        assert!(classifier("ATSEENG").evaluate(&w).is_confirmed());
    }

    #[test]
    fn sibling_error_does_not_fail_component() {
        let w = window(&[
            "2026-03-01 10:02:00 Spyware Pattern update completed with error",
            "2026-03-01 10:03:00 Virus Pattern update complete",
        ]);
        let verdict = classifier("PTN").evaluate(&w);
        assert!(verdict.is_confirmed(), "{verdict:?}");
    }

    #[test]
    fn display_name_attribution_tolerates_spacing() {
        let eng = classifier("ENG");
        assert_eq!(eng.classify("Virus  Scan Engine update complete"), Marker::Success);
        assert_eq!(eng.classify("Virus Scan Engine update failed"), Marker::Error);
    }

    #[test]
    fn line_matching_both_is_error() {
        let c = classifier("PTN");
        assert_eq!(c.classify("PTN update success but cleanup failed"), Marker::Error);
    }

    #[test]
    fn log_tag_override_is_used() {
        let c = classifier("ATSEENG");
        assert_eq!(c.classify("ATSE update success"), Marker::Success);
    }
}
