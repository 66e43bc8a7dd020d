//! 컴포넌트 카탈로그 -- 업데이트 가능한 단위의 정적 레지스트리
//!
//! 카탈로그는 시작 시 한 번 로드되고 이후 변경되지 않습니다.
//! 컴포넌트 메타데이터는 항상 [`ComponentCatalog::get`]으로 ID를 통해 조회합니다.
//!
//! 카테고리별 동작(기본 타임아웃, 서비스 재시작 여부)은 [`Category`]의
//! 디스패치 테이블에서 결정되고, 카탈로그 원본은 데이터만 담습니다.
//!
//! # 원본 형식
//! ```toml
//! [[component]]
//! id = "PTN"
//! display_name = "Virus Pattern"
//! category = "pattern"
//! version_store_key = "PTNVersion"
//! version_timestamp_key = "PTNUpdateTime"
//! lock_file = "/var/iwss/updates/locks/ptn.lock"
//! priority = "P0"
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::CatalogSourceConfig;
use crate::error::{CatalogError, VigilError};
use crate::types::UpdateMode;

/// 바이너리에 포함된 기본 카탈로그
const DEFAULT_CATALOG: &str = include_str!("../catalog.toml");

/// 기본 의존 서비스 이름
const DEFAULT_SERVICE: &str = "iwss";

/// 컴포넌트 카테고리
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// 바이러스/스파이웨어 등 패턴 파일
    Pattern,
    /// 스캔 엔진 바이너리
    Engine,
}

impl Category {
    /// 카테고리 기본 업데이트 타임아웃 (초)
    pub fn default_update_timeout_secs(self) -> u64 {
        match self {
            Self::Pattern => 300,
            Self::Engine => 600,
        }
    }

    /// 카테고리 기본 롤백 타임아웃 (초)
    pub fn default_rollback_timeout_secs(self) -> u64 {
        match self {
            Self::Pattern => 180,
            Self::Engine => 300,
        }
    }

    /// 업데이트 후 의존 서비스가 재시작되어야 하는지 여부
    pub fn requires_service_restart(self) -> bool {
        match self {
            Self::Pattern => false,
            Self::Engine => true,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pattern => write!(f, "pattern"),
            Self::Engine => write!(f, "engine"),
        }
    }
}

/// 테스트 우선순위 (실행 동작에는 영향 없음)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    P0,
    P1,
    P2,
    P3,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// 컴포넌트 디스크립터 (불변)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentDescriptor {
    /// 고유 ID (`PTN`, `ENG` 등)
    pub id: String,
    /// 표시 이름
    pub display_name: String,
    /// 카테고리
    pub category: Category,
    /// 설정 저장소의 버전 키
    pub version_store_key: String,
    /// 설정 저장소의 갱신 시각 키
    pub version_timestamp_key: String,
    /// 업데이트 진행 중 존재하는 락 파일 경로
    pub lock_file: String,
    /// 의존 서비스 이름
    pub service: String,
    /// 업데이트 로그에서 이 컴포넌트를 식별하는 태그
    pub log_tag: String,
    /// 업데이트 페이지 행 라벨
    pub ui_label: String,
    /// 컴포넌트 전용 성공 로그 정규식
    pub success_patterns: Vec<String>,
    /// 롤백 지원 여부
    pub can_rollback: bool,
    /// 업데이트 후 서비스 재시작 필요 여부
    pub requires_service_restart: bool,
    /// 업데이트 타임아웃 (초)
    pub update_timeout_secs: u64,
    /// 롤백 타임아웃 (초, 롤백 미지원이면 0)
    pub rollback_timeout_secs: u64,
    /// 우선순위
    pub priority: Priority,
}

impl ComponentDescriptor {
    /// 모드에 해당하는 완료 대기 타임아웃 (초)
    pub fn timeout_for(&self, mode: UpdateMode) -> u64 {
        match mode {
            UpdateMode::Normal | UpdateMode::Forced => self.update_timeout_secs,
            UpdateMode::Rollback => self.rollback_timeout_secs,
        }
    }
}

/// 카탈로그 원본 항목 (선택 필드는 카테고리 기본값으로 채움)
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEntry {
    id: String,
    display_name: String,
    category: Category,
    version_store_key: String,
    version_timestamp_key: String,
    lock_file: String,
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    log_tag: Option<String>,
    #[serde(default)]
    ui_label: Option<String>,
    #[serde(default)]
    success_patterns: Vec<String>,
    #[serde(default = "default_can_rollback")]
    can_rollback: bool,
    #[serde(default)]
    requires_service_restart: Option<bool>,
    #[serde(default)]
    update_timeout_secs: Option<u64>,
    #[serde(default)]
    rollback_timeout_secs: Option<u64>,
    priority: Priority,
}

fn default_can_rollback() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCatalog {
    #[serde(default)]
    component: Vec<RawEntry>,
}

impl RawEntry {
    fn resolve(self) -> Result<ComponentDescriptor, CatalogError> {
        let id = self.id.trim().to_owned();
        let invalid = |reason: &str| CatalogError::InvalidDescriptor {
            id: id.clone(),
            reason: reason.to_owned(),
        };

        if id.is_empty() {
            return Err(invalid("id must not be empty"));
        }
        if self.version_store_key.is_empty() {
            return Err(invalid("version_store_key must not be empty"));
        }
        if !self.lock_file.starts_with('/') {
            return Err(invalid("lock_file must be an absolute path"));
        }

        let update_timeout_secs = self
            .update_timeout_secs
            .unwrap_or_else(|| self.category.default_update_timeout_secs());
        if update_timeout_secs == 0 {
            return Err(invalid("update_timeout_secs must be greater than 0"));
        }

        let rollback_timeout_secs = if self.can_rollback {
            let secs = self
                .rollback_timeout_secs
                .unwrap_or_else(|| self.category.default_rollback_timeout_secs());
            if secs == 0 {
                return Err(invalid(
                    "rollback_timeout_secs must be greater than 0 when rollback is supported",
                ));
            }
            secs
        } else {
            0
        };

        for pattern in &self.success_patterns {
            regex::Regex::new(pattern)
                .map_err(|e| invalid(&format!("invalid success pattern '{pattern}': {e}")))?;
        }

        Ok(ComponentDescriptor {
            log_tag: self.log_tag.unwrap_or_else(|| id.clone()),
            ui_label: self.ui_label.unwrap_or_else(|| self.display_name.clone()),
            service: self.service.unwrap_or_else(|| DEFAULT_SERVICE.to_owned()),
            requires_service_restart: self
                .requires_service_restart
                .unwrap_or_else(|| self.category.requires_service_restart()),
            id,
            display_name: self.display_name,
            category: self.category,
            version_store_key: self.version_store_key,
            version_timestamp_key: self.version_timestamp_key,
            lock_file: self.lock_file,
            success_patterns: self.success_patterns,
            can_rollback: self.can_rollback,
            update_timeout_secs,
            rollback_timeout_secs,
            priority: self.priority,
        })
    }
}

/// 컴포넌트 카탈로그
///
/// 순서는 원본의 나열 순서를 유지합니다 (패턴 → 엔진).
#[derive(Debug, Clone)]
pub struct ComponentCatalog {
    entries: Vec<ComponentDescriptor>,
    index: HashMap<String, usize>,
}

impl ComponentCatalog {
    /// 내장 기본 카탈로그를 로드합니다.
    pub fn load_default() -> Result<Self, CatalogError> {
        Self::parse(DEFAULT_CATALOG)
    }

    /// 설정에 따라 외부 파일 또는 내장 카탈로그를 로드합니다.
    pub async fn load(source: &CatalogSourceConfig) -> Result<Self, VigilError> {
        match &source.path {
            Some(path) => Self::from_file(path).await,
            None => Ok(Self::load_default()?),
        }
    }

    /// TOML 파일에서 카탈로그를 로드합니다.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, VigilError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let catalog = Self::parse(&content)?;
        info!(
            path = %path.display(),
            components = catalog.len(),
            "component catalog loaded from file"
        );
        Ok(catalog)
    }

    /// TOML 문자열에서 카탈로그를 파싱하고 검증합니다.
    pub fn parse(toml_str: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalog = toml::from_str(toml_str).map_err(|e| CatalogError::ParseFailed {
            reason: e.to_string(),
        })?;

        let mut entries = Vec::with_capacity(raw.component.len());
        let mut index = HashMap::with_capacity(raw.component.len());

        for raw_entry in raw.component {
            let descriptor = raw_entry.resolve()?;
            if index.contains_key(&descriptor.id) {
                return Err(CatalogError::DuplicateId(descriptor.id));
            }
            index.insert(descriptor.id.clone(), entries.len());
            entries.push(descriptor);
        }

        if !entries.iter().any(|d| !d.can_rollback) {
            return Err(CatalogError::NoIrreversibleComponent);
        }

        debug!(components = entries.len(), "component catalog parsed");
        Ok(Self { entries, index })
    }

    /// ID로 디스크립터를 조회합니다.
    pub fn get(&self, id: &str) -> Result<&ComponentDescriptor, CatalogError> {
        self.index
            .get(id)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| CatalogError::UnknownComponent(id.to_owned()))
    }

    /// 등록된 ID인지 여부
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// 모든 디스크립터 (나열 순서)
    pub fn all(&self) -> &[ComponentDescriptor] {
        &self.entries
    }

    /// 우선순위가 일치하는 디스크립터
    pub fn by_priority(&self, priority: Priority) -> Vec<&ComponentDescriptor> {
        self.entries
            .iter()
            .filter(|d| d.priority == priority)
            .collect()
    }

    /// 롤백을 지원하는 디스크립터
    pub fn rollback_eligible(&self) -> Vec<&ComponentDescriptor> {
        self.entries.iter().filter(|d| d.can_rollback).collect()
    }

    /// 컴포넌트 수
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 비어 있는지 여부 (검증을 통과한 카탈로그는 항상 false)
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
