//! 에러 타입 -- 도메인별 에러 정의

/// vigil 최상위 에러 타입
///
/// 각 크레이트의 도메인 에러는 `From` 구현을 통해 이 타입으로 변환되어
/// 상위 레이어에서 `?` 연산자로 전파됩니다.
#[derive(Debug, thiserror::Error)]
pub enum VigilError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 카탈로그 관련 에러
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// 원격 셸 채널 에러
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// 브라우저 UI 탐색 에러
    #[error("ui error: {0}")]
    Ui(#[from] UiError),

    /// 오케스트레이션 정책 에러
    #[error("orchestration error: {0}")]
    Orchestration(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 카탈로그 관련 에러
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// 등록되지 않은 컴포넌트 ID
    #[error("unknown component: {0}")]
    UnknownComponent(String),

    /// 카탈로그 원본 파싱 실패
    #[error("failed to parse catalog: {reason}")]
    ParseFailed { reason: String },

    /// 중복된 컴포넌트 ID
    #[error("duplicate component id: {0}")]
    DuplicateId(String),

    /// 유효하지 않은 디스크립터
    #[error("invalid descriptor '{id}': {reason}")]
    InvalidDescriptor { id: String, reason: String },

    /// 롤백 불가 컴포넌트가 하나도 없음
    #[error("catalog must contain at least one component that cannot be rolled back")]
    NoIrreversibleComponent,
}

/// 원격 셸 채널 에러 (상위 레이어 요약용)
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// 인증 실패
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// 연결 실패
    #[error("connection failed: {0}")]
    Connection(String),

    /// 명령 실행 시간 초과
    #[error("command timed out: {0}")]
    CommandTimeout(String),

    /// 명령 실행 실패
    #[error("remote execution failed: {0}")]
    Execution(String),
}

/// 브라우저 UI 에러 (상위 레이어 요약용)
#[derive(Debug, thiserror::Error)]
pub enum UiError {
    /// 로그인 실패
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// 대기 시간 초과
    #[error("navigation timed out: {0}")]
    NavigationTimeout(String),

    /// 요소를 찾을 수 없음
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// 브라우저 드라이버 에러
    #[error("driver error: {0}")]
    Driver(String),
}
