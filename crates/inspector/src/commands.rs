//! 원격 명령 문자열 생성
//!
//! 모든 경로와 인자는 [`shell_quote`]로 감싸서 원격 셸 해석을 막습니다.

/// 원격 시각 출력 형식 (`date` 와 로그 타임스탬프가 같은 형식을 씀)
pub const REMOTE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// POSIX 셸 작은따옴표 인용
pub fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

pub fn cat(path: &str) -> String {
    format!("cat -- {}", shell_quote(path))
}

pub fn exists(path: &str) -> String {
    format!("test -e {}", shell_quote(path))
}

pub fn remove(path: &str) -> String {
    format!("rm -f -- {}", shell_quote(path))
}

pub fn tail(path: &str, lines: usize) -> String {
    format!("tail -n {lines} -- {}", shell_quote(path))
}

pub fn service_active(service: &str) -> String {
    format!("systemctl is-active {}", shell_quote(service))
}

pub fn now() -> String {
    format!("date '+{REMOTE_TIME_FORMAT}'")
}

pub const KERNEL_RELEASE: &str = "uname -r";
pub const OS_RELEASE: &str = "cat /etc/redhat-release";
pub const HOSTNAME: &str = "hostname";
pub const UPTIME: &str = "uptime -p";
