//! 에러 코드 상수 정의
//!
//! 호스트 UI에서 i18n 처리를 위해 에러 코드를 문자열로 반환합니다.

/// 매핑 테이블에 해당 미러 파일이 없음
pub const ERR_NOT_TRACKED: &str = "ERR_NOT_TRACKED";

/// 파일 시스템 읽기/쓰기/복사/삭제 실패
pub const ERR_IO: &str = "ERR_IO";

/// 매핑 파일 파싱 실패
pub const ERR_MALFORMED_MAPPING: &str = "ERR_MALFORMED_MAPPING";

/// 저장 위치 선택 대화상자 실패
pub const ERR_CHOOSER_FAILED: &str = "ERR_CHOOSER_FAILED";

/// 경로 검증 실패
pub const ERR_INVALID_PATH: &str = "ERR_INVALID_PATH";

/// 설정 파일 오류
pub const ERR_CONFIG: &str = "ERR_CONFIG";

/// Watch 시작 실패
pub const ERR_WATCH_START_FAILED: &str = "ERR_WATCH_START_FAILED";

/// 복사 후 검증 실패
pub const ERR_VERIFICATION_FAILED: &str = "ERR_VERIFICATION_FAILED";
