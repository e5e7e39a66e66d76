//! 출발지 주소 필터
//!
//! 공개 위협 정보 수집기에 보고해도 의미가 없는 사설/루프백 출발지를 걸러냅니다.

use std::net::Ipv4Addr;

/// 출발지 필터
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceFilter {
    /// 사설 대역 제외 여부
    drop_private: bool,
}

impl SourceFilter {
    pub fn new(drop_private: bool) -> Self {
        Self { drop_private }
    }

    /// 출발지가 리포트 대상인지 평가합니다.
    pub fn admits(&self, src: Ipv4Addr) -> bool {
        !(self.drop_private && is_reserved_source(src))
    }

    pub fn drops_private(&self) -> bool {
        self.drop_private
    }
}

/// `127.0.0.1`, `10.0.0.0/8`, `172.16.0.0/12`, `192.168.0.0/16`에 속하는지 확인합니다.
pub fn is_reserved_source(src: Ipv4Addr) -> bool {
    src == Ipv4Addr::LOCALHOST || src.is_private()
}
