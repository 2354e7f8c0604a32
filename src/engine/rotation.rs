use crate::logging;
use crate::types::TokenInfo;

/// 중간 자산 로테이터
///
/// 링 인덱스를 단조 증가(mod 링 크기)시킨다. 주기 로테이션 태스크와
/// 수동 로테이션이 같은 인스턴스를 대상으로 하고, 접근은 틱과 같은
/// 뮤텍스로 직렬화되어 틱 도중에 B가 바뀌지 않는다.
pub struct TokenRotator {
    ring: Vec<TokenInfo>,
    index: usize,
    rotations: u64,
}

impl TokenRotator {
    pub fn new(ring: Vec<TokenInfo>) -> Self {
        debug_assert!(!ring.is_empty(), "intermediate ring must not be empty");
        Self {
            ring,
            index: 0,
            rotations: 0,
        }
    }

    pub fn current(&self) -> &TokenInfo {
        &self.ring[self.index % self.ring.len()]
    }

    /// 다음 중간 자산으로 전진 - 크기 1 링에서는 관측상 no-op
    pub fn advance(&mut self) -> &TokenInfo {
        self.index = (self.index + 1) % self.ring.len();
        self.rotations += 1;
        let token = &self.ring[self.index];
        logging::rotation(&format!(
            "🔄 중간 자산 로테이션: {} ({}/{})",
            token.symbol,
            self.index + 1,
            self.ring.len()
        ));
        token
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn rotations(&self) -> u64 {
        self.rotations
    }

    pub fn ring_len(&self) -> usize {
        self.ring.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::pubkey::Pubkey;

    fn token(symbol: &str) -> TokenInfo {
        TokenInfo::new(Pubkey::new_unique(), symbol, 6)
    }

    #[test]
    fn test_advance_wraps_around_ring() {
        let mut rotator = TokenRotator::new(vec![token("USDC"), token("USDT"), token("JUP")]);
        assert_eq!(rotator.current().symbol, "USDC");
        assert_eq!(rotator.advance().symbol, "USDT");
        assert_eq!(rotator.advance().symbol, "JUP");
        assert_eq!(rotator.advance().symbol, "USDC");
        assert_eq!(rotator.rotations(), 3);
    }

    #[test]
    fn test_single_element_ring_never_panics() {
        let mut rotator = TokenRotator::new(vec![token("USDC")]);
        for _ in 0..10 {
            assert_eq!(rotator.advance().symbol, "USDC");
        }
        assert_eq!(rotator.index(), 0);
    }
}
