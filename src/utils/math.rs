//! 수학 관련 유틸리티
//!
//! 가격/수량 단위 반올림과 가중 평균 가격 계산 제공

/// 가격을 틱 단위로 반올림 (거래소 요구사항에 맞춰)
pub fn round_to_tick(price: f64, tick_size: f64) -> f64 {
  if tick_size <= 0.0 {
    return price;
  }

  (price / tick_size).round() * tick_size
}

/// 수량을 스텝 단위로 올림
pub fn ceil_to_step(quantity: f64, step_size: f64) -> f64 {
  if step_size <= 0.0 {
    return quantity;
  }

  (quantity / step_size).ceil() * step_size
}

/// 가중 평균 가격 계산 (실현 TWAP/VWAP 벤치마크)
pub fn weighted_average_price(prices: &[f64], quantities: &[f64]) -> Option<f64> {
  if prices.len() != quantities.len() || prices.is_empty() {
    return None;
  }

  let total_quantity: f64 = quantities.iter().sum();
  if total_quantity == 0.0 {
    return None;
  }

  let sum_pq: f64 = prices.iter()
    .zip(quantities.iter())
    .map(|(p, q)| p * q)
    .sum();

  Some(sum_pq / total_quantity)
}
