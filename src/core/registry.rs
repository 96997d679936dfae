/**
* filename : registry
* author : HAMA
* date: 2025. 5. 13.
* description:
**/

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::models::order::OrderId;

/// 전략별 주문 저장소
///
/// 맵 잠금은 등록/조회/제거에만 사용하고, 개별 주문 변경은
/// 주문 자체의 뮤텍스로 보호한다. 단일 주문 변경을 위해
/// 저장소 전체의 배타 잠금을 잡는 일은 없다.
pub struct OrderRegistry<T> {
  orders: RwLock<HashMap<OrderId, Arc<Mutex<T>>>>,
}

impl<T: Send> OrderRegistry<T> {
  pub fn new() -> Self {
    OrderRegistry {
      orders: RwLock::new(HashMap::new()),
    }
  }

  /// 주문 등록
  pub async fn insert(&self, order_id: OrderId, order: T) -> Arc<Mutex<T>> {
    let entry = Arc::new(Mutex::new(order));
    self.orders.write().await.insert(order_id, entry.clone());
    entry
  }

  /// 주문 조회
  pub async fn get(&self, order_id: &OrderId) -> Option<Arc<Mutex<T>>> {
    self.orders.read().await.get(order_id).cloned()
  }

  /// 주문 제거 (종결 상태 주문 폐기는 호출자 주도)
  pub async fn remove(&self, order_id: &OrderId) -> Option<Arc<Mutex<T>>> {
    self.orders.write().await.remove(order_id)
  }

  pub async fn contains(&self, order_id: &OrderId) -> bool {
    self.orders.read().await.contains_key(order_id)
  }

  pub async fn ids(&self) -> Vec<OrderId> {
    self.orders.read().await.keys().cloned().collect()
  }

  pub async fn len(&self) -> usize {
    self.orders.read().await.len()
  }

  pub async fn is_empty(&self) -> bool {
    self.orders.read().await.is_empty()
  }
}

impl<T: Send> Default for OrderRegistry<T> {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_registry_insert_get_remove() {
    let registry: OrderRegistry<u32> = OrderRegistry::new();
    let id = OrderId("order-1".to_string());

    registry.insert(id.clone(), 42).await;
    assert!(registry.contains(&id).await);
    assert_eq!(registry.len().await, 1);

    let entry = registry.get(&id).await.unwrap();
    assert_eq!(*entry.lock().await, 42);

    registry.remove(&id).await;
    assert!(registry.get(&id).await.is_none());
    assert!(registry.is_empty().await);
  }

  #[tokio::test]
  async fn test_registry_per_order_mutation() {
    let registry: OrderRegistry<u32> = OrderRegistry::new();
    let id = OrderId("order-1".to_string());
    registry.insert(id.clone(), 0).await;

    // 같은 주문에 대한 동시 변경이 모두 반영되는지 확인
    let mut handles = Vec::new();
    for _ in 0..10 {
      let entry = registry.get(&id).await.unwrap();
      handles.push(tokio::spawn(async move {
        let mut value = entry.lock().await;
        *value += 1;
      }));
    }

    for handle in handles {
      handle.await.unwrap();
    }

    let entry = registry.get(&id).await.unwrap();
    assert_eq!(*entry.lock().await, 10);
  }
}
