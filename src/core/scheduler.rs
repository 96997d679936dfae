/**
* filename : scheduler
* author : HAMA
* date: 2025. 5. 13.
* description:
**/

use std::collections::HashMap;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use futures::future::BoxFuture;

use crate::models::order::OrderId;

/// 슬라이스 실행 스케줄러
///
/// 슬라이스마다 태스크 하나를 생성해 지연 후 콜백을 실행한다.
/// 취소는 협조적이다: 미발화 태스크는 중단하고, 이미 발화한
/// 콜백은 주문 상태를 재확인한 뒤 스스로 무효화해야 한다.
pub struct SliceScheduler {
  tasks: Mutex<HashMap<OrderId, Vec<JoinHandle<()>>>>,
}

impl SliceScheduler {
  pub fn new() -> Self {
    SliceScheduler {
      tasks: Mutex::new(HashMap::new()),
    }
  }

  /// 지연 후 실행할 슬라이스 콜백 등록
  pub async fn schedule(&self, order_id: &OrderId, delay: Duration, callback: BoxFuture<'static, ()>) {
    let handle = tokio::spawn(async move {
      tokio::time::sleep(delay).await;
      callback.await;
    });

    self.tasks
      .lock()
      .await
      .entry(order_id.clone())
      .or_default()
      .push(handle);
  }

  /// 주문의 미발화 슬라이스 태스크 전부 중단
  pub async fn cancel_order(&self, order_id: &OrderId) {
    if let Some(handles) = self.tasks.lock().await.remove(order_id) {
      for handle in handles {
        handle.abort();
      }
    }
  }

  /// 아직 종료되지 않은 태스크 수
  pub async fn pending_count(&self, order_id: &OrderId) -> usize {
    self.tasks
      .lock()
      .await
      .get(order_id)
      .map(|handles| handles.iter().filter(|h| !h.is_finished()).count())
      .unwrap_or(0)
  }
}

impl Default for SliceScheduler {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  #[tokio::test(start_paused = true)]
  async fn test_scheduler_fires_in_delay_order() {
    let scheduler = SliceScheduler::new();
    let order_id = OrderId("order-1".to_string());
    let fired = Arc::new(AtomicUsize::new(0));

    for i in 0..3u64 {
      let fired = fired.clone();
      scheduler
        .schedule(&order_id, Duration::from_secs(i), Box::pin(async move {
          fired.fetch_add(1, Ordering::SeqCst);
        }))
        .await;
    }

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 3);
    assert_eq!(scheduler.pending_count(&order_id).await, 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_scheduler_cancel_aborts_unfired() {
    let scheduler = SliceScheduler::new();
    let order_id = OrderId("order-1".to_string());
    let fired = Arc::new(AtomicUsize::new(0));

    for i in 1..4u64 {
      let fired = fired.clone();
      scheduler
        .schedule(&order_id, Duration::from_secs(i * 10), Box::pin(async move {
          fired.fetch_add(1, Ordering::SeqCst);
        }))
        .await;
    }

    scheduler.cancel_order(&order_id).await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(fired.load(Ordering::SeqCst), 0);
    assert_eq!(scheduler.pending_count(&order_id).await, 0);
  }
}
