//! 브로드캐스트 알림 채널
//!
//! 전송 계층(네트워크 브로드캐스터 등)은 `subscribe()`로 이벤트를 받아갑니다.

use tokio::sync::broadcast;

use crate::messages::CombatEvent;
use crate::traits::UpdateNotifier;
use shared::tool::error::AppError;

#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<CombatEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CombatEvent> {
        self.sender.subscribe()
    }
}

impl UpdateNotifier for BroadcastNotifier {
    fn publish(&self, event: CombatEvent) -> Result<(), AppError> {
        self.sender
            .send(event)
            .map(|_| ())
            .map_err(|e| AppError::Notification(format!("no subscriber for {:?}", e.0)))
    }
}
