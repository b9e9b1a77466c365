use serde::Serialize;
use tokio::sync::broadcast;

/// Events pushed to room members or individual users. Delivery is
/// best-effort; dropped events never fail the operation that emitted them.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    MemberJoined { user_id: i64 },
    MemberLeft { user_id: i64 },
    RoomClosed,
    RoundStarted { round_id: i64, game_mode: String },
    GuessSubmitted { round_id: i64, user_id: i64 },
    RoundSettled { round_id: i64 },
    PointsReceived { from_user_id: i64, amount: f64 },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    Room(i64),
    User(i64),
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub audience: Audience,
    pub event: GameEvent,
}

#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        return Self { tx };
    }

    pub fn broadcast_to_room(&self, room_id: i64, event: GameEvent) {
        self.publish(Notification {
            audience: Audience::Room(room_id),
            event,
        });
    }

    pub fn notify_user(&self, user_id: i64, event: GameEvent) {
        self.publish(Notification {
            audience: Audience::User(user_id),
            event,
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        return self.tx.subscribe();
    }

    fn publish(&self, notification: Notification) {
        // Err means no subscriber is currently listening; that's fine.
        let _ = self.tx.send(notification);
    }
}
