use std::sync::Arc;

use chrono::Utc;
use eatoutBot::clients::sqlite_store::SqliteStore;
use eatoutBot::config::Settings;
use eatoutBot::error::NotifyError;
use eatoutBot::models::eat_out::local_date;
use eatoutBot::models::message::{ANSWER_EATING_OUT, ANSWER_STAYING_IN, Message};
use eatoutBot::runtime::Services;
use eatoutBot::service::notifier::Notifier;
use eatoutBot::service::reminder_service::{EATING_OUT_NOTICE, UNDECIDED_PROMPT};
use eatoutBot::service::status_store::StatusStore;
use tokio::sync::mpsc;

struct ChannelNotifier {
    tx: mpsc::UnboundedSender<(String, Message)>,
}

#[async_trait::async_trait]
impl Notifier for ChannelNotifier {
    async fn reply(&self, _reply_token: &str, _message: &Message) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn push(&self, entity_id: &str, message: &Message) -> Result<(), NotifyError> {
        let _ = self.tx.send((entity_id.to_string(), message.clone()));
        Ok(())
    }
}

fn services() -> (Services, mpsc::UnboundedReceiver<(String, Message)>) {
    let settings = Settings::from_lookup(|_| None).unwrap();
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();
    (
        Services::new(&settings, store, Arc::new(ChannelNotifier { tx })),
        rx,
    )
}

#[tokio::test(start_paused = true)]
async fn undecided_entity_receives_the_confirmation_prompt() {
    let (services, mut pushes) = services();
    let today = services.commands.today();
    services.commands.handle("U1", "リマインド 11:11", today).await;

    let (entity, message) = pushes.recv().await.unwrap();
    assert_eq!(entity, "U1");
    assert_eq!(message, Message::eat_out_prompt(UNDECIDED_PROMPT));
    let json = serde_json::to_string(&message).unwrap();
    assert!(json.contains(ANSWER_STAYING_IN) && json.contains(ANSWER_EATING_OUT));
}

#[tokio::test(start_paused = true)]
async fn decided_entity_receives_a_status_notice() {
    let (services, mut pushes) = services();
    // Every firing resolves against the zone's current day.
    let today = local_date(Utc::now(), &chrono_tz::Asia::Tokyo);
    services.store.set_status("G1", today, true).await.unwrap();
    services.commands.handle("G1", "リマインド 22:22", today).await;

    let (entity, message) = pushes.recv().await.unwrap();
    assert_eq!(entity, "G1");
    assert_eq!(message, Message::text(EATING_OUT_NOTICE));
}

#[tokio::test(start_paused = true)]
async fn entities_fire_independently() {
    let (services, mut pushes) = services();
    let today = services.commands.today();
    services.commands.handle("U1", "リマインド 9:09", today).await;
    services.commands.handle("U2", "リマインド 9:09", today).await;

    let mut entities = vec![
        pushes.recv().await.unwrap().0,
        pushes.recv().await.unwrap().0,
    ];
    entities.sort();
    assert_eq!(entities, vec!["U1".to_string(), "U2".to_string()]);
}
