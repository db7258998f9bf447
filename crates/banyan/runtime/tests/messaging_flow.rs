//! End-to-end messaging flows through the bootstrap facade.

use banyan_messaging::MessagingError;
use banyan_runtime::{Runtime, RuntimeConfig};
use banyan_types::{NewMessage, NewProfile, Role, UserId};

async fn runtime() -> Runtime {
    let _ = tracing_subscriber::fmt::try_init();
    Runtime::bootstrap(RuntimeConfig::default())
        .await
        .expect("memory bootstrap")
}

async fn register(runtime: &Runtime, id: &str, name: &str) -> UserId {
    let user_id = UserId::new(id);
    runtime
        .directory()
        .register_profile(
            &user_id,
            NewProfile {
                email: format!("{id}@campus.edu"),
                name: name.to_string(),
                role: Role::Student,
            },
        )
        .await
        .expect("register user");
    user_id
}

fn draft(receiver: &UserId, subject: &str) -> NewMessage {
    NewMessage {
        receiver_id: receiver.clone(),
        subject: subject.to_string(),
        content: format!("about: {subject}"),
    }
}

#[tokio::test]
async fn send_inbox_and_mark_read_flow() {
    let runtime = runtime().await;
    let grace = register(&runtime, "u-1", "Grace").await;
    let alan = register(&runtime, "u-2", "Alan").await;

    let message = runtime
        .messaging()
        .send(&grace, draft(&alan, "collaboration"))
        .await
        .expect("send");

    let inbox = runtime.messaging().inbox(&alan).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].message.id, message.id);
    assert_eq!(inbox[0].message.subject, "collaboration");
    assert_eq!(inbox[0].sender_name, "Grace");
    assert_eq!(inbox[0].sender_email, "u-1@campus.edu");
    assert!(!inbox[0].message.read);

    let denied = runtime.messaging().mark_read(&grace, &message.id).await;
    assert!(matches!(denied, Err(MessagingError::Unauthorized(_))));

    let first = runtime
        .messaging()
        .mark_read(&alan, &message.id)
        .await
        .unwrap();
    assert!(first.read);
    let second = runtime
        .messaging()
        .mark_read(&alan, &message.id)
        .await
        .unwrap();
    assert!(second.read, "mark_read is idempotent for the receiver");

    let inbox = runtime.messaging().inbox(&alan).await.unwrap();
    assert!(inbox[0].message.read);
}

#[tokio::test]
async fn inbox_and_sent_list_newest_first() {
    let runtime = runtime().await;
    let grace = register(&runtime, "u-1", "Grace").await;
    let alan = register(&runtime, "u-2", "Alan").await;

    for subject in ["first", "second", "third"] {
        runtime
            .messaging()
            .send(&grace, draft(&alan, subject))
            .await
            .expect("send");
    }

    let inbox = runtime.messaging().inbox(&alan).await.unwrap();
    let subjects: Vec<_> = inbox
        .iter()
        .map(|entry| entry.message.subject.as_str())
        .collect();
    assert_eq!(subjects, vec!["third", "second", "first"]);

    let sent = runtime.messaging().sent(&grace).await.unwrap();
    let subjects: Vec<_> = sent.iter().map(|m| m.subject.as_str()).collect();
    assert_eq!(subjects, vec!["third", "second", "first"]);

    assert!(runtime.messaging().sent(&alan).await.unwrap().is_empty());
}

#[tokio::test]
async fn send_to_unknown_receiver_is_rejected() {
    let runtime = runtime().await;
    let grace = register(&runtime, "u-1", "Grace").await;

    let result = runtime
        .messaging()
        .send(&grace, draft(&UserId::new("ghost"), "hello"))
        .await;
    assert!(matches!(result, Err(MessagingError::ReceiverNotFound(_))));
}
