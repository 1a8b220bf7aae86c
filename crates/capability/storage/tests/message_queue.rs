use domain::NodeRecord;
use uuid::Uuid;
use wsm_storage::{
    InMemoryMessageQueue, InMemoryNodeDirectory, MessageQueue, MessageStatus, NodeDirectory,
    OutgoingMessage,
};

fn outgoing(sender: Uuid, receiver: Uuid, message_type: &str) -> OutgoingMessage {
    OutgoingMessage {
        message_id: Uuid::new_v4(),
        message_type: message_type.to_string(),
        payload: "{}".to_string(),
        sender,
        receiver,
        created_at_ms: 1_000,
    }
}

#[tokio::test]
async fn pending_rows_are_redelivered_until_acked() {
    let queue = InMemoryMessageQueue::new();
    let sender = Uuid::new_v4();
    let receiver = Uuid::new_v4();
    queue
        .enqueue(vec![
            outgoing(sender, receiver, "new-alert"),
            outgoing(sender, receiver, "policy-changed"),
            outgoing(sender, Uuid::new_v4(), "new-alert"),
        ])
        .await
        .expect("enqueue");

    let first = queue.poll_pending(receiver, 10).await.expect("poll");
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].message_type, "new-alert");
    assert!(first[0].id < first[1].id);

    queue
        .ack(first[0].id, MessageStatus::Processed, 2_000)
        .await
        .expect("ack");
    let second = queue.poll_pending(receiver, 10).await.expect("poll");
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].message_type, "policy-changed");

    let rows = queue.rows_for(receiver).expect("rows");
    assert_eq!(rows[0].status, MessageStatus::Processed);
    assert_eq!(rows[0].cycled_at_ms, Some(2_000));
}

#[tokio::test]
async fn node_directory_filters_stale_and_deleted() {
    let directory = InMemoryNodeDirectory::new();
    let live = NodeRecord {
        uuid: Uuid::new_v4(),
        name: "node-a".to_string(),
        address: "10.0.0.1:22900".to_string(),
        last_seen_at_ms: 100_000,
        deleted: false,
    };
    let stale = NodeRecord {
        uuid: Uuid::new_v4(),
        name: "node-b".to_string(),
        last_seen_at_ms: 1_000,
        ..live.clone()
    };
    let removed = NodeRecord {
        uuid: Uuid::new_v4(),
        name: "node-c".to_string(),
        ..live.clone()
    };
    for node in [&live, &stale, &removed] {
        directory.touch(node).await.expect("touch");
    }
    assert!(directory.mark_deleted(removed.uuid).await.expect("delete"));

    let nodes = directory
        .list_live_nodes(110_000, 60_000)
        .await
        .expect("list");
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].uuid, live.uuid);
}
