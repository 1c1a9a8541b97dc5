// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes event emission.
//!
//! Warning events accompany status transitions to Error/Invalid; Normal
//! events accompany successful creates, updates and deletes. Event emission
//! is best-effort: a failure to publish is logged and never fails the
//! reconcile that produced it.

use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource};
use tracing::warn;

/// Controller name stamped into emitted events
const REPORTER: &str = "dnsman";

/// Build the shared event recorder.
#[must_use]
pub fn recorder(client: Client) -> Recorder {
    Recorder::new(
        client,
        Reporter {
            controller: REPORTER.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        },
    )
}

/// Emit a Normal event for an object.
pub async fn emit_normal<K>(recorder: &Recorder, object: &K, reason: &str, note: &str)
where
    K: Resource<DynamicType = ()>,
{
    publish(recorder, object, EventType::Normal, reason, note).await;
}

/// Emit a Warning event for an object.
pub async fn emit_warning<K>(recorder: &Recorder, object: &K, reason: &str, note: &str)
where
    K: Resource<DynamicType = ()>,
{
    publish(recorder, object, EventType::Warning, reason, note).await;
}

async fn publish<K>(recorder: &Recorder, object: &K, type_: EventType, reason: &str, note: &str)
where
    K: Resource<DynamicType = ()>,
{
    let reference = object.object_ref(&());
    let event = Event {
        type_,
        reason: reason.to_string(),
        note: Some(note.to_string()),
        action: reason.to_string(),
        secondary: None,
    };
    if let Err(e) = recorder.publish(&event, &reference).await {
        warn!(reason = reason, error = %e, "failed to publish event");
    }
}
