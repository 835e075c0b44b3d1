// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::record::WireEventRecord;
use acme_core::EventId;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

struct CountingPublisher {
    calls: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl Publisher for CountingPublisher {
    async fn publish(&self, _record: &WireEventRecord) -> Result<(), PublishError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            Err(PublishError::Transport("simulated".into()))
        } else {
            Ok(())
        }
    }
}

fn sample_record() -> WireEventRecord {
    WireEventRecord {
        uuid: EventId::new(),
        src: "host-1".into(),
        event_type: "heartbeat".into(),
        subject: "endpoint".into(),
        template: None,
        date: 0,
        submit_date: 0,
        data: "e30=".into(),
        sig: None,
        current_page: 1,
        ttl_pages: 1,
    }
}

#[tokio::test]
async fn successful_publish_counts_once() {
    let publisher = CountingPublisher { calls: AtomicUsize::new(0), fail: false };
    publisher.publish(&sample_record()).await.unwrap();
    assert_eq!(publisher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_publish_surfaces_error() {
    let publisher = CountingPublisher { calls: AtomicUsize::new(0), fail: true };
    let err = publisher.publish(&sample_record()).await.unwrap_err();
    assert!(matches!(err, PublishError::Transport(_)));
}
