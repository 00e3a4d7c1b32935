//! Property-based tests for reconciliation counts

use super::*;
use crate::store::{MemoryStore, SessionStore};
use crate::testing::{MockTransport, RecordingObserver, TestRoute};
use proptest::prelude::*;
use std::sync::Arc;

const PLAIN: KeyboardTransition = KeyboardTransition {
    prior: Some(false),
    next: false,
};

fn arb_kind() -> impl Strategy<Value = MessageKind> {
    prop_oneof![Just(MessageKind::Text), Just(MessageKind::Photo)]
}

fn spec(kind: MessageKind, i: usize) -> MessageSpec {
    match kind {
        MessageKind::Text => MessageSpec::text(format!("text {i}")),
        MessageKind::Photo => MessageSpec::photo(format!("file-{i}"), format!("caption {i}")),
    }
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

/// Render `m` texts, then `n` texts; returns (edits, deletes, sends, cache length)
fn rerender_counts(m: usize, n: usize) -> (usize, usize, usize, usize) {
    block_on(async {
        let transport = MockTransport::new();
        let observer = RecordingObserver::new();
        let session: Session<TestRoute> =
            Session::new(Arc::new(MemoryStore::new()) as Arc<dyn SessionStore>, ChatId(1));
        let renderer = Renderer::new(&transport, &observer);

        let first: Vec<_> = (0..m).map(|i| spec(MessageKind::Text, i)).collect();
        renderer
            .render(&session, &first, PLAIN, RenderOptions::default())
            .await
            .unwrap();
        transport.clear_calls();

        let second: Vec<_> = (0..n).map(|i| spec(MessageKind::Text, i + 100)).collect();
        renderer
            .render(&session, &second, PLAIN, RenderOptions::default())
            .await
            .unwrap();

        (
            transport.edit_count(),
            transport.delete_count(),
            transport.send_count(),
            session.rendered().await.unwrap().len(),
        )
    })
}

proptest! {
    #[test]
    fn prop_counts_follow_list_lengths(m in 0usize..8, n in 0usize..8) {
        let (edits, deletes, sends, cached) = rerender_counts(m, n);
        prop_assert_eq!(edits, m.min(n));
        prop_assert_eq!(deletes, m.saturating_sub(n));
        prop_assert_eq!(sends, n.saturating_sub(m));
        prop_assert_eq!(cached, n);
    }

    #[test]
    fn prop_plan_covers_both_lists(
        previous in proptest::collection::vec(arb_kind(), 0..8),
        desired in proptest::collection::vec(arb_kind(), 0..8),
        resend in any::<bool>(),
    ) {
        let shown: Vec<RenderedMessage> = previous
            .iter()
            .zip(1..)
            .map(|(&kind, id)| RenderedMessage { id: MessageId(id), kind })
            .collect();
        let plan = RenderPlan::build(&shown, &desired, resend);

        // Every previous message is either edited or deleted
        prop_assert_eq!(plan.edits.len() + plan.deletes.len(), previous.len());
        // Every desired message is either an edit target or sent
        prop_assert_eq!(plan.edits.len() + plan.sends.len(), desired.len());
        for &(id, index) in &plan.edits {
            let prev = shown.iter().find(|p| p.id == id).unwrap();
            prop_assert_eq!(prev.kind, desired[index]);
        }
        if resend {
            prop_assert!(plan.edits.is_empty());
        }
    }
}
