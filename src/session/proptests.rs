//! Property-based tests for the state stack
//!
//! Any sequence of pushes and pops keeps `current`/`previous` aligned with
//! the tail of a plain vector model.

use super::*;
use crate::store::MemoryStore;
use crate::testing::TestRoute;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Push(TestRoute),
    PushEmpty,
    Pop,
}

fn arb_route() -> impl Strategy<Value = TestRoute> {
    prop_oneof![
        Just(TestRoute::Menu),
        Just(TestRoute::Catalog),
        Just(TestRoute::Item),
        Just(TestRoute::Search),
        Just(TestRoute::Settings),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => arb_route().prop_map(Op::Push),
        1 => Just(Op::PushEmpty),
        2 => Just(Op::Pop),
    ]
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
        .block_on(future)
}

proptest! {
    #[test]
    fn prop_current_and_previous_track_tail(ops in proptest::collection::vec(arb_op(), 0..40)) {
        let (model, current, previous, pair) = block_on(async {
            let session: Session<TestRoute> =
                Session::new(Arc::new(MemoryStore::new()), ChatId(1));
            let mut model: Vec<StackEntry<TestRoute>> = Vec::new();
            for op in ops {
                match op {
                    Op::Push(route) => {
                        session.push(route).await.unwrap();
                        if model.last() != Some(&StackEntry::Route(route)) {
                            model.push(StackEntry::Route(route));
                        }
                    }
                    Op::PushEmpty => {
                        session.push_empty().await.unwrap();
                        if model.last() != Some(&StackEntry::Empty) {
                            model.push(StackEntry::Empty);
                        }
                    }
                    Op::Pop => {
                        session.pop().await.unwrap();
                        model.pop();
                    }
                }
            }
            let current = session.current().await.unwrap();
            let previous = session.previous().await.unwrap();
            let pair = session.previous_and_current().await.unwrap();
            (model, current, previous, pair)
        });

        prop_assert_eq!(current, model.last().copied());
        let expected_previous = if model.len() >= 2 { Some(model[model.len() - 2]) } else { None };
        prop_assert_eq!(previous, expected_previous);
        prop_assert_eq!(pair, (expected_previous, model.last().copied()));
    }

    #[test]
    fn prop_no_adjacent_duplicates(routes in proptest::collection::vec(arb_route(), 0..30)) {
        let states = block_on(async {
            let session: Session<TestRoute> =
                Session::new(Arc::new(MemoryStore::new()), ChatId(1));
            for route in routes {
                session.push(route).await.unwrap();
            }
            session.states().await.unwrap()
        });
        prop_assert!(states.windows(2).all(|w| w[0] != w[1]));
    }
}
