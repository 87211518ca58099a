//! Property tests over random create/dispose/drop sequences.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use rtc_bridge::{Call, ContextOptions, LoopbackEngine, Resource, Session, SessionId};

#[derive(Debug, Clone)]
enum Step {
    CreateStream,
    CreateRenderer,
    CreateSource,
    Dispose(usize),
    Drop(usize),
    Use(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::CreateStream),
        Just(Step::CreateRenderer),
        Just(Step::CreateSource),
        any::<usize>().prop_map(Step::Dispose),
        any::<usize>().prop_map(Step::Drop),
        any::<usize>().prop_map(Step::Use),
    ]
}

fn run(steps: &[Step], recycle: bool, drop_session: bool) -> Result<(), TestCaseError> {
    let engine = if recycle {
        LoopbackEngine::new().with_handle_recycling()
    } else {
        LoopbackEngine::new()
    };
    let engine = Arc::new(engine);
    let session = Session::create(engine.clone(), &ContextOptions::software(1)).unwrap();
    let mut held: Vec<Resource> = Vec::new();

    for step in steps {
        match step {
            Step::CreateStream => {
                let stream = session.create_media_stream("s");
                prop_assert!(stream.is_ok(), "{:?}", stream.as_ref().err());
                held.push(stream.unwrap().resource().clone());
            }
            Step::CreateRenderer => {
                let renderer = session.create_video_renderer();
                prop_assert!(renderer.is_ok(), "{:?}", renderer.as_ref().err());
                held.push(renderer.unwrap().resource().clone());
            }
            Step::CreateSource => {
                let source = session.create_video_track_source();
                prop_assert!(source.is_ok(), "{:?}", source.as_ref().err());
                held.push(source.unwrap().resource().clone());
            }
            Step::Dispose(i) if !held.is_empty() => {
                let i = i % held.len();
                held[i].dispose();
                prop_assert!(held[i].is_disposed());
            }
            Step::Drop(i) if !held.is_empty() => {
                let i = i % held.len();
                held.swap_remove(i);
            }
            Step::Use(i) if !held.is_empty() => {
                let i = i % held.len();
                let resolved = session.resolve(held[i].native_handle());
                prop_assert_eq!(resolved.is_some(), !held[i].is_disposed());
            }
            _ => {}
        }
    }

    if drop_session {
        drop(session);
    } else {
        session.dispose();
    }

    for resource in &held {
        prop_assert!(resource.is_disposed());
    }

    let journal = engine.journal();
    let destroy_at = journal
        .iter()
        .position(|c| *c == Call::DestroyContext(SessionId(1)));
    prop_assert_eq!(destroy_at, Some(journal.len() - 1), "destroy must be the last call");

    // Every allocation is released exactly once, before the destroy
    let mut outstanding = HashSet::new();
    for call in &journal {
        match call {
            Call::Allocate(_, handle) => prop_assert!(outstanding.insert(*handle)),
            Call::Release(_, handle) => prop_assert!(outstanding.remove(handle)),
            _ => {}
        }
    }
    prop_assert!(outstanding.is_empty());
    prop_assert!(engine.violations().is_empty(), "{:?}", engine.violations());
    Ok(())
}

proptest! {
    #[test]
    fn prop_every_handle_released_once(
        steps in prop::collection::vec(step(), 0..40),
        recycle in any::<bool>(),
        drop_session in any::<bool>(),
    ) {
        common::init_tracing();
        run(&steps, recycle, drop_session)?;
    }
}
