// tests/property/controller_election_test.rs

//! ∀ registries: at most one Controller has role MASTER, across arbitrary
//! connect/disconnect sequences (§8).

use nebula_scheduler::core::registry::{ControllerRegistry, ControllerRole, GateResult};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Event {
    Connect(u8),
    Disconnect(u8),
}

fn events() -> impl Strategy<Value = Vec<Event>> {
    prop::collection::vec(
        (any::<bool>(), 0u8..5).prop_map(|(connect, id)| {
            if connect {
                Event::Connect(id)
            } else {
                Event::Disconnect(id)
            }
        }),
        0..200,
    )
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 200, ..ProptestConfig::default() })]

    #[test]
    fn at_most_one_master(events in events()) {
        let registry = ControllerRegistry::new();
        let mut known_ids: Vec<u8> = Vec::new();

        for event in events {
            match event {
                Event::Connect(id) => {
                    registry.connect(&format!("c{id}"));
                    if !known_ids.contains(&id) {
                        known_ids.push(id);
                    }
                }
                Event::Disconnect(id) => {
                    registry.disconnect(&format!("c{id}"));
                }
            }

            let masters = known_ids
                .iter()
                .filter(|id| {
                    matches!(
                        registry.gate(&format!("c{id}")),
                        GateResult::Known { role: ControllerRole::Master }
                    )
                })
                .count();
            prop_assert!(masters <= 1);
        }
    }
}
