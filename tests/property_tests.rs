//! Property-based tests for the wizard engines
//!
//! Uses proptest over randomly shaped flows and action sequences.
//!
//! These tests verify:
//! - Determinism of `can_transition` / `transition`
//! - Atomicity of failed transitions
//! - History round-trips for flat and hierarchical engines
//! - Sub-state isolation
//! - Insertion correctness for any anchor in a chain

use anyhow::bail;
use proptest::prelude::*;

use installkit::provider::splice_state;
use installkit::wizard::{
    Action, CompositeState, Dfa, HierarchicalDfa, MainStateConfig, State, StateConfig,
    SubStateConfig,
};

/// Linear chain `s0 -> s1 -> ... -> s{len-1}`. Every state `i` in `gated`
/// refuses `next` unless the data bag holds `pass_i = true`.
fn gated_chain(len: usize, gated: &[bool]) -> Dfa {
    let mut dfa = Dfa::new();
    for i in 0..len {
        let mut config = if i + 1 < len {
            StateConfig::new(format!("Step {i}"))
                .next_to(format!("s{}", i + 1))
                .on(Action::SKIP, format!("s{}", i + 1))
                .can_skip(true)
                .on("jump", "nowhere")
        } else {
            StateConfig::terminal("Last")
        };
        if gated.get(i).copied().unwrap_or(false) {
            let key = format!("pass_{i}");
            config = config.with_validator(move |data| {
                if data.get_bool(&key) != Some(true) {
                    bail!("{key} not set");
                }
                Ok(())
            });
        }
        dfa.add_state(format!("s{i}"), config).unwrap();
    }
    dfa
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        Just(Action::NEXT),
        Just(Action::BACK),
        Just(Action::SKIP),
        Just(Action::CANCEL),
        Just(Action::custom("jump")),
    ]
}

// =============================================================================
// Flat Engine Properties
// =============================================================================

proptest! {
    /// Repeated queries with unchanged data agree with each other and with
    /// the outcome of the transition itself.
    #[test]
    fn can_transition_is_deterministic(
        len in 2usize..8,
        gated in prop::collection::vec(any::<bool>(), 8),
        passes in prop::collection::vec(any::<bool>(), 8),
        walk in prop::collection::vec(action_strategy(), 0..10),
        probe in action_strategy(),
    ) {
        let mut dfa = gated_chain(len, &gated);
        for (i, pass) in passes.iter().enumerate().take(len) {
            dfa.set_data(format!("pass_{i}"), *pass).unwrap();
        }
        for action in walk {
            let _ = dfa.transition(action);
        }

        let first = dfa.can_transition(probe.clone());
        for _ in 0..3 {
            prop_assert_eq!(dfa.can_transition(probe.clone()), first);
        }
        prop_assert_eq!(dfa.transition(probe).is_ok(), first);
    }

    /// A failed transition leaves current state, data and history untouched.
    #[test]
    fn failed_transition_is_atomic(
        len in 2usize..8,
        gated in prop::collection::vec(any::<bool>(), 8),
        actions in prop::collection::vec(action_strategy(), 1..20),
    ) {
        let mut dfa = gated_chain(len, &gated);
        for action in actions {
            let before = (dfa.current_state().cloned(), dfa.all_data(), dfa.history().to_vec());
            if dfa.transition(action).is_err() {
                let after = (dfa.current_state().cloned(), dfa.all_data(), dfa.history().to_vec());
                prop_assert_eq!(before, after);
            }
        }
    }

    /// k successful `next` calls followed by k `back` calls return to the start.
    /// The terminal state forbids `back`, so walks stop one short of it.
    #[test]
    fn next_then_back_round_trips(len in 2usize..10, k in 0usize..10) {
        let mut dfa = gated_chain(len, &[]);
        let k = k.min(len - 2);
        let start = dfa.current_state().cloned();

        for _ in 0..k {
            dfa.next().unwrap();
        }
        for _ in 0..k {
            dfa.back().unwrap();
        }
        prop_assert_eq!(dfa.current_state().cloned(), start);
        prop_assert!(dfa.history().is_empty());
    }

    /// Inserting X after any A in a chain yields A -> X -> B, by next or skip.
    #[test]
    fn insertion_rejoins_chain(len in 2usize..8, anchor in 0usize..7, use_skip in any::<bool>()) {
        let anchor = anchor % (len - 1);
        let mut dfa = gated_chain(len, &[]);
        let a = State::new(format!("s{anchor}"));
        let b = State::new(format!("s{}", anchor + 1));
        let x = State::new("inserted");

        splice_state(&mut dfa, &x, &a, StateConfig::new("Inserted")).unwrap();

        for _ in 0..anchor {
            dfa.next().unwrap();
        }
        prop_assert_eq!(dfa.current_state(), Some(&a));
        prop_assert_eq!(dfa.next().unwrap(), x);
        let landed = if use_skip { dfa.skip().unwrap() } else { dfa.next().unwrap() };
        prop_assert_eq!(landed, b);
    }
}

// =============================================================================
// Hierarchical Engine Properties
// =============================================================================

const MAINS: usize = 4;
const SUBS: usize = 3;

/// `MAINS` main states, each with `SUBS` sub-states; main `i`'s initial
/// sub-state is `sub{i % SUBS}`.
fn grid() -> HierarchicalDfa {
    let mut wizard = HierarchicalDfa::new();
    for i in 0..MAINS {
        let state = if i + 1 < MAINS {
            StateConfig::new(format!("Main {i}")).next_to(format!("m{}", i + 1))
        } else {
            StateConfig::new(format!("Main {i}"))
        };
        let mut config = MainStateConfig::new(state);
        for j in 0..SUBS {
            config = config.with_sub_state(format!("sub{j}"), SubStateConfig::new(format!("Sub {j}")));
        }
        config = config.initial_sub_state(format!("sub{}", i % SUBS));
        wizard.add_main_state(format!("m{i}"), config).unwrap();
    }
    wizard
}

#[derive(Debug, Clone)]
enum Move {
    Main(usize),
    Sub(usize),
}

fn move_strategy() -> impl Strategy<Value = Move> {
    prop_oneof![
        (0..MAINS).prop_map(Move::Main),
        (0..SUBS).prop_map(Move::Sub),
    ]
}

proptest! {
    /// Sub navigation never changes the main state; entering a main state
    /// always lands on its initial sub-state.
    #[test]
    fn sub_state_isolation(moves in prop::collection::vec(move_strategy(), 1..30)) {
        let mut wizard = grid();
        for m in moves {
            let before = wizard.current_state().unwrap();
            match m {
                Move::Sub(j) => {
                    let at = wizard.navigate_to_sub_state(format!("sub{j}")).unwrap();
                    prop_assert_eq!(&at.main, &before.main);
                }
                Move::Main(i) => {
                    let at = wizard.navigate_to_main_state(format!("m{i}")).unwrap();
                    prop_assert_eq!(
                        at,
                        CompositeState::with_sub(format!("m{i}"), format!("sub{}", i % SUBS))
                    );
                }
            }
        }
    }

    /// Forward main moves undone by the same number of `go_back` calls
    /// restore the exact composite position.
    #[test]
    fn main_moves_round_trip(
        start_sub in 0..SUBS,
        mains in prop::collection::vec(0..MAINS, 0..10),
        subs in prop::collection::vec(0..SUBS, 10),
    ) {
        let mut wizard = grid();
        wizard.navigate_to_sub_state(format!("sub{start_sub}")).unwrap();
        let start = wizard.current_state();

        for (i, main) in mains.iter().enumerate() {
            wizard.navigate_to_main_state(format!("m{main}")).unwrap();
            wizard.navigate_to_sub_state(format!("sub{}", subs[i])).unwrap();
        }
        for _ in 0..mains.len() {
            wizard.go_back().unwrap();
        }

        prop_assert_eq!(wizard.current_state(), start);
        prop_assert!(wizard.history().is_empty());
    }
}
