use lazyslot_gate::{GateAction, GateConfig, VisibilityGate};
use proptest::prelude::*;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
enum Step {
    Observe(bool),
    Advance(u64),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        any::<bool>().prop_map(Step::Observe),
        (0..1500u64).prop_map(Step::Advance),
    ]
}

proptest! {
    #[test]
    fn prop_actions_follow_lifecycle_order(
        steps in proptest::collection::vec(step_strategy(), 0..80)
    ) {
        let mut gate = VisibilityGate::new(GateConfig::default());
        let mut now = Instant::now();
        let mut constructed = false;
        let mut paused = false;

        for step in steps {
            let action = match step {
                Step::Observe(visible) => gate.observe(visible, now),
                Step::Advance(n) => {
                    now += Duration::from_millis(n);
                    gate.poll(now)
                }
            };

            match action {
                Some(GateAction::Init) => {
                    prop_assert!(!constructed, "init while already constructed");
                    constructed = true;
                }
                Some(GateAction::Pause) => {
                    prop_assert!(constructed && !paused, "pause without live widget");
                    paused = true;
                }
                Some(GateAction::Resume) => {
                    prop_assert!(constructed && paused, "resume without pause");
                    paused = false;
                }
                None => {}
            }
            prop_assert_eq!(gate.is_constructed(), constructed);
        }
    }
}
