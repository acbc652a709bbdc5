// Unit tests for the one-shot threshold trigger.

use crate::registry::TriggerState;
use crate::registry::trigger::ThresholdTrigger;

use std::time::Duration;

/// **VALUE**: Verifies the trigger stays armed below capacity and fires at capacity.
///
/// **WHY THIS MATTERS**: The cleanup agent starts evicting only after this signal.
/// Firing early evicts users on an idle server; never firing lets the server overflow.
///
/// **BUG THIS CATCHES**: Would catch an off-by-one (`>` instead of `>=`).
#[test]
fn given_armed_trigger_when_size_reaches_capacity_then_fires() {
    // GIVEN: A trigger with capacity 3
    let (mut trigger, waiter) = ThresholdTrigger::new(3);

    // WHEN: Sizes below capacity are observed
    assert!(!trigger.observe(1));
    assert!(!trigger.observe(2));

    // THEN: Still armed
    assert_eq!(trigger.state(), TriggerState::Armed);
    assert!(!waiter.is_fired());

    // WHEN: Capacity is reached
    assert!(trigger.observe(3), "Should fire at capacity");

    // THEN: Fired, visible to the waiter
    assert_eq!(trigger.state(), TriggerState::Fired);
    assert!(waiter.is_fired());
}

/// **VALUE**: Verifies a fired trigger never fires again.
///
/// **BUG THIS CATCHES**: Would catch a missing state check, which would re-signal
/// the agent every time the count dips and climbs back over capacity.
#[test]
fn given_fired_trigger_when_observed_again_then_does_not_fire() {
    // GIVEN: A fired trigger
    let (mut trigger, _waiter) = ThresholdTrigger::new(2);
    assert!(trigger.observe(2));

    // WHEN: Capacity is reached again, and exceeded
    let again = trigger.observe(2);
    let above = trigger.observe(10);

    // THEN: Neither fires
    assert!(!again);
    assert!(!above);
    assert_eq!(trigger.state(), TriggerState::Fired);
}

/// **VALUE**: Verifies that every waiter is released by a single firing.
///
/// **WHY THIS MATTERS**: Each network command connection waits on the trigger
/// independently; all of them must wake.
#[tokio::test]
async fn given_multiple_waiters_when_trigger_fires_then_all_resolve() {
    // GIVEN: Two waiters blocked on an armed trigger
    let (mut trigger, waiter) = ThresholdTrigger::new(1);
    let first = tokio::spawn({
        let waiter = waiter.clone();
        async move { waiter.fired().await }
    });
    let second = tokio::spawn({
        let waiter = waiter.clone();
        async move { waiter.fired().await }
    });

    // WHEN: The trigger fires
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(trigger.observe(1));

    // THEN: Both waiters resolve with true
    assert!(first.await.expect("first waiter panicked"));
    assert!(second.await.expect("second waiter panicked"));
}

/// **VALUE**: Verifies a waiter does not hang forever if the trigger is dropped unfired.
///
/// **BUG THIS CATCHES**: Would catch ignoring the watch channel's closed state,
/// which would leak one task per waiting command connection on shutdown.
#[tokio::test]
async fn given_armed_trigger_when_dropped_then_waiter_returns_false() {
    // GIVEN: A waiter on an armed trigger
    let (trigger, waiter) = ThresholdTrigger::new(5);

    // WHEN: The trigger is dropped without firing
    drop(trigger);

    // THEN: The waiter resolves promptly with false
    let fired = tokio::time::timeout(Duration::from_secs(1), waiter.fired())
        .await
        .expect("Waiter should not hang");
    assert!(!fired);
}
