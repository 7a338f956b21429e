use super::*;

fn secs(d: Duration) -> f64 {
    d.as_secs_f64()
}

fn default_scheduler() -> RetryScheduler {
    RetryScheduler::from_config(&RetryConfig::default()).unwrap()
}

/// Call `get_sleep_time_at` as the reconnect loop would: each call lands
/// exactly one returned interval after the previous one.
fn run_sequence(scheduler: &mut RetryScheduler, start: Instant, calls: usize) -> Vec<f64> {
    let mut now = start;
    let mut out = Vec::with_capacity(calls);
    for _ in 0..calls {
        let sleep = scheduler.get_sleep_time_at(now);
        out.push(secs(sleep));
        now += sleep;
    }
    out
}

#[test]
fn test_rejects_invalid_config() {
    assert!(matches!(
        RetryScheduler::new(0.0, 1.5, 3600.0),
        Err(RecoveryError::InvalidConfig(_))
    ));
    assert!(matches!(
        RetryScheduler::new(60.0, 1.0, 3600.0),
        Err(RecoveryError::InvalidConfig(_))
    ));
    assert!(matches!(
        RetryScheduler::new(60.0, 1.5, 0.0),
        Err(RecoveryError::InvalidConfig(_))
    ));
    assert!(RetryScheduler::new(f64::NAN, 1.5, 3600.0).is_err());
    assert!(RetryScheduler::new(60.0, 1.5, f64::INFINITY).is_err());
}

#[test]
fn test_default_sequence() {
    let mut scheduler = default_scheduler();
    let seq = run_sequence(&mut scheduler, Instant::now(), 8);
    assert_eq!(seq, vec![60.0, 60.0, 120.0, 360.0, 1440.0, 3600.0, 3600.0, 3600.0]);
    assert_eq!(scheduler.max_retry_index(), Some(6));
}

#[test]
fn test_rapid_calls_follow_the_sequence() {
    let mut scheduler = default_scheduler();
    let now = Instant::now();
    let seq: Vec<f64> = (0..4).map(|_| secs(scheduler.get_sleep_time_at(now))).collect();
    assert_eq!(seq, vec![60.0, 60.0, 120.0, 360.0]);
}

#[test]
fn test_sequence_is_non_decreasing_then_capped() {
    let mut scheduler = RetryScheduler::new(1.0, 2.0, 500.0).unwrap();
    let seq = run_sequence(&mut scheduler, Instant::now(), 12);

    for pair in seq.windows(2) {
        assert!(pair[1] >= pair[0], "sequence decreased: {:?}", seq);
    }
    let first_cap = seq.iter().position(|s| *s == 500.0).unwrap();
    assert!(seq[first_cap..].iter().all(|s| *s == 500.0));
}

#[test]
fn test_calc_sleep_time_latches_ceiling() {
    let mut scheduler = default_scheduler();
    assert_eq!(scheduler.calc_sleep_time(0), 60.0);
    assert_eq!(scheduler.calc_sleep_time(4), 1440.0);
    assert_eq!(scheduler.max_retry_index(), None);

    assert_eq!(scheduler.calc_sleep_time(5), 3600.0);
    assert_eq!(scheduler.max_retry_index(), Some(6));

    // far past the ceiling still returns the ceiling
    assert_eq!(scheduler.calc_sleep_time(30), 3600.0);
}

#[test]
fn test_stale_retry_restarts_sequence() {
    let mut scheduler = default_scheduler();
    let start = Instant::now();
    let seq = run_sequence(&mut scheduler, start, 4);
    assert_eq!(seq, vec![60.0, 60.0, 120.0, 360.0]);

    // the last interval was 360s; 1.5 * 360 = 540s is the staleness window
    let last = start + Duration::from_secs(60 + 60 + 120);
    let late = last + Duration::from_secs(541);
    assert_eq!(secs(scheduler.get_sleep_time_at(late)), 60.0);
    assert_eq!(scheduler.retry_count(), 1);
}

#[test]
fn test_retry_within_tolerance_continues_sequence() {
    let mut scheduler = default_scheduler();
    let start = Instant::now();
    run_sequence(&mut scheduler, start, 3);

    // previous interval 120s, window 180s
    let last = start + Duration::from_secs(120);
    let on_time = last + Duration::from_secs(179);
    assert_eq!(secs(scheduler.get_sleep_time_at(on_time)), 360.0);
    assert_eq!(scheduler.retry_count(), 4);
}

#[test]
fn test_latched_index_survives_stale_reset() {
    let mut scheduler = default_scheduler();
    let start = Instant::now();
    run_sequence(&mut scheduler, start, 7);
    assert_eq!(scheduler.max_retry_index(), Some(6));

    // a day later the sequence starts over from the bottom, but the latch
    // is kept and applies again once the count reaches it
    let later = start + Duration::from_secs(86_400);
    let seq = run_sequence(&mut scheduler, later, 7);
    assert_eq!(seq, vec![60.0, 60.0, 120.0, 360.0, 1440.0, 3600.0, 3600.0]);
    assert_eq!(scheduler.max_retry_index(), Some(6));
}

#[test]
fn test_reset_clears_count() {
    let mut scheduler = default_scheduler();
    let now = Instant::now();
    scheduler.get_sleep_time_at(now);
    scheduler.get_sleep_time_at(now);
    assert_eq!(scheduler.retry_count(), 2);

    scheduler.reset();
    assert_eq!(scheduler.retry_count(), 0);
    assert_eq!(secs(scheduler.get_sleep_time_at(now)), 60.0);
}

#[test]
fn test_ceiling_below_base() {
    let mut scheduler = RetryScheduler::new(60.0, 1.5, 10.0).unwrap();
    let seq = run_sequence(&mut scheduler, Instant::now(), 3);
    assert_eq!(seq, vec![10.0, 10.0, 10.0]);
}

#[test]
fn test_factorial() {
    assert_eq!(factorial(0), 1.0);
    assert_eq!(factorial(1), 1.0);
    assert_eq!(factorial(5), 120.0);
    assert!(factorial(200).is_infinite());
}
