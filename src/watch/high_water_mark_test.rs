use std::sync::Arc;

use super::*;

#[test]
fn update_reports_only_new_maximums() {
    let hwm = HighWaterMark::new();

    assert!(!hwm.update(0));
    assert!(hwm.update(3));
    assert!(!hwm.update(3));
    assert!(!hwm.update(1));
    assert!(hwm.update(7));
    assert_eq!(hwm.get(), 7);
}

#[test]
fn concurrent_updates_keep_the_largest_value() {
    let hwm = Arc::new(HighWaterMark::new());

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let hwm = hwm.clone();
            std::thread::spawn(move || {
                let mut raised = 0;
                for depth in (t * 100)..(t * 100 + 100) {
                    if hwm.update(depth) {
                        raised += 1;
                    }
                }
                raised
            })
        })
        .collect();

    let raised: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

    assert_eq!(hwm.get(), 799);
    assert!(raised >= 1);
}
