use {
    crate::order::OrderTable,
    std::{sync::Barrier, thread},
};

#[test]
fn empty() {
    let table = OrderTable::<u32>::default();
    assert!(table.expected_order().is_empty());
    assert_eq!(table.order_of(&1), None);
}

#[test]
fn held_is_assigned_first() {
    let table = OrderTable::default();
    assert_eq!(table.check(&"b", &"a"), Ok(()));
    assert_eq!(table.order_of(&"b"), Some(1));
    assert_eq!(table.order_of(&"a"), Some(2));
    assert_eq!(table.expected_order(), ["b", "a"]);
}

#[test]
fn first_assignment_wins() {
    let table = OrderTable::default();
    table.check(&1, &2).unwrap();
    table.check(&2, &3).unwrap();
    table.check(&1, &3).unwrap();
    assert_eq!(table.order_of(&1), Some(1));
    assert_eq!(table.order_of(&2), Some(2));
    assert_eq!(table.order_of(&3), Some(3));
}

#[test]
fn same_id_is_consistent() {
    let table = OrderTable::default();
    assert_eq!(table.check(&7, &7), Ok(()));
    assert_eq!(table.expected_order(), [7]);
}

#[test]
fn inversion() {
    let table = OrderTable::default();
    table.check(&1, &2).unwrap();
    assert_eq!(table.check(&2, &1), Err(vec![1, 2]));
    // Orders are untouched by a failed check.
    assert_eq!(table.order_of(&1), Some(1));
    assert_eq!(table.order_of(&2), Some(2));
    assert_eq!(table.check(&1, &2), Ok(()));
}

#[test]
fn unrelated_pairs_report_false_inversion() {
    let table = OrderTable::default();
    table.check(&1, &2).unwrap();
    table.check(&3, &4).unwrap();
    // No cycle exists between (1, 2), (3, 4) and (3, 1), but order(1) < order(3).
    assert_eq!(table.check(&3, &1), Err(vec![1, 2, 3, 4]));
}

#[test]
fn concurrent_checks_agree() {
    const THREADS: u32 = 8;
    let table = OrderTable::default();
    let barrier = Barrier::new(THREADS as usize);
    let failures: u32 = thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let table = &table;
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    let res = if i % 2 == 0 {
                        table.check(&"a", &"b")
                    } else {
                        table.check(&"b", &"a")
                    };
                    res.is_err() as u32
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).sum()
    });
    // Whichever direction was seen first wins, the other half fails.
    assert_eq!(failures, THREADS / 2);
    assert_eq!(table.expected_order().len(), 2);
}
