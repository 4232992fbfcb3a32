use futures::StreamExt;
use local_synctools::prelude::*;
use local_synctools::task;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

const CAPACITIES: [Option<usize>; 5] = [Some(1), Some(2), Some(3), Some(4), None];

fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut result = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let first = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, first.clone());
            result.push(tail);
        }
    }
    result
}

#[test]
fn test_put_suspends_until_get_makes_room() {
    let q = Queue::fifo(Some(1)).unwrap();
    let first = task::start({
        let q = q.clone();
        async move { q.put('A').await }
    });
    let second = task::start({
        let q = q.clone();
        async move { q.put('B').await }
    });
    assert_eq!(Some(Ok(())), first.take_output());
    assert!(!second.is_finished());

    assert_eq!(Ok('A'), q.get_nowait());
    assert_eq!(Some(Ok(())), second.take_output());
    let get = task::start({
        let q = q.clone();
        async move { q.get().await }
    });
    assert_eq!(Some(Ok('B')), get.take_output());
}

#[test]
fn test_resumed_task_calling_back_into_queue_reorders_items() {
    let q = Queue::fifo(Some(1)).unwrap();
    let consumed = Rc::new(RefCell::new(Vec::new()));
    let alpha = task::start({
        let (q, consumed) = (q.clone(), consumed.clone());
        async move {
            q.put('A').await.unwrap();
            q.put('B').await.unwrap();
            let item = q.get().await.unwrap();
            consumed.borrow_mut().push(item);
            q.put('C').await.unwrap();
            let item = q.get().await.unwrap();
            consumed.borrow_mut().push(item);
        }
    });
    let beta = task::start({
        let (q, consumed) = (q.clone(), consumed.clone());
        async move {
            let item = q.get().await.unwrap();
            consumed.borrow_mut().push(item);
        }
    });
    assert!(alpha.is_finished());
    assert!(beta.is_finished());
    assert_eq!(vec!['B', 'C', 'A'], *consumed.borrow());
}

#[test]
fn test_put_and_get_in_the_same_task() {
    for capacity in CAPACITIES {
        let q = Queue::fifo(capacity).unwrap();
        let task = task::start(async move {
            q.put('A').await.unwrap();
            q.get().await
        });
        assert_eq!(Some(Ok('A')), task.take_output());
    }
}

#[test]
fn test_put_then_get_and_get_then_put() {
    for capacity in CAPACITIES {
        let q = Queue::fifo(capacity).unwrap();
        let putter = task::start({
            let q = q.clone();
            async move { q.put('A').await }
        });
        let getter = task::start({
            let q = q.clone();
            async move { q.get().await }
        });
        assert!(putter.is_finished());
        assert_eq!(Some(Ok('A')), getter.take_output());

        let getter = task::start({
            let q = q.clone();
            async move { q.get().await }
        });
        let putter = task::start({
            let q = q.clone();
            async move { q.put('A').await }
        });
        assert!(putter.is_finished());
        assert_eq!(Some(Ok('A')), getter.take_output());
    }
}

#[test]
fn test_stream_consumer_ends_when_queue_closes() {
    for capacity in CAPACITIES {
        for close in [true, false] {
            let q = Queue::fifo(capacity).unwrap();
            let consumer = task::start({
                let q = q.clone();
                async move { q.stream().collect::<String>().await }
            });
            let producer = task::start({
                let q = q.clone();
                async move {
                    for c in "ABC".chars() {
                        q.put(c).await.unwrap();
                    }
                }
            });
            assert!(producer.is_finished());
            assert!(!consumer.is_finished());

            if close { q.close() } else { q.half_close() }
            assert_eq!(Some("ABC".to_owned()), consumer.take_output());
        }
    }
}

#[test]
fn test_closing_fails_pending_getter() {
    for capacity in CAPACITIES {
        for close in [true, false] {
            let q = Queue::<()>::fifo(capacity).unwrap();
            let task = task::start({
                let q = q.clone();
                async move { q.get().await }
            });
            assert!(!task.is_finished());
            if close { q.close() } else { q.half_close() }
            assert_eq!(Some(Err(GetError::Closed)), task.take_output());
        }
    }
}

#[test]
fn test_closing_fails_pending_putter() {
    for close in [true, false] {
        let q = Queue::fifo(Some(1)).unwrap();
        q.put_nowait(0).unwrap();
        let task = task::start({
            let q = q.clone();
            async move { q.put(1).await }
        });
        assert!(!task.is_finished());
        if close { q.close() } else { q.half_close() }
        assert_eq!(Some(Err(PutError::Closed(1))), task.take_output());
    }
}

fn start_triggering_scenario(
    q: &Queue<char>,
    close: bool,
) -> [task::Task<Result<(), String>>; 4] {
    let p1 = task::start({
        let q = q.clone();
        async move {
            q.put('B').await.map_err(|e| e.to_string())?;
            if close { q.close() } else { q.half_close() }
            Ok(())
        }
    });
    let p2 = task::start({
        let q = q.clone();
        async move {
            match q.put('C').await {
                Err(PutError::Closed('C')) => Ok(()),
                other => Err(format!("{other:?}")),
            }
        }
    });
    let c1 = task::start({
        let q = q.clone();
        async move {
            match q.get().await {
                Ok('A') => Ok(()),
                other => Err(format!("{other:?}")),
            }
        }
    });
    let c2 = task::start({
        let q = q.clone();
        async move {
            match (close, q.get().await) {
                (false, Ok('B')) | (true, Err(GetError::Closed)) => Ok(()),
                (_, other) => Err(format!("{other:?}")),
            }
        }
    });
    [p1, p2, c1, c2]
}

#[test]
fn test_putter_triggers_half_close() {
    let q = Queue::fifo(Some(1)).unwrap();
    q.put_nowait('A').unwrap();
    for task in start_triggering_scenario(&q, false) {
        assert_eq!(Some(Ok(())), task.take_output());
    }
    assert!(q.is_empty());
}

#[test]
fn test_putter_triggers_close() {
    let q = Queue::fifo(Some(1)).unwrap();
    q.put_nowait('A').unwrap();
    for task in start_triggering_scenario(&q, true) {
        assert_eq!(Some(Ok(())), task.take_output());
    }
    assert_eq!(QueueState::Closed, q.state());
}

#[test]
fn test_getter_triggers_close() {
    for capacity in CAPACITIES {
        for close in [true, false] {
            let q = Queue::fifo(capacity).unwrap();
            let c1 = task::start({
                let q = q.clone();
                async move {
                    let item = q.get().await;
                    if close { q.close() } else { q.half_close() }
                    item
                }
            });
            let c2 = task::start({
                let q = q.clone();
                async move { q.get().await }
            });
            let p1 = task::start({
                let q = q.clone();
                async move { q.put('A').await }
            });
            let p2 = task::start({
                let q = q.clone();
                async move { q.put('B').await }
            });
            assert_eq!(Some(Ok('A')), c1.take_output());
            assert_eq!(Some(Err(GetError::Closed)), c2.take_output());
            assert_eq!(Some(Ok(())), p1.take_output());
            assert_eq!(Some(Err(PutError::Closed('B'))), p2.take_output());
        }
    }
}

#[test]
fn test_half_close_during_transfer_fails_consumers_left_without_items() {
    let q = Queue::fifo(None).unwrap();
    let c1 = task::start({
        let q = q.clone();
        async move {
            let item = q.get().await;
            q.put_nowait('B').unwrap();
            q.half_close();
            item
        }
    });
    let c2 = task::start({
        let q = q.clone();
        async move { q.get().await }
    });
    let c3 = task::start({
        let q = q.clone();
        async move { q.get().await }
    });

    q.put_nowait('A').unwrap();
    assert_eq!(Some(Ok('A')), c1.take_output());
    assert_eq!(Some(Ok('B')), c2.take_output());
    assert_eq!(Some(Err(GetError::Closed)), c3.take_output());
    assert!(q.is_empty());
    assert_eq!(QueueState::HalfClosed, q.state());
}

#[test]
fn test_every_start_order_consumes_every_item() {
    let script = [('P', 2), ('P', 5), ('C', 2), ('C', 4), ('C', 1)];
    for capacity in [Some(1), None] {
        for permutation in permutations(&script) {
            let q = Queue::fifo(capacity).unwrap();
            let consumed = Rc::new(RefCell::new(Vec::new()));
            let tasks: Vec<_> = permutation
                .iter()
                .map(|&(role, n)| {
                    let (q, consumed) = (q.clone(), consumed.clone());
                    task::start(async move {
                        for _ in 0..n {
                            if role == 'P' {
                                q.put(n).await.unwrap();
                            } else {
                                let item = q.get().await.unwrap();
                                consumed.borrow_mut().push(item);
                            }
                        }
                    })
                })
                .collect();

            assert!(q.is_empty(), "{permutation:?} {capacity:?}");
            assert!(tasks.iter().all(task::Task::is_finished), "{permutation:?} {capacity:?}");
            let mut consumed = consumed.take();
            consumed.sort();
            assert_eq!(vec![2, 2, 5, 5, 5, 5, 5], consumed, "{permutation:?} {capacity:?}");
        }
    }
}

#[test]
fn test_cancelled_task_loses_its_place_in_line() {
    let q = Queue::fifo(None).unwrap();
    let first = task::start({
        let q = q.clone();
        async move { q.get().await }
    });
    let second = task::start({
        let q = q.clone();
        async move { q.get().await }
    });
    first.cancel();
    q.put_nowait('A').unwrap();
    assert!(first.is_cancelled());
    assert_eq!(Some(Ok('A')), second.take_output());
    assert!(q.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_get_leaves_no_waiter_behind() {
    let q = Queue::fifo(Some(2)).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(1), q.get()).await;
    assert!(result.is_err());

    q.put_nowait(1).unwrap();
    assert_eq!(1, q.len());
    let result = tokio::time::timeout(Duration::from_secs(1), q.get()).await;
    assert_eq!(Some(Ok(1)), result.ok());
}

#[tokio::test(start_paused = true)]
async fn test_producers_and_consumers_on_a_tokio_runtime() {
    let q = Queue::new(Some(2), Order::Fifo).unwrap();
    let producer = async {
        for i in 0..10 {
            q.put(i).await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        q.half_close();
    };
    let consumer = async { q.stream().collect::<Vec<_>>().await };
    let ((), items) = tokio::join!(producer, consumer);
    assert_eq!((0..10).collect::<Vec<_>>(), items);
    assert_eq!(QueueState::HalfClosed, q.state());
}
