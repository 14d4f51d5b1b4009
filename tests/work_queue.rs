// tests/work_queue.rs

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tributary::{worker_fn, BoxError, QueueOptions, TributaryError, WorkQueue};
mod common;

type Seen = Arc<Mutex<Vec<HashSet<u32>>>>;

fn recording_queue(workers: usize, seen: Seen) -> WorkQueue<u32> {
  WorkQueue::<u32>::start(
    QueueOptions::default().with_workers(workers),
    worker_fn(move |worker_id, item: u32| {
      let seen = seen.clone();
      async move {
        common::jitter(100).await;
        let fresh = seen.lock()[worker_id].insert(item);
        assert!(fresh, "worker {} got {} twice", worker_id, item);
        Ok::<(), BoxError>(())
      }
    }),
  )
  .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn three_workers_split_twenty_items() {
  common::setup_tracing();
  let seen: Seen = Arc::new(Mutex::new(vec![HashSet::new(); 3]));
  let queue = recording_queue(3, seen.clone());

  for i in 0..20 {
    queue.enqueue(i).await.unwrap();
  }
  queue.close();
  let report = tokio::time::timeout(common::LONG_TIMEOUT, queue.join()).await.unwrap().unwrap();

  let sets = seen.lock().clone();
  let union: HashSet<u32> = sets.iter().flatten().copied().collect();
  assert_eq!(union, (0..20).collect::<HashSet<_>>());
  assert_eq!(sets.iter().map(HashSet::len).sum::<usize>(), 20);
  for a in 0..sets.len() {
    for b in (a + 1)..sets.len() {
      assert!(sets[a].is_disjoint(&sets[b]), "workers {} and {} overlap", a, b);
    }
  }
  assert_eq!(report.total_handled(), 20);
  for (worker_id, set) in sets.iter().enumerate() {
    assert_eq!(report.handled[worker_id], set.len() as u64);
  }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn any_pool_size_delivers_every_item_once() {
  common::setup_tracing();
  for workers in [1, 2, 7] {
    let seen: Seen = Arc::new(Mutex::new(vec![HashSet::new(); workers]));
    let queue = recording_queue(workers, seen.clone());

    // Several concurrent enqueuers sharing the queue.
    let mut feeders = Vec::new();
    for part in 0..4u32 {
      let enqueuer = queue.enqueuer();
      feeders.push(tokio::spawn(async move {
        for i in (part * 25)..((part + 1) * 25) {
          enqueuer.enqueue(i).await.unwrap();
        }
      }));
    }
    for feeder in feeders {
      feeder.await.unwrap();
    }
    queue.close();
    let report = tokio::time::timeout(common::LONG_TIMEOUT, queue.join()).await.unwrap().unwrap();

    let sets = seen.lock().clone();
    assert_eq!(sets.iter().map(HashSet::len).sum::<usize>(), 100);
    let union: HashSet<u32> = sets.iter().flatten().copied().collect();
    assert_eq!(union.len(), 100);
    assert_eq!(report.total_handled(), 100);
  }
}

#[tokio::test]
async fn cancel_stops_workers_without_draining() {
  common::setup_tracing();
  let queue = WorkQueue::<u32>::start(
    QueueOptions::default().with_workers(1).with_capacity(16),
    worker_fn(|_worker_id, _item: u32| async {
      tokio::time::sleep(std::time::Duration::from_millis(20)).await;
      Ok::<(), BoxError>(())
    }),
  )
  .unwrap();

  for i in 0..10 {
    queue.enqueue(i).await.unwrap();
  }
  queue.cancel();
  let report = tokio::time::timeout(common::LONG_TIMEOUT, queue.join()).await.unwrap().unwrap();
  assert!(report.cancelled);
  assert!(report.total_handled() < 10);
  assert!(matches!(queue.enqueue(11).await, Err(TributaryError::QueueClosed)));
}
