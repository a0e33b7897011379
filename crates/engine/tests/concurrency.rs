//! Multi-threaded access to a shared repository

mod common;

use common::{multiple_shards_repository, single_shard_repository, User};
use shardcache_core::ReadMode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;

#[test]
fn test_get_or_create_runs_factory_once() {
    let repository = single_shard_repository();
    let calls = AtomicUsize::new(0);
    let threads = 8;
    let barrier = Barrier::new(threads);

    let (repository, calls, barrier) = (&repository, &calls, &barrier);
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                scope.spawn(move || {
                    barrier.wait();
                    repository
                        .get_or_create(
                            42,
                            || {
                                calls.fetch_add(1, Ordering::SeqCst);
                                Some(User::new(42, "UserX", 30, 0))
                            },
                            &0,
                            ReadMode::Shared,
                        )
                        .unwrap()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let first = &results[0];
    assert!(results.iter().all(|user| user.ptr_eq(first)));
}

#[test]
fn test_parallel_updates_on_distinct_shards() {
    let repository = multiple_shards_repository();
    let rounds = 200;

    thread::scope(|scope| {
        for (name, level) in [("UserA", 0), ("UserC", 1), ("UserE", 2)] {
            let repository = &repository;
            scope.spawn(move || {
                for _ in 0..rounds {
                    repository
                        .try_update(&name.to_string(), &level, |user| {
                            user.set_age(user.age() + 1)
                        })
                        .unwrap();
                }
            });
        }
    });

    for (name, level, age) in [("UserA", 0, 10), ("UserC", 1, 11), ("UserE", 2, 12)] {
        let user = repository
            .get(&name.to_string(), &level, ReadMode::DeepClone)
            .unwrap();
        assert_eq!(user.read().age(), age + rounds);
    }
}

#[test]
fn test_concurrent_units_of_work_serialise_on_one_shard() {
    let repository = single_shard_repository();
    let threads = 4;
    let rounds = 50;

    thread::scope(|scope| {
        for _ in 0..threads {
            scope.spawn(|| {
                for _ in 0..rounds {
                    let mut work = repository.transaction();
                    work.begin(&0)
                        .unwrap()
                        .get_item(1)
                        .unwrap()
                        .do_with_result(|user| user.set_age(user.age() + 1))
                        .unwrap();
                    work.go().unwrap();
                }
            });
        }
    });

    let user = repository.get(&1, &0, ReadMode::DeepClone).unwrap();
    assert_eq!(i32::from(user.read().age()), 10 + threads * rounds);
}

#[test]
fn test_relocations_while_reading() {
    let repository = multiple_shards_repository();

    thread::scope(|scope| {
        scope.spawn(|| {
            for step in 1..=60 {
                let from = step - 1;
                repository
                    .try_update(&"UserB".to_string(), &from, |user| user.set_level(step))
                    .unwrap();
            }
        });
        scope.spawn(|| {
            for _ in 0..500 {
                for index in [0, 1, 2] {
                    if let Ok(Some(user)) =
                        repository.try_get(&"UserA".to_string(), &index, ReadMode::Shared)
                    {
                        assert_eq!(user.read().name, "UserA");
                    }
                }
            }
        });
    });

    assert_eq!(repository.len(), 11);
    assert!(repository.contains_key(&"UserB".to_string(), &60).unwrap());
}

#[test]
fn test_visits_through_shared_handles_survive_updates() {
    let repository = single_shard_repository();
    let held = repository.get(&2, &0, ReadMode::Shared).unwrap();
    let visitors = 4;
    let rounds = 100;

    thread::scope(|scope| {
        for _ in 0..visitors {
            let held = held.clone();
            scope.spawn(move || {
                for _ in 0..rounds {
                    held.read().visit();
                }
            });
        }
        scope.spawn(|| {
            for age in 0..rounds {
                repository
                    .try_update(&2, &0, |user| user.set_age(age as i16))
                    .unwrap();
            }
        });
    });

    let stored = repository.get(&2, &0, ReadMode::Shared).unwrap();
    assert_eq!(stored.read().visits(), visitors * rounds);
    assert_eq!(stored.read().age(), (rounds - 1) as i16);
}
