#![cfg(feature = "shuttle")]

mod common;

use shuttle::scheduler::RandomScheduler;
use shuttle::{Config, MaxSteps, PortfolioRunner};
use test_log::test;

fn portfolio_runner(schedulers: usize, iterations: usize) -> PortfolioRunner {
    let mut config: Config = Config::new();
    // busy-waiting participants can take arbitrarily many steps under an unlucky schedule
    config.max_steps = MaxSteps::None;

    let mut portfolio_runner = PortfolioRunner::new(true, config);
    for _ in 0..schedulers {
        portfolio_runner.add(RandomScheduler::new(iterations));
    }
    portfolio_runner
}

#[test]
fn two_participant_ticket_lock_shuttle_test() {
    portfolio_runner(8, 200).run(|| {
        common::ticket_lock_counter(2, 2);
    });
}

#[test]
fn readers_and_writers_shuttle_test() {
    portfolio_runner(8, 100).run(|| {
        common::readers_and_writers_workload(2, 1, 1);
    });
}

#[test]
fn semaphore_single_permit_shuttle_test() {
    portfolio_runner(8, 200).run(|| {
        common::semaphore_two_waiters_one_signal();
    });
}

#[test]
fn writers_only_shuttle_test() {
    portfolio_runner(8, 100).run(|| {
        let totals = common::readers_and_writers_workload(0, 2, 2);
        assert_eq!(totals.peak_writers, 1);
    });
}
