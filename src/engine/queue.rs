// src/engine/queue.rs

use std::collections::{BTreeSet, VecDeque};

use tracing::{debug, warn};

use crate::engine::TaskName;
use crate::types::TriggerWhileRunningBehaviour;

/// Follow-up runs requested by triggers that hit a task already in the
/// active run.
///
/// Each batch is one follow-up run. With the `queue` behaviour a trigger
/// joins the newest batch unless that batch already holds the task, in
/// which case it opens a new batch, up to `max_runs` batches. Past that
/// limit it joins the newest batch anyway. With the default limit of 1,
/// saving a stylesheet three times during `css-build` yields one follow-up
/// `css-build`.
///
/// With `cancel`, every queued batch is replaced by one holding only the
/// latest task.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    max_runs: usize,
    runs: VecDeque<BTreeSet<TaskName>>,
}

impl TriggerQueue {
    /// `max_runs` is clamped to at least 1.
    pub fn new(behaviour: TriggerWhileRunningBehaviour, max_runs: usize) -> Self {
        Self {
            behaviour,
            max_runs: max_runs.max(1),
            runs: VecDeque::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn queued_runs(&self) -> usize {
        self.runs.len()
    }

    pub fn record_trigger(&mut self, task: &str) {
        let name = task.to_string();
        match self.behaviour {
            TriggerWhileRunningBehaviour::Cancel => {
                if self.runs.len() > 1 || self.runs.front().is_some_and(|b| b.len() > 1) {
                    debug!(task = %name, "cancel: replacing queued follow-up runs");
                }
                self.runs.clear();
                self.runs.push_back(BTreeSet::from([name]));
            }
            TriggerWhileRunningBehaviour::Queue => {
                let needs_new_batch = self.runs.back().is_none_or(|b| b.contains(&name));
                if needs_new_batch && self.runs.len() < self.max_runs {
                    debug!(task = %name, queued = self.runs.len() + 1, "queued follow-up run");
                    self.runs.push_back(BTreeSet::from([name]));
                } else if let Some(last) = self.runs.back_mut() {
                    if !last.insert(name.clone()) {
                        warn!(
                            task = %name,
                            max_runs = self.max_runs,
                            "queue full; trigger folded into last follow-up run"
                        );
                    }
                }
            }
        }
    }

    /// Take the oldest batch, sorted by task name. Empty when nothing is
    /// queued.
    pub fn next_batch(&mut self) -> Vec<TaskName> {
        let batch = self.runs.pop_front().unwrap_or_default();
        if !batch.is_empty() {
            debug!(tasks = batch.len(), remaining = self.runs.len(), "starting queued run");
        }
        batch.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_triggers_collapse_into_one_follow_up() {
        let mut queue = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 1);
        queue.record_trigger("css-build");
        queue.record_trigger("css-build");
        queue.record_trigger("js-watch");
        assert_eq!(queue.queued_runs(), 1);
        assert_eq!(queue.next_batch(), vec!["css-build", "js-watch"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn longer_queue_keeps_separate_follow_ups() {
        let mut queue = TriggerQueue::new(TriggerWhileRunningBehaviour::Queue, 2);
        queue.record_trigger("css-build");
        queue.record_trigger("data-build");
        queue.record_trigger("css-build");
        queue.record_trigger("css-build");
        assert_eq!(queue.queued_runs(), 2);
        assert_eq!(queue.next_batch(), vec!["css-build", "data-build"]);
        assert_eq!(queue.next_batch(), vec!["css-build"]);
        assert!(queue.next_batch().is_empty());
    }

    #[test]
    fn cancel_keeps_only_the_latest_trigger() {
        let mut queue = TriggerQueue::new(TriggerWhileRunningBehaviour::Cancel, 3);
        queue.record_trigger("css-build");
        queue.record_trigger("data-build");
        assert_eq!(queue.next_batch(), vec!["data-build"]);
        assert!(queue.is_empty());
    }
}
