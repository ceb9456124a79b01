//! Job selection for a scheduling pass.

use crate::job::{JobId, JobState, UploadJob};

use super::budget::UploadBudget;

pub fn uploading_count<'a>(jobs: impl IntoIterator<Item = &'a UploadJob>) -> usize {
    jobs.into_iter()
        .filter(|j| j.state == JobState::Uploading)
        .count()
}

/// Jobs to start in this pass, in start order: the queued jobs with a file
/// attached, smallest id first, as many as the budget has free slots.
pub fn plan_starts<'a, I>(jobs: I, budget: UploadBudget) -> Vec<JobId>
where
    I: IntoIterator<Item = &'a UploadJob>,
    I::IntoIter: Clone,
{
    let jobs = jobs.into_iter();
    let free = budget.available(uploading_count(jobs.clone()));
    if free == 0 {
        return Vec::new();
    }
    let mut runnable: Vec<JobId> = jobs.filter(|j| j.is_runnable()).map(|j| j.id).collect();
    runnable.sort_unstable();
    runnable.truncate(free);
    runnable
}
