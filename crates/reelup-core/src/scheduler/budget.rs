//! Global upload budget shared by all jobs.

/// Maximum number of jobs uploading at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadBudget {
    max_concurrent: usize,
}

impl UploadBudget {
    /// Create a budget; zero is clamped to one so the queue can always drain.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Free slots given `in_use` uploading jobs. May be 0.
    pub fn available(&self, in_use: usize) -> usize {
        self.max_concurrent.saturating_sub(in_use)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_available_slots() {
        let budget = UploadBudget::new(3);
        assert_eq!(budget.max_concurrent(), 3);
        assert_eq!(budget.available(0), 3);
        assert_eq!(budget.available(2), 1);
        assert_eq!(budget.available(3), 0);
        assert_eq!(budget.available(5), 0);
    }

    #[test]
    fn zero_budget_clamps_to_one() {
        let budget = UploadBudget::new(0);
        assert_eq!(budget.max_concurrent(), 1);
        assert_eq!(budget.available(0), 1);
    }
}
