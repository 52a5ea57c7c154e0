use std::cell::RefCell;
use std::rc::Rc;

/// Shared, ordered record of calls made against test doubles.
///
/// Cloning yields a handle to the same trace, so several doubles can record
/// into one sequence and the interleaving of stages can be asserted.
#[derive(Debug, Clone, Default)]
pub struct CallTrace {
    calls: Rc<RefCell<Vec<String>>>,
}

impl CallTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, call: impl Into<String>) {
        self.calls.borrow_mut().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// Calls whose name starts with `prefix`, in order.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.matching(prefix).len()
    }
}
