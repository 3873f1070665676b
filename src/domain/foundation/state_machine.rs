//! Labelled state machines.
//!
//! A status enum declares its transition labels and a step function; the
//! derived queries (reachable states, terminality) come from the trait.

use std::fmt::Debug;

/// A status enum whose moves are named by `Transition` labels.
pub trait StateMachine: Sized + Copy + PartialEq + Debug {
    /// Label of a requested move.
    type Transition: Copy + Debug + 'static;

    /// Every transition label, in declaration order.
    fn transitions() -> &'static [Self::Transition];

    /// The state reached by `transition`, or `None` if the table forbids it.
    fn step(&self, transition: Self::Transition) -> Option<Self>;

    /// States reachable in one step, in label order.
    fn valid_transitions(&self) -> Vec<Self> {
        Self::transitions()
            .iter()
            .filter_map(|t| self.step(*t))
            .collect()
    }

    /// Returns true if some label moves `self` to `target`.
    fn can_transition_to(&self, target: &Self) -> bool {
        self.valid_transitions().contains(target)
    }

    /// Returns true if no label leaves this state.
    fn is_terminal(&self) -> bool {
        Self::transitions().iter().all(|t| self.step(*t).is_none())
    }
}
