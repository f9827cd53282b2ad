//! Two-phase approve-then-act tracker
//!
//! Each flow holds two independent [`PhaseState`]s. The action phase may only
//! leave `Idle` once the approval phase is `Success`; a failed phase can be
//! retried on its own without repeating the one that already succeeded.

use serde::Serialize;

use crate::error::{Phase, ValidationFailure};

/// State of one phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PhaseState {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

impl PhaseState {
    pub fn is_loading(&self) -> bool {
        matches!(self, PhaseState::Loading)
    }
}

/// Combined view of a flow, as shown to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FlowStage {
    Idle,
    Approving,
    ApproveFailed,
    Approved,
    Transferring,
    TransferFailed,
    Done,
}

/// What the primary button does next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NextStep {
    Approve,
    Act,
    /// Something is in flight; the button is disabled
    Wait,
    /// Terminal success; consumed by navigating away
    Done,
}

/// Approval and action state of one flow
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TwoPhaseFlow {
    pub approval: PhaseState,
    pub action: PhaseState,
    /// Selection changed while a phase was in flight
    #[serde(skip)]
    stale: bool,
}

impl TwoPhaseFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> FlowStage {
        use PhaseState::*;
        match (self.approval, self.action) {
            (Idle, _) => FlowStage::Idle,
            (Loading, _) => FlowStage::Approving,
            (Error, _) => FlowStage::ApproveFailed,
            (Success, Idle) => FlowStage::Approved,
            (Success, Loading) => FlowStage::Transferring,
            (Success, Error) => FlowStage::TransferFailed,
            (Success, Success) => FlowStage::Done,
        }
    }

    pub fn next_step(&self) -> NextStep {
        match self.stage() {
            FlowStage::Idle | FlowStage::ApproveFailed => NextStep::Approve,
            FlowStage::Approved | FlowStage::TransferFailed => NextStep::Act,
            FlowStage::Approving | FlowStage::Transferring => NextStep::Wait,
            FlowStage::Done => NextStep::Done,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.approval.is_loading() || self.action.is_loading()
    }

    /// Move the approval phase to `Loading`
    pub fn begin_approval(&mut self) -> Result<(), ValidationFailure> {
        match self.approval {
            PhaseState::Loading => Err(ValidationFailure::Pending(Phase::Approval)),
            PhaseState::Success => Err(ValidationFailure::AlreadyApproved),
            PhaseState::Idle | PhaseState::Error => {
                if self.action.is_loading() {
                    return Err(ValidationFailure::Pending(Phase::Action));
                }
                self.approval = PhaseState::Loading;
                Ok(())
            }
        }
    }

    pub fn finish_approval(&mut self, success: bool) {
        self.approval = if success {
            PhaseState::Success
        } else {
            PhaseState::Error
        };
        self.settle();
    }

    /// Mark approval done without a contract call (nothing to approve)
    pub fn skip_approval(&mut self) {
        if self.approval != PhaseState::Success {
            self.approval = PhaseState::Success;
        }
    }

    /// Move the action phase to `Loading`; requires a successful approval
    pub fn begin_action(&mut self) -> Result<(), ValidationFailure> {
        if self.approval.is_loading() {
            return Err(ValidationFailure::Pending(Phase::Approval));
        }
        if self.approval != PhaseState::Success {
            return Err(ValidationFailure::ApprovalRequired);
        }
        match self.action {
            PhaseState::Loading => Err(ValidationFailure::Pending(Phase::Action)),
            PhaseState::Success => Err(ValidationFailure::AlreadyCompleted),
            PhaseState::Idle | PhaseState::Error => {
                self.action = PhaseState::Loading;
                Ok(())
            }
        }
    }

    pub fn finish_action(&mut self, success: bool) {
        self.action = if success {
            PhaseState::Success
        } else {
            PhaseState::Error
        };
        self.settle();
    }

    /// Back to `Idle` after the user changed the selection.
    ///
    /// A phase that is still in flight keeps its `Loading` state; the reset
    /// lands when it finishes, so its result never carries over to the new
    /// selection.
    pub fn reset(&mut self) {
        if self.is_busy() {
            self.stale = true;
        } else {
            *self = Self::default();
        }
    }

    /// Whether a reset is waiting on the in-flight phase
    pub fn reset_pending(&self) -> bool {
        self.stale
    }

    fn settle(&mut self) {
        if self.stale && !self.is_busy() {
            *self = Self::default();
        }
    }
}
