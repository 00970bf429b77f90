//! Handling of denied calendar access.

/// What the front-end should do after a denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAction {
    /// Ask the user to grant access.
    Prompt,
    /// Access stays denied; keep telling the user.
    ShowNotice,
}

/// Re-prompts once after a denial, then settles on a persistent notice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PermissionGate {
    prompted: bool,
    blocked: bool,
}

impl PermissionGate {
    pub fn new() -> Self {
        PermissionGate::default()
    }

    /// A gate whose prompt was already answered with a refusal.
    pub fn after_refusal() -> Self {
        PermissionGate {
            prompted: true,
            blocked: false,
        }
    }

    pub fn on_denied(&mut self) -> GateAction {
        if self.prompted {
            self.blocked = true;
            GateAction::ShowNotice
        } else {
            self.prompted = true;
            GateAction::Prompt
        }
    }

    pub fn on_granted(&mut self) {
        *self = PermissionGate::default();
    }

    /// True once the prompt was used up and access is still missing.
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }
}
