/// Credit window policy for the receiving link.
///
/// Replenishes back up to the full window once outstanding credit drops
/// below half of it. Issuing the credit is left to the transport.
#[derive(Debug, Clone, Copy)]
pub struct FlowController {
    window: u32,
}

impl FlowController {
    /// `window` must be non-zero; checked by the configuration layer.
    pub fn new(window: u32) -> Self {
        Self { window }
    }

    pub fn window(&self) -> u32 {
        self.window
    }

    /// Amount of credit to grant given the credit currently outstanding.
    pub fn credit_check(&self, current: u32) -> u32 {
        if current < self.window / 2 {
            self.window.saturating_sub(current)
        } else {
            0
        }
    }
}
