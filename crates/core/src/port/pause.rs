// Pause signalling between the backpressure monitor and the pump

/// Read side, polled by a scheduler before every queue visit
pub trait PauseSource: Send + Sync {
    fn is_paused(&self) -> bool;
}

/// Edge notifications raised by the backpressure monitor
pub trait PauseListener: Send + Sync {
    /// Called once per pause/resume transition
    fn on_pause_changed(&self, paused: bool) -> crate::error::Result<()>;
}
