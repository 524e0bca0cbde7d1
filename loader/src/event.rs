/// Everything the control loop reacts to. Timers, the keyboard hook and the
/// Ctrl+C handler all feed the same channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderEvent {
    /// Advance the loading-dot animation.
    DotTick,
    /// Take a process snapshot and update the wait-set.
    PollTick,
    /// The startup deadline elapsed.
    Timeout,
    /// Escape, Alt+F4 or Ctrl+C: close without waiting any longer.
    Abort,
    /// The grace period after entering shutdown is over; exit now.
    GraceElapsed,
}
