use super::signal::TrackerSignal;

/// Trait for front ends that react to tracker signals.
pub trait SignalHandler {
    fn handle_signal(&mut self, signal: &TrackerSignal);

    /// Handle multiple signals (default implementation calls handle_signal for each)
    fn handle_signals(&mut self, signals: &[TrackerSignal]) {
        for signal in signals {
            self.handle_signal(signal);
        }
    }
}
