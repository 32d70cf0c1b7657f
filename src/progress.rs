use crate::timefmt::format_time;

/// Progress display state for the player screen.
///
/// While the user is dragging the scrub position, incoming playback ticks
/// are ignored so they never fight the drag. Once the drag ends the chosen
/// time is handed back to the caller to push to the player.
#[derive(Debug, Clone)]
pub struct ProgressState {
    current_time: f32,
    duration: f32,
    dragging: bool,
    elapsed_text: String,
    remaining_text: String,
}

impl ProgressState {
    pub fn new() -> Self {
        let mut progress = Self {
            current_time: 0.,
            duration: 0.,
            dragging: false,
            elapsed_text: String::new(),
            remaining_text: String::new(),
        };
        progress.refresh_text();
        progress
    }

    pub fn current_time(&self) -> f32 {
        self.current_time
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn elapsed_text(&self) -> &str {
        &self.elapsed_text
    }

    pub fn remaining_text(&self) -> &str {
        &self.remaining_text
    }

    /// Fraction played, for the progress gauge.
    pub fn ratio(&self) -> f64 {
        if self.duration > 0. {
            (self.current_time as f64 / self.duration as f64).clamp(0., 1.)
        } else {
            0.
        }
    }

    /// Playback clock update. Ignored entirely while a drag is active.
    pub fn tick(&mut self, time: f32, duration: f32) {
        if self.dragging {
            return;
        }
        self.current_time = time;
        self.duration = duration;
        self.refresh_text();
    }

    pub fn begin_drag(&mut self) {
        self.dragging = true;
    }

    /// Moves the scrub position. No-op unless a drag is active, so stray
    /// key repeats after a drag ended don't move anything.
    pub fn update_drag(&mut self, time: f32) {
        if !self.dragging {
            return;
        }
        self.current_time = time.clamp(0., self.duration.max(0.));
        self.refresh_text();
    }

    /// Ends the drag and returns the chosen time for the caller to seek to.
    pub fn end_drag(&mut self) -> f32 {
        self.dragging = false;
        self.refresh_text();
        self.current_time
    }

    /// Abandons the drag without committing. The next tick resynchronizes
    /// the displayed time with the playback clock.
    pub fn cancel_drag(&mut self) {
        self.dragging = false;
    }

    fn refresh_text(&mut self) {
        self.elapsed_text = format_time(self.current_time);
        self.remaining_text = format!("-{}", format_time(self.duration - self.current_time));
    }
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_track_the_playback_clock() {
        let mut progress = ProgressState::new();
        for t in [1.0_f32, 2.5, 7.0, 12.0] {
            progress.tick(t, 180.);
        }
        assert_eq!(progress.current_time(), 12.);
        assert_eq!(progress.duration(), 180.);
        assert_eq!(progress.elapsed_text(), "0:12");
        assert_eq!(progress.remaining_text(), "-2:48");
    }

    #[test]
    fn ticks_are_ignored_while_dragging() {
        let mut progress = ProgressState::new();
        progress.tick(10., 100.);
        progress.begin_drag();
        progress.tick(20., 100.);
        progress.tick(30., 100.);
        assert_eq!(progress.current_time(), 10.);
    }

    #[test]
    fn end_drag_returns_last_dragged_value() {
        let mut progress = ProgressState::new();
        progress.tick(10., 100.);
        progress.begin_drag();
        progress.update_drag(40.);
        progress.tick(11., 100.);
        progress.update_drag(55.);
        let chosen = progress.end_drag();
        assert_eq!(chosen, 55.);
        assert!(!progress.is_dragging());
        assert_eq!(progress.elapsed_text(), "0:55");
    }

    #[test]
    fn update_drag_without_begin_is_a_no_op() {
        let mut progress = ProgressState::new();
        progress.tick(10., 100.);
        progress.update_drag(90.);
        assert_eq!(progress.current_time(), 10.);
    }

    #[test]
    fn drag_position_is_clamped_to_the_track() {
        let mut progress = ProgressState::new();
        progress.tick(10., 100.);
        progress.begin_drag();
        progress.update_drag(150.);
        assert_eq!(progress.current_time(), 100.);
        progress.update_drag(-5.);
        assert_eq!(progress.current_time(), 0.);
    }

    #[test]
    fn cancelled_drag_resyncs_on_next_tick() {
        let mut progress = ProgressState::new();
        progress.tick(10., 100.);
        progress.begin_drag();
        progress.update_drag(80.);
        progress.cancel_drag();
        progress.tick(12., 100.);
        assert_eq!(progress.current_time(), 12.);
    }

    #[test]
    fn text_is_refreshed_by_every_mutation() {
        let mut progress = ProgressState::new();
        assert_eq!(progress.elapsed_text(), "0:00");
        assert_eq!(progress.remaining_text(), "-0:00");
        progress.tick(65., 4000.);
        assert_eq!(progress.elapsed_text(), "1:05");
        assert_eq!(progress.remaining_text(), "-1:05:35");
        progress.begin_drag();
        progress.update_drag(130.);
        assert_eq!(progress.elapsed_text(), "2:10");
    }
}
