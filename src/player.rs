#![forbid(unsafe_code)]

//! Transport state machine backing the rendered player pages.
//!
//! The embedded iframe never reports playback events back, so elapsed time is
//! a simulated clock, not ground truth. This module is the authoritative
//! model of that state machine: the script emitted by [`crate::render`]
//! mirrors these transitions and interpolates the tuning constants below, so
//! the behavior pinned down by the tests here is the behavior that ships.
//!
//! Everything is driven from a single logical thread of control (input events
//! plus one recurring timer), which is why there is no locking anywhere.

/// Pre-seeded duration; there is no real source of truth for it.
pub const PLACEHOLDER_DURATION_SECONDS: f64 = 300.0;
/// Period of the simulated playback clock.
pub const TICK_INTERVAL_MS: u64 = 1_000;
/// Keyboard seek step, seconds.
pub const SEEK_STEP_SECONDS: f64 = 10.0;
/// Keyboard volume step.
pub const VOLUME_STEP: f64 = 0.1;
/// Minimum dominant-axis drag distance before a swipe counts as a gesture.
pub const SWIPE_THRESHOLD_PX: f64 = 50.0;
/// Inactivity window after which controls hide during playback.
pub const HIDE_CONTROLS_AFTER_MS: u64 = 3_000;
/// Volume restored by unmute when no pre-mute volume was remembered.
pub const DEFAULT_UNMUTE_VOLUME: f64 = 0.5;

/// Outcome of interpreting a pointer/touch drag relative to its start point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    SeekBack,
    SeekForward,
    VolumeUp,
    VolumeDown,
}

/// Maps a drag to a gesture: the dominant axis must also clear
/// [`SWIPE_THRESHOLD_PX`]. Horizontal drags seek (right is forward); vertical
/// drags change volume, and dragging down lowers it, matching the physical
/// direction of a volume slider.
pub fn interpret_drag(delta_x: f64, delta_y: f64) -> Option<Gesture> {
    if delta_x.abs() > delta_y.abs() && delta_x.abs() > SWIPE_THRESHOLD_PX {
        Some(if delta_x > 0.0 {
            Gesture::SeekForward
        } else {
            Gesture::SeekBack
        })
    } else if delta_y.abs() > delta_x.abs() && delta_y.abs() > SWIPE_THRESHOLD_PX {
        Some(if delta_y > 0.0 {
            Gesture::VolumeDown
        } else {
            Gesture::VolumeUp
        })
    } else {
        None
    }
}

/// Maps a pointer position on the progress or volume track to a clamped
/// fraction of its width.
pub fn track_fraction(pointer_x: f64, track_left: f64, track_width: f64) -> f64 {
    if track_width <= 0.0 {
        return 0.0;
    }
    ((pointer_x - track_left) / track_width).clamp(0.0, 1.0)
}

/// Formats seconds as `m:ss` for the time display.
pub fn format_time(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Progress bar width in percent.
pub fn progress_percent(current_time: f64, duration: f64) -> f64 {
    if duration <= 0.0 {
        return 0.0;
    }
    (current_time / duration * 100.0).clamp(0.0, 100.0)
}

/// Icon shown on the mute button for a given volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeIcon {
    Off,
    Down,
    Up,
}

impl VolumeIcon {
    pub fn for_volume(volume: f64) -> Self {
        if volume <= 0.0 {
            Self::Off
        } else if volume < 0.5 {
            Self::Down
        } else {
            Self::Up
        }
    }

    /// Material icon ligature used in the rendered markup.
    pub fn glyph(self) -> &'static str {
        match self {
            Self::Off => "volume_off",
            Self::Down => "volume_down",
            Self::Up => "volume_up",
        }
    }
}

/// One player's transport state. Created when a document loads, mutated only
/// through the methods below (every mutator clamps before writing), dropped
/// on unload.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    is_playing: bool,
    current_time: f64,
    duration: f64,
    volume: f64,
    previous_volume: Option<f64>,
    controls_visible: bool,
    // Milliseconds since the last user activity.
    idle_ms: u64,
    // Partial progress toward the next simulated-clock tick. Reset when the
    // clock stops so pausing never leaks a fractional tick.
    clock_ms: u64,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackState {
    /// Paused, at the start, full volume, controls showing.
    pub fn new() -> Self {
        Self {
            is_playing: false,
            current_time: 0.0,
            duration: PLACEHOLDER_DURATION_SECONDS,
            volume: 1.0,
            previous_volume: None,
            controls_visible: true,
            idle_ms: 0,
            clock_ms: 0,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn controls_visible(&self) -> bool {
        self.controls_visible
    }

    /// True while the simulated clock is scheduled. Entering `Playing` starts
    /// it, leaving `Playing` stops it; there is never more than one.
    pub fn clock_running(&self) -> bool {
        self.is_playing
    }

    /// Play/pause toggle. Always re-shows the controls.
    pub fn toggle_play(&mut self) {
        self.is_playing = !self.is_playing;
        if !self.is_playing {
            self.clock_ms = 0;
        }
        self.wake();
    }

    /// Advances wall-clock time: drives the simulated playback clock and the
    /// control-visibility timer. The clock adds one second per full
    /// [`TICK_INTERVAL_MS`] while playing and strictly before the end.
    pub fn advance(&mut self, elapsed_ms: u64) {
        if self.is_playing {
            self.clock_ms += elapsed_ms;
            while self.clock_ms >= TICK_INTERVAL_MS {
                self.clock_ms -= TICK_INTERVAL_MS;
                if self.current_time < self.duration {
                    self.set_time(self.current_time + 1.0);
                }
            }
        }

        self.idle_ms = self.idle_ms.saturating_add(elapsed_ms);
        // Controls stay visible while paused; only playback hides them.
        if self.is_playing && self.idle_ms > HIDE_CONTROLS_AFTER_MS {
            self.controls_visible = false;
        }
    }

    /// Relative seek, clamped to `[0, duration]`.
    pub fn seek(&mut self, delta_seconds: f64) {
        self.set_time(self.current_time + delta_seconds);
        self.wake();
    }

    /// Absolute seek from a track position, `fraction` in `[0, 1]`.
    pub fn scrub_to(&mut self, fraction: f64) {
        self.set_time(fraction.clamp(0.0, 1.0) * self.duration);
        self.wake();
    }

    /// Relative volume change, clamped to `[0, 1]`.
    pub fn adjust_volume(&mut self, delta: f64) {
        self.volume = (self.volume + delta).clamp(0.0, 1.0);
        self.wake();
    }

    /// Absolute volume from the slider, `fraction` in `[0, 1]`.
    pub fn set_volume_fraction(&mut self, fraction: f64) {
        self.volume = fraction.clamp(0.0, 1.0);
        self.wake();
    }

    /// Muting remembers the current nonzero volume; unmuting restores it, or
    /// [`DEFAULT_UNMUTE_VOLUME`] when nothing was remembered.
    pub fn toggle_mute(&mut self) {
        if self.volume > 0.0 {
            self.previous_volume = Some(self.volume);
            self.volume = 0.0;
        } else {
            self.volume = self
                .previous_volume
                .take()
                .unwrap_or(DEFAULT_UNMUTE_VOLUME)
                .clamp(0.0, 1.0);
        }
        self.wake();
    }

    pub fn apply_gesture(&mut self, gesture: Gesture) {
        match gesture {
            Gesture::SeekBack => self.seek(-SEEK_STEP_SECONDS),
            Gesture::SeekForward => self.seek(SEEK_STEP_SECONDS),
            Gesture::VolumeUp => self.adjust_volume(VOLUME_STEP),
            Gesture::VolumeDown => self.adjust_volume(-VOLUME_STEP),
        }
    }

    /// Pointer movement, touch start, or any explicit action: show the
    /// controls and restart the inactivity window.
    pub fn note_activity(&mut self) {
        self.wake();
    }

    fn wake(&mut self) {
        self.controls_visible = true;
        self.idle_ms = 0;
    }

    fn set_time(&mut self, seconds: f64) {
        self.current_time = seconds.clamp(0.0, self.duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invariants_hold(state: &PlaybackState) -> bool {
        state.current_time() >= 0.0
            && state.current_time() <= state.duration()
            && state.volume() >= 0.0
            && state.volume() <= 1.0
    }

    #[test]
    fn new_state_is_paused_with_controls_showing() {
        let state = PlaybackState::new();
        assert!(!state.is_playing());
        assert!(state.controls_visible());
        assert_eq!(state.current_time(), 0.0);
        assert_eq!(state.duration(), PLACEHOLDER_DURATION_SECONDS);
        assert_eq!(state.volume(), 1.0);
        assert!(!state.clock_running());
    }

    #[test]
    fn seek_clamps_both_ends() {
        let mut state = PlaybackState::new();
        state.seek(-SEEK_STEP_SECONDS);
        assert_eq!(state.current_time(), 0.0);
        state.seek(1e9);
        assert_eq!(state.current_time(), state.duration());
    }

    #[test]
    fn volume_clamps_both_ends() {
        let mut state = PlaybackState::new();
        state.adjust_volume(5.0);
        assert_eq!(state.volume(), 1.0);
        state.adjust_volume(-5.0);
        assert_eq!(state.volume(), 0.0);
    }

    #[test]
    fn invariants_survive_arbitrary_sequences() {
        let mut state = PlaybackState::new();
        let deltas = [-30.0, 500.0, -1e6, 7.5, 0.0, 299.0, 2.0];
        for (index, delta) in deltas.iter().enumerate() {
            state.seek(*delta);
            state.adjust_volume(delta / 100.0);
            if index % 2 == 0 {
                state.toggle_mute();
            }
            state.scrub_to(delta / 10.0);
            assert!(invariants_hold(&state), "violated after step {index}");
        }
    }

    #[test]
    fn mute_then_unmute_restores_exact_volume() {
        let mut state = PlaybackState::new();
        state.adjust_volume(-0.3);
        let before = state.volume();
        state.toggle_mute();
        assert_eq!(state.volume(), 0.0);
        state.toggle_mute();
        assert_eq!(state.volume(), before);
    }

    #[test]
    fn unmute_without_memory_uses_default() {
        let mut state = PlaybackState::new();
        state.adjust_volume(-1.0);
        // Volume reached zero through adjustment, not mute, so nothing was
        // remembered.
        state.toggle_mute();
        assert_eq!(state.volume(), DEFAULT_UNMUTE_VOLUME);
    }

    #[test]
    fn second_toggle_unmutes_to_remembered_volume() {
        let mut state = PlaybackState::new();
        state.set_volume_fraction(0.7);
        state.toggle_mute();
        state.toggle_mute();
        assert_eq!(state.volume(), 0.7);
    }

    #[test]
    fn clock_ticks_once_per_interval_while_playing() {
        let mut state = PlaybackState::new();
        state.toggle_play();
        assert!(state.clock_running());
        state.advance(TICK_INTERVAL_MS);
        assert_eq!(state.current_time(), 1.0);
        state.advance(3 * TICK_INTERVAL_MS + 500);
        assert_eq!(state.current_time(), 4.0);
    }

    #[test]
    fn clock_does_not_run_while_paused() {
        let mut state = PlaybackState::new();
        state.advance(10 * TICK_INTERVAL_MS);
        assert_eq!(state.current_time(), 0.0);
        assert!(!state.clock_running());
    }

    #[test]
    fn rapid_double_toggle_leaves_one_clock_at_most() {
        let mut state = PlaybackState::new();
        state.toggle_play();
        state.toggle_play();
        assert!(!state.clock_running());
        state.advance(TICK_INTERVAL_MS);
        assert_eq!(state.current_time(), 0.0);

        state.toggle_play();
        state.advance(TICK_INTERVAL_MS);
        // One clock: exactly one second per interval, not two.
        assert_eq!(state.current_time(), 1.0);
    }

    #[test]
    fn pausing_discards_partial_tick() {
        let mut state = PlaybackState::new();
        state.toggle_play();
        state.advance(900);
        state.toggle_play();
        state.toggle_play();
        state.advance(200);
        assert_eq!(state.current_time(), 0.0);
    }

    #[test]
    fn clock_stops_at_duration() {
        let mut state = PlaybackState::new();
        state.toggle_play();
        state.scrub_to(1.0);
        state.advance(5 * TICK_INTERVAL_MS);
        assert_eq!(state.current_time(), state.duration());
    }

    #[test]
    fn controls_hide_after_inactivity_only_while_playing() {
        let mut state = PlaybackState::new();
        state.toggle_play();
        state.advance(HIDE_CONTROLS_AFTER_MS + 1);
        assert!(!state.controls_visible());

        let mut paused = PlaybackState::new();
        paused.advance(HIDE_CONTROLS_AFTER_MS + 1);
        assert!(paused.controls_visible());
    }

    #[test]
    fn activity_restarts_the_inactivity_window() {
        let mut state = PlaybackState::new();
        state.toggle_play();
        state.advance(HIDE_CONTROLS_AFTER_MS - 500);
        state.note_activity();
        state.advance(HIDE_CONTROLS_AFTER_MS - 500);
        assert!(state.controls_visible());
        state.advance(1_001);
        assert!(!state.controls_visible());
    }

    #[test]
    fn any_transport_action_reshows_controls() {
        let mut state = PlaybackState::new();
        state.toggle_play();
        state.advance(HIDE_CONTROLS_AFTER_MS + 1);
        assert!(!state.controls_visible());
        state.seek(SEEK_STEP_SECONDS);
        assert!(state.controls_visible());

        state.advance(HIDE_CONTROLS_AFTER_MS + 1);
        state.adjust_volume(-VOLUME_STEP);
        assert!(state.controls_visible());
    }

    #[test]
    fn drag_below_threshold_is_ignored() {
        assert_eq!(interpret_drag(49.0, 0.0), None);
        assert_eq!(interpret_drag(0.0, -49.0), None);
        assert_eq!(interpret_drag(0.0, 0.0), None);
    }

    #[test]
    fn dominant_axis_wins() {
        // Both deltas clear the threshold, but the vertical one dominates.
        assert_eq!(interpret_drag(60.0, -80.0), Some(Gesture::VolumeUp));
        assert_eq!(interpret_drag(-80.0, 60.0), Some(Gesture::SeekBack));
        // Equal magnitudes: neither axis dominates.
        assert_eq!(interpret_drag(60.0, 60.0), None);
    }

    #[test]
    fn swipe_directions_map_intuitively() {
        assert_eq!(interpret_drag(80.0, 0.0), Some(Gesture::SeekForward));
        assert_eq!(interpret_drag(-80.0, 0.0), Some(Gesture::SeekBack));
        // Down lowers volume, up raises it.
        assert_eq!(interpret_drag(0.0, 80.0), Some(Gesture::VolumeDown));
        assert_eq!(interpret_drag(0.0, -80.0), Some(Gesture::VolumeUp));
    }

    #[test]
    fn gestures_apply_their_steps() {
        let mut state = PlaybackState::new();
        state.apply_gesture(Gesture::SeekForward);
        assert_eq!(state.current_time(), SEEK_STEP_SECONDS);
        state.apply_gesture(Gesture::VolumeDown);
        assert!((state.volume() - (1.0 - VOLUME_STEP)).abs() < 1e-9);
    }

    #[test]
    fn track_fraction_clamps_and_handles_degenerate_width() {
        assert_eq!(track_fraction(150.0, 100.0, 200.0), 0.25);
        assert_eq!(track_fraction(50.0, 100.0, 200.0), 0.0);
        assert_eq!(track_fraction(500.0, 100.0, 200.0), 1.0);
        assert_eq!(track_fraction(150.0, 100.0, 0.0), 0.0);
    }

    #[test]
    fn scrub_maps_fraction_onto_duration() {
        let mut state = PlaybackState::new();
        state.scrub_to(0.5);
        assert_eq!(state.current_time(), state.duration() / 2.0);
        state.scrub_to(2.0);
        assert_eq!(state.current_time(), state.duration());
        state.scrub_to(-1.0);
        assert_eq!(state.current_time(), 0.0);
    }

    #[test]
    fn time_formatting_pads_seconds() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.0), "1:05");
        assert_eq!(format_time(300.0), "5:00");
        assert_eq!(format_time(-3.0), "0:00");
    }

    #[test]
    fn progress_percent_clamps() {
        assert_eq!(progress_percent(150.0, 300.0), 50.0);
        assert_eq!(progress_percent(0.0, 0.0), 0.0);
        assert_eq!(progress_percent(400.0, 300.0), 100.0);
    }

    #[test]
    fn volume_icon_thresholds() {
        assert_eq!(VolumeIcon::for_volume(0.0), VolumeIcon::Off);
        assert_eq!(VolumeIcon::for_volume(0.49), VolumeIcon::Down);
        assert_eq!(VolumeIcon::for_volume(0.5), VolumeIcon::Up);
        assert_eq!(VolumeIcon::for_volume(1.0), VolumeIcon::Up);
        assert_eq!(VolumeIcon::Off.glyph(), "volume_off");
    }
}
