//! One-line transport readout shown in the window title.

use crate::playback::PlaybackState;
use crate::scene::VisualMode;

/// Format seconds as `m:ss`
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Title text for the current state. Zen mode shows only the app name.
pub fn status_line(
    track: Option<&str>,
    state: &PlaybackState,
    mode: VisualMode,
    zen: bool,
) -> String {
    const APP: &str = "vibescope";

    if zen {
        return APP.to_string();
    }
    let Some(track) = track else {
        return format!("{} | drop an audio file | {}", APP, mode);
    };

    format!(
        "{} | {} | {} {} / {} | vol {:.0}%{} | {}",
        APP,
        track,
        if state.is_playing { "▶" } else { "⏸" },
        format_time(state.position_s),
        format_time(state.duration_s),
        state.volume * 100.0,
        if state.is_looping { " | loop" } else { "" },
        mode,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(9.99), "0:09");
        assert_eq!(format_time(65.2), "1:05");
        assert_eq!(format_time(600.0), "10:00");
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(-3.0), "0:00");
    }

    #[test]
    fn test_status_line() {
        let state = PlaybackState {
            is_playing: true,
            is_looping: true,
            volume: 0.5,
            position_s: 75.0,
            duration_s: 200.0,
        };

        let line = status_line(Some("song.mp3"), &state, VisualMode::Chill, false);
        assert_eq!(line, "vibescope | song.mp3 | ▶ 1:15 / 3:20 | vol 50% | loop | chill");

        assert_eq!(status_line(Some("song.mp3"), &state, VisualMode::Chill, true), "vibescope");
        assert!(status_line(None, &state, VisualMode::Bass, false).contains("drop an audio file"));
    }
}
