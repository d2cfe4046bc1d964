use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaEvent {
    Ended,
}

pub fn media_channel() -> (Sender<MediaEvent>, Receiver<MediaEvent>) {
    crossbeam_channel::unbounded()
}

/// Playback surface the choreographer drives during a transition.
pub trait MediaElement {
    fn play(&mut self);
    fn is_playing(&self) -> bool;
    fn current_time(&self) -> Duration;
    fn set_current_time(&mut self, time: Duration);
    fn opacity(&self) -> f32;
    fn set_opacity(&mut self, opacity: f32);
}

/// Clip clock advanced by the render loop.
///
/// Reaching the end pauses playback and sends a single `Ended`; seeking back
/// before the end allows the next one.
#[derive(Debug)]
pub struct ClipPlayer {
    duration: Duration,
    position: Duration,
    playing: bool,
    opacity: f32,
    ended_sent: bool,
    events: Sender<MediaEvent>,
}

impl ClipPlayer {
    pub fn new(duration: Duration, events: Sender<MediaEvent>) -> Self {
        Self {
            duration,
            position: Duration::ZERO,
            playing: true,
            opacity: 1.0,
            ended_sent: false,
            events,
        }
    }

    pub fn tick(&mut self, delta: Duration) {
        if !self.playing {
            return;
        }
        self.position = (self.position + delta).min(self.duration);
        if self.position >= self.duration && !self.ended_sent {
            self.playing = false;
            self.ended_sent = true;
            if self.events.send(MediaEvent::Ended).is_err() {
                tracing::debug!("media event receiver dropped; ended event discarded");
            }
        }
    }

    /// Fire `Ended` immediately, as if playback had just run out.
    pub fn finish(&mut self) {
        let remaining = self.duration.saturating_sub(self.position);
        self.playing = true;
        self.tick(remaining);
    }

    /// Index into a frame sequence of `frame_count` images played at `fps`.
    pub fn frame_index(&self, fps: f32, frame_count: usize) -> usize {
        if frame_count == 0 {
            return 0;
        }
        let index = (self.position.as_secs_f32() * fps.max(0.0)).floor() as usize;
        index.min(frame_count - 1)
    }
}

impl MediaElement for ClipPlayer {
    fn play(&mut self) {
        self.playing = true;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn current_time(&self) -> Duration {
        self.position
    }

    fn set_current_time(&mut self, time: Duration) {
        self.position = time.min(self.duration);
        if self.position < self.duration {
            self.ended_sent = false;
        }
    }

    fn opacity(&self) -> f32 {
        self.opacity
    }

    fn set_opacity(&mut self, opacity: f32) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ended_is_sent_once_per_playthrough() {
        let (tx, rx) = media_channel();
        let mut clip = ClipPlayer::new(Duration::from_secs(1), tx);
        for _ in 0..30 {
            clip.tick(Duration::from_millis(50));
        }
        assert_eq!(rx.try_iter().count(), 1);
        assert!(!clip.is_playing());
        assert_eq!(clip.current_time(), Duration::from_secs(1));

        clip.set_current_time(Duration::ZERO);
        clip.play();
        clip.tick(Duration::from_secs(2));
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[test]
    fn ended_clip_holds_until_played_again() {
        let (tx, rx) = media_channel();
        let mut clip = ClipPlayer::new(Duration::from_secs(1), tx);
        clip.tick(Duration::from_secs(1));
        assert_eq!(rx.try_iter().count(), 1);

        clip.set_current_time(Duration::ZERO);
        clip.tick(Duration::from_secs(5));
        assert_eq!(clip.current_time(), Duration::ZERO);
        assert!(rx.is_empty());
    }

    #[test]
    fn finish_fires_ended_immediately() {
        let (tx, rx) = media_channel();
        let mut clip = ClipPlayer::new(Duration::from_secs(6), tx);
        clip.finish();
        assert_eq!(rx.try_recv().ok(), Some(MediaEvent::Ended));
    }

    #[test]
    fn frame_index_is_clamped_to_sequence() {
        let (tx, _rx) = media_channel();
        let mut clip = ClipPlayer::new(Duration::from_secs(2), tx);
        assert_eq!(clip.frame_index(30.0, 10), 0);
        clip.set_current_time(Duration::from_millis(200));
        assert_eq!(clip.frame_index(30.0, 10), 6);
        clip.set_current_time(Duration::from_secs(2));
        assert_eq!(clip.frame_index(30.0, 10), 9);
        assert_eq!(clip.frame_index(30.0, 0), 0);
    }

    #[test]
    fn opacity_is_clamped() {
        let (tx, _rx) = media_channel();
        let mut clip = ClipPlayer::new(Duration::from_secs(1), tx);
        clip.set_opacity(1.5);
        assert_eq!(clip.opacity(), 1.0);
        clip.set_opacity(-0.2);
        assert_eq!(clip.opacity(), 0.0);
    }
}
