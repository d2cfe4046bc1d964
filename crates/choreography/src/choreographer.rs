use std::time::Duration;

use crossbeam_channel::Receiver;
use sceneconfig::Transition;

use crate::ease::Ease;
use crate::media::{MediaElement, MediaEvent};
use crate::timeline::{
    transition_script, Anchor, Cue, Timeline, TimelineError, TimelineStep, Track, TweenSpec,
};

/// Where the choreographer is within one loop transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    FadingOutVideo,
    DistortingIn,
    Blending,
    DistortingOut,
    Resetting,
}

/// Receiver for the non-media tracks; implemented by the renderer's uniform
/// and bloom state.
pub trait ParameterSink {
    fn set_distortion(&mut self, value: f32);
    fn set_bloom_strength(&mut self, value: f32);
    fn set_progress(&mut self, value: f32);
}

#[derive(Clone, Copy, Debug)]
struct PhaseMarks {
    fade_out_end: Duration,
    blend_start: Duration,
    blend_end: Duration,
}

impl PhaseMarks {
    fn from_timeline(timeline: &Timeline) -> Self {
        let fade_out_end = timeline
            .span(Track::MediaOpacity, Anchor::Start)
            .map(|(_, end)| end)
            .unwrap_or(Duration::ZERO);
        let (blend_start, blend_end) = timeline
            .span(Track::Progress, Anchor::Start)
            .unwrap_or((timeline.end_anchor(), timeline.end_anchor()));
        Self {
            fade_out_end,
            blend_start,
            blend_end,
        }
    }

    fn phase_at(&self, playhead: Duration) -> Phase {
        if playhead < self.fade_out_end {
            Phase::FadingOutVideo
        } else if playhead < self.blend_start {
            Phase::DistortingIn
        } else if playhead < self.blend_end {
            Phase::Blending
        } else {
            Phase::DistortingOut
        }
    }
}

/// Runs one transition per accepted `ended` event.
///
/// Events are only accepted while armed. Arming is cleared when a transition
/// starts and restored as soon as the clip is rewound and playing again, so
/// events raised mid-transition are dropped rather than queued. The clip
/// fade-in that follows is a plain opacity tween; an `ended` arriving during it
/// starts the next transition straight away.
#[derive(Debug)]
pub struct Choreographer {
    timeline: Timeline,
    fade_in: Timeline,
    marks: PhaseMarks,
    phase: Phase,
    armed: bool,
    fresh: bool,
    /// Progress still has to drop back to zero after the last transition.
    settling: bool,
    cycles: u64,
}

impl Choreographer {
    pub fn new(script: Vec<TweenSpec>, fade_in: Duration) -> Result<Self, TimelineError> {
        let timeline = Timeline::new(script)?;
        let fade_in = Timeline::new(vec![TweenSpec::new(
            Track::MediaOpacity,
            Anchor::Start,
            fade_in,
            0.0,
            1.0,
            Ease::QuadOut,
        )])?;
        let marks = PhaseMarks::from_timeline(&timeline);
        Ok(Self {
            timeline,
            fade_in,
            marks,
            phase: Phase::Idle,
            armed: true,
            fresh: false,
            settling: false,
            cycles: 0,
        })
    }

    /// Builds the loop transition; bloom ramps out of and back to `bloom_rest`.
    pub fn from_config(config: &Transition, bloom_rest: f32) -> Result<Self, TimelineError> {
        Self::new(transition_script(config, bloom_rest), config.video_fade)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles
    }

    pub fn transition_length(&self) -> Duration {
        self.timeline.duration() + self.fade_in.duration()
    }

    /// Starts a transition if armed. Returns whether the event was accepted.
    pub fn on_media_ended(&mut self) -> bool {
        if !self.armed {
            tracing::debug!(phase = ?self.phase, "ended event ignored while transition runs");
            return false;
        }
        self.armed = false;
        self.fresh = true;
        self.timeline.restart();
        self.phase = Phase::FadingOutVideo;
        tracing::info!(cycle = self.cycles + 1, "clip ended; starting transition");
        true
    }

    /// Feeds every pending media event through `on_media_ended`.
    pub fn drain_events(&mut self, events: &Receiver<MediaEvent>) -> usize {
        events
            .try_iter()
            .filter(|event| match event {
                MediaEvent::Ended => self.on_media_ended(),
            })
            .count()
    }

    /// Advances the running transition by `delta` and applies its values.
    pub fn advance<M, S>(&mut self, delta: Duration, media: &mut M, sink: &mut S)
    where
        M: MediaElement + ?Sized,
        S: ParameterSink + ?Sized,
    {
        // The first step after a (re)start samples the from-values.
        let delta = if std::mem::take(&mut self.fresh) {
            Duration::ZERO
        } else {
            delta
        };

        // A transition started during the fade-in skips `settle`.
        if self.settling && self.phase != Phase::Resetting {
            sink.set_progress(0.0);
            self.settling = false;
        }

        match self.phase {
            Phase::Idle => {}
            Phase::Resetting => {
                let step = self.fade_in.advance(delta);
                apply(&step, media, sink);
                if step.finished {
                    self.settle(media, sink);
                }
            }
            _ => {
                let step = self.timeline.advance(delta);
                apply(&step, media, sink);
                self.phase = self.marks.phase_at(self.timeline.playhead());
                for cue in &step.cues {
                    match cue {
                        Cue::ResetMedia => self.reset_media(media),
                    }
                }
            }
        }
    }

    fn reset_media<M: MediaElement + ?Sized>(&mut self, media: &mut M) {
        media.set_current_time(Duration::ZERO);
        media.play();
        self.fade_in.restart();
        self.fresh = true;
        self.phase = Phase::Resetting;
        self.armed = true;
        self.settling = true;
        self.cycles += 1;
        tracing::info!(cycles = self.cycles, "transition complete; clip restarted");
    }

    fn settle<M, S>(&mut self, media: &mut M, sink: &mut S)
    where
        M: MediaElement + ?Sized,
        S: ParameterSink + ?Sized,
    {
        media.set_opacity(1.0);
        sink.set_progress(0.0);
        self.settling = false;
        self.phase = Phase::Idle;
        tracing::debug!("clip faded back in; idle");
    }
}

fn apply<M, S>(step: &TimelineStep, media: &mut M, sink: &mut S)
where
    M: MediaElement + ?Sized,
    S: ParameterSink + ?Sized,
{
    for sample in &step.samples {
        match sample.track {
            Track::MediaOpacity => media.set_opacity(sample.value),
            Track::Distortion => sink.set_distortion(sample.value),
            Track::BloomStrength => sink.set_bloom_strength(sample.value),
            Track::Progress => sink.set_progress(sample.value),
        }
    }
}
