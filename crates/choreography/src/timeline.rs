use std::time::Duration;

use sceneconfig::Transition;

use crate::ease::Ease;

/// Parameter a tween drives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Track {
    MediaOpacity,
    Distortion,
    BloomStrength,
    Progress,
}

/// Synchronisation point a tween is positioned against.
///
/// `Start` sits at zero. `End` sits where the last `Start` tween (delay
/// included) finishes, so the ramp down only begins once everything launched
/// from `Start` has settled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    Start,
    End,
}

/// Action raised when the tween carrying it completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    /// Rewind the clip, resume playback, and fade it back in.
    ResetMedia,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TweenSpec {
    pub track: Track,
    pub anchor: Anchor,
    pub delay: Duration,
    pub duration: Duration,
    pub from: f32,
    pub to: f32,
    pub ease: Ease,
    pub cue: Option<Cue>,
}

impl TweenSpec {
    pub fn new(
        track: Track,
        anchor: Anchor,
        duration: Duration,
        from: f32,
        to: f32,
        ease: Ease,
    ) -> Self {
        Self {
            track,
            anchor,
            delay: Duration::ZERO,
            duration,
            from,
            to,
            ease,
            cue: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_cue(mut self, cue: Cue) -> Self {
        self.cue = Some(cue);
        self
    }

    fn value_at(&self, elapsed: Duration) -> f32 {
        let t = elapsed.as_secs_f32() / self.duration.as_secs_f32().max(f32::EPSILON);
        self.from + (self.to - self.from) * self.ease.sample(t)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TimelineError {
    #[error("{track:?} tween starting at {start:?} overlaps an earlier {track:?} tween ending at {previous_end:?}")]
    Overlap {
        track: Track,
        start: Duration,
        previous_end: Duration,
    },
    #[error("{track:?} tween has zero duration")]
    ZeroDuration { track: Track },
}

/// Value written to a track during one `advance` call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub track: Track,
    pub value: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimelineStep {
    /// Samples in start order; a later sample for the same track wins.
    pub samples: Vec<Sample>,
    pub cues: Vec<Cue>,
    pub finished: bool,
}

impl TimelineStep {
    pub fn last_value(&self, track: Track) -> Option<f32> {
        self.samples
            .iter()
            .rev()
            .find(|sample| sample.track == track)
            .map(|sample| sample.value)
    }
}

#[derive(Clone, Debug)]
struct ScheduledTween {
    spec: TweenSpec,
    start: Duration,
    completed: bool,
}

impl ScheduledTween {
    fn end(&self) -> Duration {
        self.start + self.spec.duration
    }
}

/// Declarative tween scheduler advanced by frame deltas.
#[derive(Clone, Debug)]
pub struct Timeline {
    tweens: Vec<ScheduledTween>,
    end_anchor: Duration,
    duration: Duration,
    playhead: Duration,
}

impl Timeline {
    pub fn new(specs: Vec<TweenSpec>) -> Result<Self, TimelineError> {
        if let Some(spec) = specs.iter().find(|spec| spec.duration.is_zero()) {
            return Err(TimelineError::ZeroDuration { track: spec.track });
        }

        let end_anchor = specs
            .iter()
            .filter(|spec| spec.anchor == Anchor::Start)
            .map(|spec| spec.delay + spec.duration)
            .max()
            .unwrap_or(Duration::ZERO);

        let mut tweens: Vec<ScheduledTween> = specs
            .into_iter()
            .map(|spec| {
                let anchor = match spec.anchor {
                    Anchor::Start => Duration::ZERO,
                    Anchor::End => end_anchor,
                };
                ScheduledTween {
                    start: anchor + spec.delay,
                    spec,
                    completed: false,
                }
            })
            .collect();
        // Stable sort keeps declaration order for tweens that share a start.
        tweens.sort_by_key(|tween| tween.start);

        for (index, tween) in tweens.iter().enumerate() {
            let previous = tweens[..index]
                .iter()
                .filter(|other| other.spec.track == tween.spec.track)
                .map(ScheduledTween::end)
                .max();
            if let Some(previous_end) = previous {
                if tween.start < previous_end {
                    return Err(TimelineError::Overlap {
                        track: tween.spec.track,
                        start: tween.start,
                        previous_end,
                    });
                }
            }
        }

        let duration = tweens
            .iter()
            .map(ScheduledTween::end)
            .max()
            .unwrap_or(Duration::ZERO);

        Ok(Self {
            tweens,
            end_anchor,
            duration,
            playhead: Duration::ZERO,
        })
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn end_anchor(&self) -> Duration {
        self.end_anchor
    }

    pub fn playhead(&self) -> Duration {
        self.playhead
    }

    pub fn is_finished(&self) -> bool {
        self.playhead >= self.duration
    }

    /// Start and end of the first tween on `track` positioned against `anchor`.
    pub fn span(&self, track: Track, anchor: Anchor) -> Option<(Duration, Duration)> {
        self.tweens
            .iter()
            .find(|tween| tween.spec.track == track && tween.spec.anchor == anchor)
            .map(|tween| (tween.start, tween.end()))
    }

    pub fn restart(&mut self) {
        self.playhead = Duration::ZERO;
        for tween in &mut self.tweens {
            tween.completed = false;
        }
    }

    /// Moves the playhead forward and reports every value the move produced.
    ///
    /// Tweens that have not started yet write nothing. A tween that finishes
    /// during the step writes its exact end value and raises its cue once, even
    /// if the step jumped past it entirely.
    pub fn advance(&mut self, delta: Duration) -> TimelineStep {
        self.playhead = (self.playhead + delta).min(self.duration);
        let mut step = TimelineStep::default();

        for tween in &mut self.tweens {
            if tween.completed || self.playhead < tween.start {
                continue;
            }
            let elapsed = self.playhead - tween.start;
            let value = if elapsed >= tween.spec.duration {
                tween.completed = true;
                if let Some(cue) = tween.spec.cue {
                    step.cues.push(cue);
                }
                tween.spec.to
            } else {
                tween.spec.value_at(elapsed)
            };
            step.samples.push(Sample {
                track: tween.spec.track,
                value,
            });
        }

        step.finished = self.is_finished();
        step
    }
}

#[cfg(test)]
impl Timeline {
    /// Number of tweens on `track` that are mid-flight at the playhead.
    fn active_on(&self, track: Track) -> usize {
        self.tweens
            .iter()
            .filter(|tween| {
                tween.spec.track == track
                    && tween.start <= self.playhead
                    && self.playhead < tween.end()
            })
            .count()
    }
}

/// The loop transition as a declarative tween list.
///
/// Video fade, distortion and bloom ramps, and the delayed cross-fade share the
/// `Start` anchor; the symmetric ramp down sits on `End` and the bloom return
/// carries the cue that hands playback back to the clip. Bloom leaves from and
/// returns to `bloom_rest`, the strength the scene idles at.
pub fn transition_script(config: &Transition, bloom_rest: f32) -> Vec<TweenSpec> {
    vec![
        TweenSpec::new(
            Track::MediaOpacity,
            Anchor::Start,
            config.video_fade,
            1.0,
            0.0,
            Ease::QuadOut,
        ),
        TweenSpec::new(
            Track::Distortion,
            Anchor::Start,
            config.ramp,
            0.0,
            config.distortion_peak,
            Ease::CubicInOut,
        ),
        TweenSpec::new(
            Track::BloomStrength,
            Anchor::Start,
            config.ramp,
            bloom_rest,
            config.bloom_peak,
            Ease::CubicIn,
        ),
        TweenSpec::new(
            Track::Progress,
            Anchor::Start,
            config.crossfade,
            0.0,
            1.0,
            Ease::CubicInOut,
        )
        .delayed(config.crossfade_delay),
        TweenSpec::new(
            Track::Distortion,
            Anchor::End,
            config.ramp,
            config.distortion_peak,
            0.0,
            Ease::CubicInOut,
        ),
        TweenSpec::new(
            Track::BloomStrength,
            Anchor::End,
            config.ramp,
            config.bloom_peak,
            bloom_rest,
            Ease::CubicOut,
        )
        .with_cue(Cue::ResetMedia),
    ]
}
