//! Timeline-driven choreography for the loop transition.
//!
//! The crate is GPU-free so every timing rule can be exercised in unit tests:
//! - `ease` holds the easing curves tweens are sampled through.
//! - `timeline` turns a declarative list of tweens (track, anchor, delay,
//!   duration, endpoints, easing, optional completion cue) into a scheduler
//!   that is advanced one frame delta at a time.
//! - `media` describes the clip collaborator and ships a deterministic
//!   `ClipPlayer` that reports the end of playback over a channel.
//! - `choreographer` is the state machine that arms on idle, starts one
//!   transition per `ended` event, and routes tween samples to the shader
//!   uniforms, the bloom pass, and the clip.

mod choreographer;
mod ease;
mod media;
mod timeline;

pub use choreographer::{Choreographer, ParameterSink, Phase};
pub use ease::Ease;
pub use media::{media_channel, ClipPlayer, MediaElement, MediaEvent};
pub use timeline::{
    transition_script, Anchor, Cue, Sample, Timeline, TimelineError, TimelineStep, Track,
    TweenSpec,
};
