//! Slider-driven adjustments.
//!
//! Every slider ranges 0..=100 and rests at 50. Moving a slider does not
//! touch the image; [`SliderBank::pending_chain`] turns the movement since the
//! last commit into a chain of delta effects, so repeated applies never
//! double-count earlier adjustments.

use crate::effects::{Effect, EffectChain};

pub const SLIDER_MIN: i32 = 0;
pub const SLIDER_MAX: i32 = 100;
pub const SLIDER_NEUTRAL: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slider {
    Brightness,
    Contrast,
    Red,
    Green,
    Blue,
}

impl Slider {
    /// Apply order: brightness/contrast tab first, then the RGB tab.
    pub const ALL: [Slider; 5] = [
        Slider::Brightness,
        Slider::Contrast,
        Slider::Red,
        Slider::Green,
        Slider::Blue,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn effect(self, factor: i32) -> Effect {
        match self {
            Self::Brightness => Effect::Brightness { factor },
            Self::Contrast => Effect::Contrast { factor },
            Self::Red => Effect::Red { factor },
            Self::Green => Effect::Green { factor },
            Self::Blue => Effect::Blue { factor },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SliderState {
    value: i32,
    applied: i32,
}

impl Default for SliderState {
    fn default() -> Self {
        Self {
            value: SLIDER_NEUTRAL,
            applied: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SliderBank {
    states: [SliderState; 5],
}

impl SliderBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move a slider. Values outside 0..=100 are clamped.
    pub fn set(&mut self, slider: Slider, value: i32) {
        self.states[slider.index()].value = value.clamp(SLIDER_MIN, SLIDER_MAX);
    }

    pub fn value(&self, slider: Slider) -> i32 {
        self.states[slider.index()].value
    }

    /// Offset not yet applied to the image.
    pub fn delta(&self, slider: Slider) -> i32 {
        let state = self.states[slider.index()];
        state.value - SLIDER_NEUTRAL - state.applied
    }

    pub fn is_dirty(&self) -> bool {
        Slider::ALL.iter().any(|&slider| self.delta(slider) != 0)
    }

    /// One delta effect per slider that moved since the last commit.
    pub fn pending_chain(&self) -> EffectChain {
        Slider::ALL
            .iter()
            .filter_map(|&slider| {
                let delta = self.delta(slider);
                (delta != 0).then(|| slider.effect(delta))
            })
            .collect()
    }

    /// Record the pending deltas as applied.
    pub fn commit(&mut self) {
        for state in &mut self.states {
            state.applied = state.value - SLIDER_NEUTRAL;
        }
    }

    /// Back to neutral with nothing applied, e.g. after reverting the image.
    pub fn reset(&mut self) {
        self.states = Default::default();
    }
}
