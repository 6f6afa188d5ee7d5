use constants::render_settings::DEFAULT_ANIMATION_TIME;

/// Which array the work set is blended away from and towards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AnimationDirection {
    #[default]
    RgbToHsv,
    HsvToRgb,
}

impl AnimationDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::RgbToHsv => Self::HsvToRgb,
            Self::HsvToRgb => Self::RgbToHsv,
        }
    }

    /// Colour space the work set ends up in once the transition completes.
    pub fn destination(self) -> ColourSpace {
        match self {
            Self::RgbToHsv => ColourSpace::Hsv,
            Self::HsvToRgb => ColourSpace::Rgb,
        }
    }

    /// Value packed into the animation kernel's uniform block.
    pub(crate) fn as_gpu_flag(self) -> u32 {
        match self {
            Self::RgbToHsv => 0,
            Self::HsvToRgb => 1,
        }
    }
}

/// Layout the markers are (or are heading) in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColourSpace {
    #[default]
    Rgb,
    Hsv,
}

impl ColourSpace {
    pub fn toggled(self) -> Self {
        match self {
            Self::Rgb => Self::Hsv,
            Self::Hsv => Self::Rgb,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Rgb => "RGB",
            Self::Hsv => "HSV",
        }
    }
}

/// What the animator should do this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationStep {
    pub direction: AnimationDirection,
    /// Linear progress in `0.0..=1.0`.
    pub t: f32,
    /// Eased blend weight handed to the kernel.
    pub weight: f32,
    /// Last step of the transition; the work set must equal the destination array.
    pub finished: bool,
}

/// Idle/Running state machine for one RGB <-> HSV transition.
///
/// `t` and `elapsed` only advance while running and are back at zero whenever the machine is idle.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationState {
    direction: AnimationDirection,
    colour_space: ColourSpace,
    running: bool,
    t: f32,
    elapsed: f32,
    duration: f32,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self::new(DEFAULT_ANIMATION_TIME)
    }
}

impl AnimationState {
    pub fn new(duration: f32) -> Self {
        Self {
            direction: AnimationDirection::default(),
            colour_space: ColourSpace::default(),
            running: false,
            t: 0.0,
            elapsed: 0.0,
            duration,
        }
    }

    /// Idle -> Running. Returns `false` and changes nothing if a transition is already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.t = 0.0;
        self.elapsed = 0.0;
        self.colour_space = self.colour_space.toggled();
        true
    }

    /// Advances a running transition by `delta_secs`.
    ///
    /// The step that reaches `t == 1` is returned with `finished` set, after which the machine
    /// is idle again with the direction flipped for the next start.
    pub fn tick(&mut self, delta_secs: f32) -> Option<AnimationStep> {
        if !self.running {
            return None;
        }

        self.elapsed += delta_secs.max(0.0);
        self.t = if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        };

        let step = AnimationStep {
            direction: self.direction,
            t: self.t,
            weight: ease(self.t),
            finished: self.t >= 1.0,
        };

        if step.finished {
            self.running = false;
            self.t = 0.0;
            self.elapsed = 0.0;
            self.direction = self.direction.flipped();
        }

        Some(step)
    }

    /// Back to the post-load state: idle, RGB layout, heading for HSV.
    pub fn reset(&mut self) {
        *self = Self::new(self.duration);
    }

    pub fn set_duration(&mut self, duration: f32) {
        self.duration = duration;
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn direction(&self) -> AnimationDirection {
        self.direction
    }

    pub fn colour_space(&self) -> ColourSpace {
        self.colour_space
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn t(&self) -> f32 {
        self.t
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

/// Smoothstep easing. Fixes both endpoints exactly and never decreases between them.
///
/// Evaluated in f64, where `t * t` is exact for any f32 `t` and the product rounds once, so
/// the result stays monotonic after narrowing back to f32.
pub fn ease(t: f32) -> f32 {
    let t = f64::from(t.clamp(0.0, 1.0));
    (t * t * (3.0 - 2.0 * t)) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_in_rgb() {
        let state = AnimationState::default();
        assert!(!state.is_running());
        assert_eq!(state.colour_space(), ColourSpace::Rgb);
        assert_eq!(state.direction(), AnimationDirection::RgbToHsv);
        assert_eq!((state.t(), state.elapsed()), (0.0, 0.0));
    }

    #[test]
    fn idle_ticks_do_nothing() {
        let mut state = AnimationState::new(1.0);
        assert_eq!(state.tick(0.5), None);
        assert_eq!(state.elapsed(), 0.0);
    }

    #[test]
    fn start_toggles_colour_space_once() {
        let mut state = AnimationState::new(1.0);
        assert!(state.start());
        assert_eq!(state.colour_space(), ColourSpace::Hsv);

        // A second start while running is ignored.
        assert!(!state.start());
        assert_eq!(state.colour_space(), ColourSpace::Hsv);
    }

    #[test]
    fn runs_to_completion_and_flips_direction() {
        let mut state = AnimationState::new(1.0);
        state.start();

        let first = state.tick(0.25).unwrap();
        assert_eq!(first.direction, AnimationDirection::RgbToHsv);
        assert!((first.t - 0.25).abs() < 1e-6);
        assert!(!first.finished);

        let last = state.tick(1.0).unwrap();
        assert_eq!(last.t, 1.0);
        assert_eq!(last.weight, 1.0);
        assert!(last.finished);

        assert!(!state.is_running());
        assert_eq!((state.t(), state.elapsed()), (0.0, 0.0));
        assert_eq!(state.direction(), AnimationDirection::HsvToRgb);
        assert_eq!(state.colour_space(), AnimationDirection::RgbToHsv.destination());
    }

    #[test]
    fn zero_duration_finishes_on_the_first_tick() {
        let mut state = AnimationState::new(0.0);
        state.start();
        let step = state.tick(0.0).unwrap();
        assert!(step.finished);
        assert_eq!(step.weight, 1.0);
    }

    #[test]
    fn reset_restores_the_post_load_state() {
        let mut state = AnimationState::new(3.0);
        state.start();
        state.tick(1.0);
        state.reset();

        assert_eq!(state, AnimationState::new(3.0));
    }

    #[test]
    fn easing_is_monotonic_with_exact_endpoints() {
        assert_eq!(ease(0.0), 0.0);
        assert_eq!(ease(1.0), 1.0);
        let mut previous = 0.0;
        for i in 1..=100 {
            let weight = ease(i as f32 / 100.0);
            assert!(weight >= previous);
            previous = weight;
        }
    }

    #[test]
    fn easing_never_steps_back_at_fine_resolution() {
        let mut previous = ease(0.0);
        for i in 1..=1_000_000 {
            let t = i as f32 * 1e-6;
            let weight = ease(t);
            assert!(weight >= previous, "ease({t}) = {weight} < {previous}");
            previous = weight;
        }

        // Adjacent f32 inputs around the midpoint, where the slope is steepest.
        let mut t = 0.5f32;
        let mut previous = ease(t);
        for _ in 0..10_000 {
            t = f32::from_bits(t.to_bits() + 1);
            let weight = ease(t);
            assert!(weight >= previous);
            previous = weight;
        }
    }
}
