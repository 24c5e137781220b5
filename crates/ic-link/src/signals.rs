/// Stick deflection past which steering cancels the opposite indicator.
pub const STEER_CANCEL_THRESHOLD: f64 = 0.3;

/// Controller-side indicator state. Keeps at most one side lit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurnSignals {
    pub left: bool,
    pub right: bool,
}

impl TurnSignals {
    pub fn toggle_left(&mut self) -> (bool, bool) {
        self.left = !self.left;
        if self.left {
            self.right = false;
        }
        self.pair()
    }

    pub fn toggle_right(&mut self) -> (bool, bool) {
        self.right = !self.right;
        if self.right {
            self.left = false;
        }
        self.pair()
    }

    /// Applies a steering stick position in [-1, 1]. Returns true when an
    /// indicator was cancelled and the new pair should be pushed.
    pub fn on_steering(&mut self, x: f64) -> bool {
        if x < -STEER_CANCEL_THRESHOLD && self.right {
            self.right = false;
            true
        } else if x > STEER_CANCEL_THRESHOLD && self.left {
            self.left = false;
            true
        } else {
            false
        }
    }

    pub fn off(&mut self) -> (bool, bool) {
        *self = Self::default();
        self.pair()
    }

    pub fn pair(&self) -> (bool, bool) {
        (self.left, self.right)
    }
}

/// Controller inputs that touch the indicators.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Input {
    LeftButton,
    RightButton,
    Steer(f64),
    AllOff,
}

impl TurnSignals {
    /// Feeds one input through the rule. Returns the pair to push, or
    /// `None` when nothing changed.
    pub fn apply(&mut self, input: Input) -> Option<(bool, bool)> {
        match input {
            Input::LeftButton => Some(self.toggle_left()),
            Input::RightButton => Some(self.toggle_right()),
            Input::Steer(x) => self.on_steering(x).then(|| self.pair()),
            Input::AllOff => Some(self.off()),
        }
    }
}

/// Bench sequence for checking the dashboard's indicators by eye.
pub fn demo_script() -> Vec<(Input, &'static str)> {
    vec![
        (Input::AllOff, "all off"),
        (Input::LeftButton, "left on"),
        (Input::LeftButton, "left off"),
        (Input::RightButton, "right on"),
        (Input::RightButton, "right off"),
        (Input::LeftButton, "left on again"),
        (Input::RightButton, "switch to right, left goes off"),
        (Input::AllOff, "all off"),
        (Input::LeftButton, "L1 pressed"),
        (Input::Steer(0.8), "steer right, cancels left"),
        (Input::RightButton, "R1 pressed"),
        (Input::Steer(-0.8), "steer left, cancels right"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_one_side_clears_the_other() {
        let mut s = TurnSignals::default();
        assert_eq!(s.toggle_left(), (true, false));
        assert_eq!(s.toggle_right(), (false, true));
        assert_eq!(s.toggle_right(), (false, false));
        assert_eq!(s.toggle_left(), (true, false));
        assert_eq!(s.toggle_left(), (false, false));
    }

    #[test]
    fn steering_away_cancels_indicator() {
        let mut s = TurnSignals { left: false, right: true };
        assert!(!s.on_steering(-0.2));
        assert!(s.right);
        assert!(s.on_steering(-0.5));
        assert_eq!(s.pair(), (false, false));

        let mut s = TurnSignals { left: true, right: false };
        assert!(!s.on_steering(-0.9));
        assert!(s.on_steering(0.31));
        assert!(!s.left);
    }

    #[test]
    fn threshold_itself_does_not_cancel() {
        let mut s = TurnSignals { left: true, right: false };
        assert!(!s.on_steering(STEER_CANCEL_THRESHOLD));
        assert!(s.left);
    }

    #[test]
    fn off_clears_both() {
        let mut s = TurnSignals { left: true, right: false };
        assert_eq!(s.off(), (false, false));
    }

    #[test]
    fn demo_script_never_lights_both() {
        let mut s = TurnSignals::default();
        let pushed: Vec<_> = demo_script().into_iter().filter_map(|(i, _)| s.apply(i)).collect();
        assert!(pushed.iter().all(|&(l, r)| !(l && r)));
        assert_eq!(pushed[6], (false, true));
        assert_eq!(pushed.last(), Some(&(false, false)));
        assert_eq!(pushed.len(), 12);
    }

    #[test]
    fn steering_without_lit_side_pushes_nothing() {
        let mut s = TurnSignals::default();
        assert_eq!(s.apply(Input::Steer(1.0)), None);
    }
}
