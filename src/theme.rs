use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::remote::Subscription;

pub type ThemeHandler = Rc<dyn Fn(ThemeMode)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    pub fn flipped(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        matches!(self, Self::Dark)
    }
}

/// Host OS light/dark preference: current value plus change notifications.
pub trait PreferenceSignal {
    fn current(&self) -> ThemeMode;
    fn on_change(&self, handler: ThemeHandler) -> Subscription;
}

/// Process-wide theme flag, seeded from the host preference. A host
/// preference change overwrites an explicit toggle: last writer wins.
pub struct ThemeState {
    mode: Rc<Cell<ThemeMode>>,
    _watch: Subscription,
}

impl ThemeState {
    pub fn new(signal: &dyn PreferenceSignal) -> Self {
        let mode = Rc::new(Cell::new(signal.current()));
        let watch = signal.on_change({
            let mode = mode.clone();
            Rc::new(move |new_mode| mode.set(new_mode))
        });
        Self {
            mode,
            _watch: watch,
        }
    }

    pub fn mode(&self) -> ThemeMode {
        self.mode.get()
    }

    pub fn toggle(&self) {
        self.mode.set(self.mode.get().flipped());
    }
}
