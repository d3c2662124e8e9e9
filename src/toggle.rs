//! Runtime switches for the models and the data log.
//!
//! [`Toggles`] can be flipped from any thread at any time (typically by UI buttons). The frame
//! loop takes one [`ToggleSet`] snapshot at the start of every frame and uses it for the whole
//! frame, so a flip takes effect on the next frame and never tears a frame in half.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Mesh,
    Pose,
    Attributes,
    DataLog,
}

/// Snapshot of all toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleSet {
    pub mesh: bool,
    pub pose: bool,
    pub attributes: bool,
    pub data_log: bool,
}

impl ToggleSet {
    /// Everything enabled.
    pub const ALL: Self = Self {
        mesh: true,
        pose: true,
        attributes: true,
        data_log: true,
    };

    /// Everything disabled.
    pub const NONE: Self = Self {
        mesh: false,
        pose: false,
        attributes: false,
        data_log: false,
    };

    pub fn with(mut self, toggle: Toggle, enabled: bool) -> Self {
        *match toggle {
            Toggle::Mesh => &mut self.mesh,
            Toggle::Pose => &mut self.pose,
            Toggle::Attributes => &mut self.attributes,
            Toggle::DataLog => &mut self.data_log,
        } = enabled;
        self
    }
}

/// All toggles start out enabled.
impl Default for ToggleSet {
    fn default() -> Self {
        Self::ALL
    }
}

/// Shared, externally writable toggles.
///
/// Cloning returns another handle to the same toggles.
#[derive(Clone)]
pub struct Toggles {
    inner: Arc<Inner>,
}

impl Default for Toggles {
    fn default() -> Self {
        Self::new(ToggleSet::default())
    }
}

struct Inner {
    mesh: AtomicBool,
    pose: AtomicBool,
    attributes: AtomicBool,
    data_log: AtomicBool,
}

impl Inner {
    fn flag(&self, toggle: Toggle) -> &AtomicBool {
        match toggle {
            Toggle::Mesh => &self.mesh,
            Toggle::Pose => &self.pose,
            Toggle::Attributes => &self.attributes,
            Toggle::DataLog => &self.data_log,
        }
    }
}

impl Toggles {
    pub fn new(initial: ToggleSet) -> Self {
        Self {
            inner: Arc::new(Inner {
                mesh: AtomicBool::new(initial.mesh),
                pose: AtomicBool::new(initial.pose),
                attributes: AtomicBool::new(initial.attributes),
                data_log: AtomicBool::new(initial.data_log),
            }),
        }
    }

    pub fn get(&self, toggle: Toggle) -> bool {
        self.inner.flag(toggle).load(Ordering::Relaxed)
    }

    pub fn set(&self, toggle: Toggle, enabled: bool) {
        self.inner.flag(toggle).store(enabled, Ordering::Relaxed);
    }

    /// Flips a toggle and returns its new value.
    pub fn toggle(&self, toggle: Toggle) -> bool {
        let new = !self.inner.flag(toggle).fetch_xor(true, Ordering::Relaxed);
        log::debug!("{toggle:?} {}", if new { "enabled" } else { "disabled" });
        new
    }

    /// Reads all toggles.
    ///
    /// The toggles are read one after another, not atomically as a group.
    pub fn snapshot(&self) -> ToggleSet {
        ToggleSet {
            mesh: self.get(Toggle::Mesh),
            pose: self.get(Toggle::Pose),
            attributes: self.get(Toggle::Attributes),
            data_log: self.get(Toggle::DataLog),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips() {
        let toggles = Toggles::new(ToggleSet::ALL);
        assert!(!toggles.toggle(Toggle::Pose));
        assert!(!toggles.get(Toggle::Pose));
        assert!(toggles.toggle(Toggle::Pose));
        assert_eq!(toggles.snapshot(), ToggleSet::ALL);
    }

    #[test]
    fn clones_share_state() {
        let a = Toggles::new(ToggleSet::NONE);
        let b = a.clone();
        b.set(Toggle::Attributes, true);
        assert_eq!(a.snapshot(), ToggleSet::NONE.with(Toggle::Attributes, true));
    }

    #[test]
    fn snapshot_is_detached() {
        let toggles = Toggles::new(ToggleSet::ALL);
        let snapshot = toggles.snapshot();
        toggles.set(Toggle::Mesh, false);
        assert!(snapshot.mesh);
        assert!(!toggles.snapshot().mesh);
    }

    #[test]
    fn everything_enabled_by_default() {
        assert_eq!(Toggles::default().snapshot(), ToggleSet::ALL);
    }
}
