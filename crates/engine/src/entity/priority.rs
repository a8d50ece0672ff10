pub const LOWEST: i32 = 0;
pub const LOW: i32 = 5;
pub const NORMAL: i32 = 10;
pub const HIGH: i32 = 15;
pub const HIGHEST: i32 = 20;
pub const DEFAULT_PRIORITY: i32 = NORMAL;

/// Draw and tick ordering key. Higher values draw later, so on top.
///
/// Every write marks the priority dirty; only the registry clears the flag
/// once it has moved the owning entity into the matching bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPriority {
    priority: i32,
    dirty: bool,
}

impl RenderPriority {
    pub const fn new(priority: i32) -> Self {
        Self {
            priority,
            dirty: true,
        }
    }

    pub fn value(&self) -> i32 {
        self.priority
    }

    pub fn set(&mut self, priority: i32) {
        self.priority = priority;
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn clean(&mut self) {
        self.dirty = false;
    }
}

impl Default for RenderPriority {
    fn default() -> Self {
        Self::new(DEFAULT_PRIORITY)
    }
}

impl From<i32> for RenderPriority {
    fn from(priority: i32) -> Self {
        Self::new(priority)
    }
}
