/// Panel geometry of the player, in terminal columns.
///
/// Kept apart from progression state: nothing here is read by the
/// controller, and nothing in the controller is stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutState {
    sidebar_width: u16,
    chat_width: u16,
    chat_open: bool,
}

impl LayoutState {
    pub const SIDEBAR_MIN: u16 = 16;
    pub const SIDEBAR_MAX: u16 = 60;
    pub const SIDEBAR_DEFAULT: u16 = 32;
    pub const CHAT_MIN: u16 = 24;
    pub const CHAT_MAX: u16 = 80;
    pub const CHAT_DEFAULT: u16 = 40;

    #[must_use]
    pub fn new() -> Self {
        Self {
            sidebar_width: Self::SIDEBAR_DEFAULT,
            chat_width: Self::CHAT_DEFAULT,
            chat_open: false,
        }
    }

    #[must_use]
    pub fn sidebar_width(&self) -> u16 {
        self.sidebar_width
    }

    #[must_use]
    pub fn chat_width(&self) -> u16 {
        self.chat_width
    }

    #[must_use]
    pub fn chat_open(&self) -> bool {
        self.chat_open
    }

    /// Returns the width actually applied.
    pub fn resize_sidebar(&mut self, width: u16) -> u16 {
        self.sidebar_width = width.clamp(Self::SIDEBAR_MIN, Self::SIDEBAR_MAX);
        self.sidebar_width
    }

    /// Returns the width actually applied.
    pub fn resize_chat(&mut self, width: u16) -> u16 {
        self.chat_width = width.clamp(Self::CHAT_MIN, Self::CHAT_MAX);
        self.chat_width
    }

    pub fn toggle_chat(&mut self) -> bool {
        self.chat_open = !self.chat_open;
        self.chat_open
    }
}

impl Default for LayoutState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_are_clamped() {
        let mut layout = LayoutState::new();
        assert_eq!(layout.resize_sidebar(2), LayoutState::SIDEBAR_MIN);
        assert_eq!(layout.resize_sidebar(500), LayoutState::SIDEBAR_MAX);
        assert_eq!(layout.resize_sidebar(40), 40);
        assert_eq!(layout.resize_chat(0), LayoutState::CHAT_MIN);
        assert_eq!(layout.resize_chat(u16::MAX), LayoutState::CHAT_MAX);
    }

    #[test]
    fn chat_toggles() {
        let mut layout = LayoutState::default();
        assert!(!layout.chat_open());
        assert!(layout.toggle_chat());
        assert!(!layout.toggle_chat());
    }
}
