use serde::{Deserialize, Serialize};

use crate::geometry::{Position, Size};

/// The overlay windows managed around the pet. Each kind maps to exactly one
/// native window label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowKind {
    #[serde(rename = "menu")]
    Menu,
    #[serde(rename = "clipboard")]
    ClipboardHistory,
    #[serde(rename = "preferences")]
    Preferences,
    #[serde(rename = "aiAgent")]
    AiAssistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowMode {
    /// Re-placed against the anchor every time the pet moves.
    Anchor,
    /// Placed once at creation, then an ordinary movable window.
    Independent,
}

/// Fixed creation parameters for a window kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KindProfile {
    pub route: &'static str,
    pub title: &'static str,
    pub size: Size,
    pub resizable: bool,
    pub decorations: bool,
    pub always_on_top: bool,
    pub skip_taskbar: bool,
    pub focus: bool,
    pub transparent: bool,
    pub follow: FollowMode,
    /// Query key used for sub-navigation targets.
    pub target_key: &'static str,
}

/// Everything the native layer needs to build one window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
    pub url: String,
    pub title: String,
    pub size: Size,
    pub position: Position,
    pub resizable: bool,
    pub decorations: bool,
    pub always_on_top: bool,
    pub skip_taskbar: bool,
    pub focus: bool,
    pub transparent: bool,
}

pub const PREFERENCES_STATE_KEY: &str = "preferencesWindowState";
pub const CLIPBOARD_STATE_KEY: &str = "clipboardWindowState";
pub const AI_HEIGHT_KEY: &str = "aiWindowHeight";

impl WindowKind {
    pub const ALL: [WindowKind; 4] = [
        WindowKind::Menu,
        WindowKind::ClipboardHistory,
        WindowKind::Preferences,
        WindowKind::AiAssistant,
    ];

    /// Canonical id, also used as the native window label.
    pub fn id(self) -> &'static str {
        match self {
            WindowKind::Menu => "menu",
            WindowKind::ClipboardHistory => "clipboard",
            WindowKind::Preferences => "preferences",
            WindowKind::AiAssistant => "aiAgent",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    pub fn profile(self) -> KindProfile {
        match self {
            WindowKind::Menu => KindProfile {
                route: "/menu",
                title: "Menu",
                size: Size::new(300.0, 350.0),
                resizable: false,
                decorations: false,
                always_on_top: true,
                skip_taskbar: true,
                focus: true,
                transparent: true,
                follow: FollowMode::Anchor,
                target_key: "target",
            },
            WindowKind::ClipboardHistory => KindProfile {
                route: "/clipboardapp",
                title: "Clipboard",
                size: Size::new(400.0, 600.0),
                resizable: true,
                decorations: false,
                always_on_top: true,
                skip_taskbar: true,
                focus: true,
                transparent: false,
                follow: FollowMode::Independent,
                target_key: "category",
            },
            WindowKind::Preferences => KindProfile {
                route: "/preferences",
                title: "Preferences",
                size: Size::new(800.0, 580.0),
                resizable: true,
                decorations: true,
                always_on_top: false,
                skip_taskbar: false,
                focus: true,
                transparent: false,
                follow: FollowMode::Independent,
                target_key: "nav",
            },
            WindowKind::AiAssistant => KindProfile {
                route: "/aiagent",
                title: "AI Assistant",
                size: Size::new(360.0, 70.0),
                resizable: false,
                decorations: false,
                always_on_top: true,
                skip_taskbar: true,
                focus: true,
                transparent: true,
                follow: FollowMode::Anchor,
                target_key: "target",
            },
        }
    }

    pub fn follows_anchor(self) -> bool {
        self.profile().follow == FollowMode::Anchor
    }

    /// Store key for kinds whose full geometry survives a restart.
    pub fn geometry_key(self) -> Option<&'static str> {
        match self {
            WindowKind::ClipboardHistory => Some(CLIPBOARD_STATE_KEY),
            WindowKind::Preferences => Some(PREFERENCES_STATE_KEY),
            WindowKind::Menu | WindowKind::AiAssistant => None,
        }
    }

    /// Route including an optional, URL-encoded sub-navigation target.
    pub fn url(self, target: Option<&str>) -> String {
        let profile = self.profile();
        match target.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => {
                let encoded: String =
                    url::form_urlencoded::byte_serialize(value.as_bytes()).collect();
                format!("{}?{}={}", profile.route, profile.target_key, encoded)
            }
            None => profile.route.to_string(),
        }
    }

    pub fn spec(self, position: Position, size: Size, target: Option<&str>) -> WindowSpec {
        let profile = self.profile();
        WindowSpec {
            url: self.url(target),
            title: profile.title.to_string(),
            size,
            position,
            resizable: profile.resizable,
            decorations: profile.decorations,
            always_on_top: profile.always_on_top,
            skip_taskbar: profile.skip_taskbar,
            focus: profile.focus,
            transparent: profile.transparent,
        }
    }
}

impl std::fmt::Display for WindowKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}
