use super::state::{Screen, SearchFocus};

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Quit,
    NextScreen,
    PrevScreen,
    SetScreen(Screen),
    SetSearchFocus(SearchFocus),

    SidebarUp,
    SidebarDown,
    ListUp,
    ListDown,
    GoTop,
    GoBottom,
    PageUp,
    PageDown,
    /// Play a song or drill into a container.
    Activate,
    /// Leave the current drill-down view.
    Back,
    Refresh,
    CycleAlbumKind,
    ToggleStar,
    PlayRandom,

    InputChar(char),
    Backspace,
    ClearInput,
    StartSearch,

    TogglePause,
    PlayNext,
    PlayPrev,
    VolumeUp,
    VolumeDown,
    SeekForward,
    SeekBack,
    ToggleShuffle,
    CycleRepeat,
    ToggleFullscreen,

    /// Append the selection (or every song of a container) to the queue.
    Enqueue,
    /// Insert the selection right after the current song.
    EnqueueNext,
    QueuePlayIndex(usize),
    QueueRemove(usize),
    QueueClear,
    QueueMoveUp,
    QueueMoveDown,

    SettingsFocusNext,
    SettingsFocusPrev,
    /// Apply the row under the cursor in the focused settings section.
    SettingsApply,
    /// Move the sidebar row under the cursor; `true` moves it up.
    SidebarMove(bool),
    ClearCache,

    Resize,
}
