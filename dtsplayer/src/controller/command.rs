use std::fmt;

/// Playback command handed to the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    /// Pause when playing, play otherwise
    Toggle,
    Next,
    Previous,
    /// Play a single item (track id or URI)
    PlayItem(String),
    /// Play a collection (playlist id or URI)
    PlayCollection(String),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Play => "play",
            Command::Pause => "pause",
            Command::Toggle => "toggle",
            Command::Next => "next",
            Command::Previous => "previous",
            Command::PlayItem(_) => "play_item",
            Command::PlayCollection(_) => "play_collection",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::PlayItem(id) | Command::PlayCollection(id) => {
                write!(f, "{}({})", self.name(), id)
            }
            _ => f.write_str(self.name()),
        }
    }
}
