use std::fmt;

/// The application's position in its own lifecycle, in the order every
/// process passes through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Phase {
    PreInit = 0,
    RunInit = 1,
    Run = 2,
    RunExit = 3,
    Exit = 4,
}

impl Phase {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::PreInit,
            1 => Self::RunInit,
            2 => Self::Run,
            3 => Self::RunExit,
            _ => Self::Exit,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PreInit => "PreInit",
            Self::RunInit => "RunInit",
            Self::Run => "Run",
            Self::RunExit => "RunExit",
            Self::Exit => "Exit",
        };
        f.write_str(name)
    }
}
