use {
    crate::domain::CanonicalSeries,
    strum_macros::{Display, EnumIter},
};

/// Steps of one logical request, in the only order they can happen:
/// `idle -> checking-cache -> done` on a hit,
/// `... -> fetching -> normalizing -> writing-cache -> done` on a miss,
/// `... -> fetching -> done-with-error` when the fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum RequestPhase {
    Idle,
    CheckingCache,
    Fetching,
    Normalizing,
    WritingCache,
    Done,
    DoneWithError,
}

/// What the rendering layer sees for one pending load.
#[derive(Debug)]
pub enum LoadState<'a> {
    Loading,
    Error(&'a anyhow::Error),
    Ready(&'a CanonicalSeries),
}

impl LoadState<'_> {
    pub fn status(&self) -> LoadStatus {
        match self {
            LoadState::Loading => LoadStatus::Loading,
            LoadState::Error(_) => LoadStatus::Error,
            LoadState::Ready(_) => LoadStatus::Ready,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum LoadStatus {
    Loading,
    Error,
    Ready,
}
