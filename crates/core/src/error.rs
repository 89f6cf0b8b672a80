use thiserror::Error;

use crate::model::{PatternError, PositionError, StitchError, WorkSessionError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Pattern(#[from] PatternError),
    #[error(transparent)]
    Stitch(#[from] StitchError),
    #[error(transparent)]
    Position(#[from] PositionError),
    #[error(transparent)]
    Session(#[from] WorkSessionError),
}
