mod ids;
mod pattern;
mod position;
mod session;
mod stitch;

pub use ids::{ParseIdError, PatternId, StitchId, UserId, WorkSessionId};

pub use pattern::{Pattern, PatternEntry, PatternError, PatternGroup};
pub use position::{Position, PositionError, Step};
pub use session::{
    ParseStatusError, SessionStatus, WorkSession, WorkSessionDraft, WorkSessionError,
};
pub use stitch::{Stitch, StitchError, StitchLookup};
