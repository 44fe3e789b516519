//! Error taxonomy.
//!
//! Failures fall into four classes, all of which abort the run:
//! structurally invalid problem input, inconsistent use of the domain model,
//! engine failures other than infeasibility, and filesystem trouble while
//! exporting. An infeasible model is *not* an error: it is reported as a
//! [`SolveOutcome::Infeasible`](crate::solver::SolveOutcome) and only halts
//! the remaining week sequence.

use std::io;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// All failure modes of the timetabling pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// The problem description is malformed or structurally invalid.
    ///
    /// `path` is the structural location of the offending field, e.g.
    /// `courses->Algebra->[0]->length`.
    #[error("invalid input at {path}: {message}")]
    Input { path: String, message: String },

    /// The domain model was used inconsistently (whitelisting and
    /// blacklisting the same session, room breaks without a room, failed
    /// name lookups). Treated as a programming or configuration error.
    #[error("model inconsistency: {0}")]
    Model(String),

    /// The MIP engine failed for a reason other than infeasibility.
    #[error("solver engine: {0}")]
    Engine(String),

    /// Export directories or shared assets could not be created, cleaned
    /// or copied.
    #[error("resource error: {message}")]
    Resource {
        message: String,
        #[source]
        source: Option<io::Error>,
    },
}

impl From<io::Error> for Error {
    fn from(source: io::Error) -> Self {
        Error::Resource {
            message: "io failure".into(),
            source: Some(source),
        }
    }
}

impl Error {
    /// Input error with a structural path.
    pub fn input(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Input {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Resource error wrapping an IO failure.
    pub fn resource(message: impl Into<String>, source: io::Error) -> Self {
        Error::Resource {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Resource error without an underlying IO cause.
    pub fn resource_msg(message: impl Into<String>) -> Self {
        Error::Resource {
            message: message.into(),
            source: None,
        }
    }
}
