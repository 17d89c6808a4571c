use std::fmt;

use serde::Serialize;

use super::descriptor::{Param, ParamKind};

/// The invocation pattern of a service method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum HandlerShape {
    /// `(ct)`
    NoArgs,
    /// `(id, ct)`
    IdOnly,
    /// `(body, ct)`
    BodyOnly,
    /// `(id, body, ct)`
    IdAndBody,
    /// Anything else; invoked with the cancellation token only.
    Fallback,
}

impl HandlerShape {
    /// Matches an ordered parameter list against the recognized shapes.
    pub fn classify(params: &[Param]) -> Self {
        use ParamKind::*;

        let kinds: Vec<ParamKind> = params.iter().map(|p| p.kind).collect();
        match kinds.as_slice() {
            [Cancellation] => HandlerShape::NoArgs,
            [Identifier, Cancellation] => HandlerShape::IdOnly,
            [Payload, Cancellation] => HandlerShape::BodyOnly,
            [Identifier, Payload, Cancellation] => HandlerShape::IdAndBody,
            _ => HandlerShape::Fallback,
        }
    }

    pub fn takes_id(&self) -> bool {
        matches!(self, HandlerShape::IdOnly | HandlerShape::IdAndBody)
    }

    pub fn takes_body(&self) -> bool {
        matches!(self, HandlerShape::BodyOnly | HandlerShape::IdAndBody)
    }
}

impl fmt::Display for HandlerShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandlerShape::NoArgs => "no-args",
            HandlerShape::IdOnly => "id-only",
            HandlerShape::BodyOnly => "body-only",
            HandlerShape::IdAndBody => "id-and-body",
            HandlerShape::Fallback => "fallback",
        };
        f.write_str(name)
    }
}
