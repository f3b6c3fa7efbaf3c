//! Errors ending a single render pass. None of them are retried.

use kstring::KString;

use crate::def_boxed_thiserror;

def_boxed_thiserror!(RenderError, pub enum RenderErrorKind {
    #[error("fragment \"{name}\" not found")]
    FragmentNotFound { name: KString },
    #[error("no ancestor fragment \"{ancestor}\" found, extended at: {snippet:?}")]
    AncestorNotFound { ancestor: KString, snippet: String },
    #[error("ancestor fragment \"{ancestor}\" has no <wicket:child></wicket:child>")]
    MissingChildSlot { ancestor: KString },
    #[error("panel fragment \"{panel}\" does not exist")]
    PanelNotFound { panel: KString },
    #[error("malformed variable declaration in {clause:?}")]
    MalformedVariableDeclaration { clause: String },
    #[error("cyclic template reference: {trail}")]
    CyclicTemplateReference { trail: String },
    #[error("undefined variable \"{name}\"")]
    UndefinedVariable { name: KString },
    #[error("{0:#}")]
    Io(#[from] anyhow::Error),
});

impl RenderError {
    /// Whether the requested fragment itself is missing, i.e. the
    /// request should be answered with 404 instead of an error page.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind(), RenderErrorKind::FragmentNotFound { .. })
    }
}
