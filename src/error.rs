use miette::Diagnostic;
use thiserror::Error;

use crate::auth::AuthError;
use crate::config::ConfigError;
use crate::forge::GitApiError;

/// Errors from assembling and driving a provider.
#[derive(Debug, Error, Diagnostic)]
pub enum AppError {
    /// An error from the hosting provider's API.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Api(#[from] GitApiError),

    /// A configuration error.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    /// A credential resolution error.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Auth(#[from] AuthError),
}
