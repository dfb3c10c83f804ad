use thiserror::Error;
use ut_core::CoreError;
use ut_nav::NavError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("traffic manager configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("navigation error: {0}")]
    Nav(#[from] NavError),
}

pub type SimResult<T> = Result<T, SimError>;
