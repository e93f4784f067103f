use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("unknown instance status: {0}")]
    UnknownStatus(String),

    #[error("unknown power action: {0}")]
    UnknownPowerAction(String),
}
