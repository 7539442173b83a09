use thiserror::Error;

/// Failure of a user-initiated action. State is left unchanged.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown token: {0}")]
    UnknownToken(String),
    #[error("unknown wallet: {0}")]
    UnknownWallet(String),
    #[error("wallets are picked automatically; switch to manual mode to edit")]
    ManualOnly,
    #[error("no position selected")]
    NoTokenSelected,
    #[error("select at least one wallet")]
    NoWalletsSelected,
    #[error("selected wallets have no holdings in this token")]
    NoHoldingsInSelection,
    #[error("no token detected; open a token page first")]
    NoTokenDetected,
    #[error("token has no positions to update")]
    NothingToUpdate,
    #[error("invalid amount: {0}")]
    InvalidAmount(f64),
    #[error("invalid presets: {0}")]
    InvalidPresets(String),
    #[error("enter a {0}")]
    MissingField(&'static str),
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
