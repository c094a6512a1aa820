use loterie_db::models::Game;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Grille invalide : {0}")]
    InvalidTicket(String),

    #[error("Grille {ticket} confrontée au tirage {issue} du {draw}")]
    GameMismatch { ticket: Game, draw: Game, issue: String },

    #[error("Tirage {issue} introuvable pour {game}")]
    UnknownIssue { game: Game, issue: String },

    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
