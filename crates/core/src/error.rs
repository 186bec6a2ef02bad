use crate::types::LayerId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Layer not found: {0}")]
    LayerNotFound(LayerId),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("Reconciliation failed: {0}")]
    Reconciliation(String),
}
