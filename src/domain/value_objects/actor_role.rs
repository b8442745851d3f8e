use serde::{Deserialize, Serialize};

/// Role of the signed-in operator, as handed over by the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Admin,
    Agent,
    Accountant,
    Viewer,
}
