use serde::{Deserialize, Serialize};

use crate::models::TutorialStage;

/// Events published on the in-process bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ChatEvent {
    /// The tutorial moved forward; bot views re-derive their message list.
    TutorialStageChanged {
        user_id: String,
        stage: TutorialStage,
    },

    /// The tutorial reached its terminal stage and the bot is gone.
    TutorialCompleted { user_id: String },
}

impl ChatEvent {
    pub fn user_id(&self) -> &str {
        match self {
            Self::TutorialStageChanged { user_id, .. } => user_id,
            Self::TutorialCompleted { user_id } => user_id,
        }
    }
}
